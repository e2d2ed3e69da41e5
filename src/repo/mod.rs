//! Persistence boundary consumed by the simulation engine.
//!
//! The CRUD/web layer owns the real device store; the engine only sees this
//! trait. Every call can fail transiently (connection loss, timeout) or with
//! a terminal not-found, and the scheduler classifies the two differently:
//! transient failures retry on the next tick, a missing record permanently
//! unregisters the device.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{BagType, DeviceState, MetricStream, Reading, ZoneKey, ZonePatch};

pub use memory::InMemoryRepository;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("device not found: {0}")]
    NotFound(Uuid),

    #[error("zone {zone} not supported by {bag_type} device {device_id}")]
    UnsupportedZone {
        device_id: Uuid,
        zone: ZoneKey,
        bag_type: BagType,
    },

    #[error("transient I/O failure: {0}")]
    Transient(String),
}

impl RepoError {
    /// Transient failures leave the device registered; everything else is a
    /// terminal or caller error.
    pub fn is_transient(&self) -> bool {
        matches!(self, RepoError::Transient(_))
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Load the full current record for a device.
    async fn fetch(&self, device_id: Uuid) -> RepoResult<DeviceState>;

    /// Apply a partial update to one zone. Must be rejected, without any
    /// mutation, for a zone the device's bag type does not have.
    async fn persist_zone(
        &self,
        device_id: Uuid,
        zone: ZoneKey,
        patch: ZonePatch,
    ) -> RepoResult<()>;

    /// Write back the battery block.
    async fn persist_battery(
        &self,
        device_id: Uuid,
        charge_percent: f64,
        voltage_v: f64,
        is_charging: bool,
    ) -> RepoResult<()>;

    /// Append one reading to a device's bounded history stream.
    async fn append_reading(
        &self,
        device_id: Uuid,
        stream: MetricStream,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> RepoResult<()>;

    /// Read a stream's retained history, most recent last.
    async fn read_history(&self, device_id: Uuid, stream: MetricStream)
        -> RepoResult<Vec<Reading>>;

    /// Devices currently flagged online; used to resume simulation at boot.
    async fn list_online_device_ids(&self) -> RepoResult<Vec<Uuid>>;
}
