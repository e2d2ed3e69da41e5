//! In-memory repository.
//!
//! Backs the binary and the tests. The surrounding web application would
//! normally sit on a database; the engine only needs the trait, so a map
//! behind an async `RwLock` is enough to run a whole simulated fleet.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{DeviceState, MetricStream, Reading, ZoneKey, ZonePatch};
use crate::history::HistoryStore;

use super::{DeviceRepository, RepoError, RepoResult};

struct DeviceEntry {
    state: DeviceState,
    history: HistoryStore,
}

#[derive(Default)]
pub struct InMemoryRepository {
    devices: RwLock<HashMap<Uuid, DeviceEntry>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a device record. History starts empty.
    pub async fn upsert_device(&self, state: DeviceState) {
        let mut devices = self.devices.write().await;
        devices.insert(
            state.id,
            DeviceEntry {
                state,
                history: HistoryStore::new(),
            },
        );
    }

    /// Flip a device's online flag, as the lifecycle layer does when a bag
    /// connects or drops off.
    pub async fn set_online(&self, device_id: Uuid, online: bool) -> RepoResult<()> {
        let mut devices = self.devices.write().await;
        let entry = devices
            .get_mut(&device_id)
            .ok_or(RepoError::NotFound(device_id))?;
        entry.state.online = online;
        Ok(())
    }

    pub async fn remove_device(&self, device_id: Uuid) -> bool {
        self.devices.write().await.remove(&device_id).is_some()
    }
}

#[async_trait]
impl DeviceRepository for InMemoryRepository {
    async fn fetch(&self, device_id: Uuid) -> RepoResult<DeviceState> {
        let devices = self.devices.read().await;
        devices
            .get(&device_id)
            .map(|e| e.state.clone())
            .ok_or(RepoError::NotFound(device_id))
    }

    async fn persist_zone(
        &self,
        device_id: Uuid,
        zone: ZoneKey,
        patch: ZonePatch,
    ) -> RepoResult<()> {
        let mut devices = self.devices.write().await;
        let entry = devices
            .get_mut(&device_id)
            .ok_or(RepoError::NotFound(device_id))?;

        // Capability check before any mutation.
        let bag_type = entry.state.bag_type;
        let zone_state = match entry.state.zone_mut(zone) {
            Some(z) if bag_type.supports(zone) => z,
            _ => {
                return Err(RepoError::UnsupportedZone {
                    device_id,
                    zone,
                    bag_type,
                })
            }
        };
        if let Some(temp) = patch.current_temp_c {
            zone_state.current_temp_c = temp;
        }
        if let Some(humidity) = patch.current_humidity_pct {
            zone_state.current_humidity_pct = humidity;
        }
        if let Some(actuator_on) = patch.actuator_on {
            zone_state.actuator_on = actuator_on;
        }
        if let Some(fan_on) = patch.fan_on {
            zone_state.fan_on = fan_on;
        }
        entry.state.last_seen = Utc::now();
        Ok(())
    }

    async fn persist_battery(
        &self,
        device_id: Uuid,
        charge_percent: f64,
        voltage_v: f64,
        is_charging: bool,
    ) -> RepoResult<()> {
        let mut devices = self.devices.write().await;
        let entry = devices
            .get_mut(&device_id)
            .ok_or(RepoError::NotFound(device_id))?;
        entry.state.battery.charge_percent = charge_percent;
        entry.state.battery.voltage_v = voltage_v;
        entry.state.battery.is_charging = is_charging;
        entry.state.last_seen = Utc::now();
        Ok(())
    }

    async fn append_reading(
        &self,
        device_id: Uuid,
        stream: MetricStream,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> RepoResult<()> {
        let mut devices = self.devices.write().await;
        let entry = devices
            .get_mut(&device_id)
            .ok_or(RepoError::NotFound(device_id))?;
        entry.history.append(stream, value, timestamp);
        Ok(())
    }

    async fn read_history(
        &self,
        device_id: Uuid,
        stream: MetricStream,
    ) -> RepoResult<Vec<Reading>> {
        let devices = self.devices.read().await;
        devices
            .get(&device_id)
            .map(|e| e.history.read(stream))
            .ok_or(RepoError::NotFound(device_id))
    }

    async fn list_online_device_ids(&self) -> RepoResult<Vec<Uuid>> {
        let devices = self.devices.read().await;
        Ok(devices
            .values()
            .filter(|e| e.state.online)
            .map(|e| e.state.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BagType;

    async fn repo_with(bag_type: BagType) -> (InMemoryRepository, Uuid) {
        let repo = InMemoryRepository::new();
        let id = Uuid::new_v4();
        let mut dev = DeviceState::new(id, bag_type);
        dev.online = true;
        repo.upsert_device(dev).await;
        (repo, id)
    }

    #[tokio::test]
    async fn test_fetch_missing_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo.fetch(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_partial_zone_patch() {
        let (repo, id) = repo_with(BagType::DualZone).await;
        let patch = ZonePatch {
            current_temp_c: Some(31.5),
            ..Default::default()
        };
        repo.persist_zone(id, ZoneKey::Hot, patch).await.unwrap();

        let state = repo.fetch(id).await.unwrap();
        let hot = state.hot_zone.unwrap();
        assert_eq!(hot.current_temp_c, 31.5);
        // Untouched fields keep their values.
        assert_eq!(hot.current_humidity_pct, 45.0);
        assert!(!hot.actuator_on);
    }

    #[tokio::test]
    async fn test_unsupported_zone_rejected_without_mutation() {
        let (repo, id) = repo_with(BagType::HeatingOnly).await;
        let before = repo.fetch(id).await.unwrap();

        let patch = ZonePatch {
            current_temp_c: Some(4.0),
            ..Default::default()
        };
        let err = repo.persist_zone(id, ZoneKey::Cold, patch).await.unwrap_err();
        assert!(matches!(err, RepoError::UnsupportedZone { .. }));

        let after = repo.fetch(id).await.unwrap();
        assert!(after.cold_zone.is_none());
        assert_eq!(after.last_seen, before.last_seen);
    }

    #[tokio::test]
    async fn test_persist_battery_updates_last_seen() {
        let (repo, id) = repo_with(BagType::DualZone).await;
        let before = repo.fetch(id).await.unwrap();

        repo.persist_battery(id, 88.0, 11.09, false).await.unwrap();

        let after = repo.fetch(id).await.unwrap();
        assert_eq!(after.battery.charge_percent, 88.0);
        assert!(after.last_seen >= before.last_seen);
    }

    #[tokio::test]
    async fn test_list_online_filters_offline() {
        let (repo, online_id) = repo_with(BagType::DualZone).await;
        let offline = DeviceState::new(Uuid::new_v4(), BagType::CoolingOnly);
        repo.upsert_device(offline).await;

        let ids = repo.list_online_device_ids().await.unwrap();
        assert_eq!(ids, vec![online_id]);
    }

    #[tokio::test]
    async fn test_history_round_trip() {
        let (repo, id) = repo_with(BagType::DualZone).await;
        repo.append_reading(id, MetricStream::BatteryCharge, 99.5, Utc::now())
            .await
            .unwrap();
        let readings = repo.read_history(id, MetricStream::BatteryCharge).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value, 99.5);
    }
}
