//! Telemetry simulation engine for a thermal delivery bag fleet.
//!
//! For every online device the engine runs a cancellable recurring task that
//! evolves zone temperatures, humidity and battery charge, persists the
//! result through a [`repo::DeviceRepository`], appends bounded history for
//! charting and logs derived safety alerts. The surrounding web application
//! (CRUD, auth, dashboards) drives it through [`scheduler::SimulationScheduler`]
//! on device online/offline transitions.

pub mod alerts;
pub mod config;
pub mod domain;
pub mod history;
pub mod repo;
pub mod scheduler;
pub mod simulation;
pub mod telemetry;

pub use alerts::{Alert, Severity};
pub use domain::{BagType, DeviceState, MetricStream, Reading, ZoneKey, ZonePatch};
pub use repo::{DeviceRepository, InMemoryRepository, RepoError};
pub use scheduler::{SchedulerConfig, SimulationScheduler, TaskStatus, DEFAULT_TICK_INTERVAL};
