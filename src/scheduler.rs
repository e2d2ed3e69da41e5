//! Per-device simulation scheduler.
//!
//! Each registered device gets one owning task that runs an immediate first
//! tick and then repeats on a fixed interval. A tick fetches the current
//! record, advances the thermal and battery models, persists the result,
//! appends history readings and logs derived safety alerts. The owning-task
//! discipline plus [`MissedTickBehavior::Skip`] serializes ticks per device:
//! a tick that outlasts its interval causes the next tick to be skipped, not
//! queued.
//!
//! Registry mutations all go through one async mutex, so a tick's
//! self-unregister (device offline or deleted) cannot race an external
//! `unregister` into a lost update.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::alerts::{self, Severity};
use crate::domain::{DeviceState, MetricStream, ZoneKey, ZonePatch};
use crate::repo::{DeviceRepository, RepoError};
use crate::simulation::{battery, thermal};

/// Interval used by `bootstrap_all` for devices resumed at process start.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Per-task bookkeeping, readable while the task runs.
#[derive(Debug, Clone, Default)]
pub struct TaskStatus {
    pub last_run: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub run_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub alerts_last_tick: usize,
}

struct SimulationTask {
    cancel: CancellationToken,
    join: JoinHandle<()>,
    status: Arc<RwLock<TaskStatus>>,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Room temperature zones drift toward while their actuator is off.
    pub ambient_temp_c: f64,
    /// Base humidity level the memoryless humidity model centers on.
    pub base_humidity_pct: f64,
    /// Interval handed to `bootstrap_all`.
    pub default_interval: Duration,
    /// Fixed seed for deterministic simulation runs. Each device derives its
    /// own stream from this so the fleet does not move in lockstep.
    pub random_seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            ambient_temp_c: thermal::DEFAULT_AMBIENT_C,
            base_humidity_pct: 45.0,
            default_interval: DEFAULT_TICK_INTERVAL,
            random_seed: None,
        }
    }
}

enum TickOutcome {
    Continue,
    Stop,
}

struct Inner {
    repo: Arc<dyn DeviceRepository>,
    config: SchedulerConfig,
    tasks: Mutex<HashMap<Uuid, SimulationTask>>,
}

/// Cheap-to-clone handle owning the registry of active per-device tasks.
/// Constructed by the caller, so tests can run independent instances.
#[derive(Clone)]
pub struct SimulationScheduler {
    inner: Arc<Inner>,
}

impl SimulationScheduler {
    pub fn new(repo: Arc<dyn DeviceRepository>, config: SchedulerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                repo,
                config,
                tasks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Start simulating a device. Idempotent: a second call while the task is
    /// running is a no-op. The first tick runs as soon as the task is
    /// spawned; registration itself does not wait for it.
    pub async fn register(&self, device_id: Uuid, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            anyhow::bail!("tick interval must be positive for device {device_id}");
        }

        let mut tasks = self.inner.tasks.lock().await;
        if let Some(existing) = tasks.get(&device_id) {
            if !existing.join.is_finished() {
                info!(%device_id, "device already registered, ignoring");
                return Ok(());
            }
            // Defensive: a finished task should have removed itself.
            tasks.remove(&device_id);
        }

        let cancel = CancellationToken::new();
        let status = Arc::new(RwLock::new(TaskStatus::default()));

        let scheduler = self.clone();
        let task_cancel = cancel.clone();
        let task_status = status.clone();
        let join = tokio::spawn(async move {
            scheduler
                .run_device_loop(device_id, interval, task_cancel, task_status)
                .await;
        });

        tasks.insert(
            device_id,
            SimulationTask {
                cancel,
                join,
                status,
            },
        );
        info!(%device_id, interval_ms = interval.as_millis() as u64, "simulation registered");
        Ok(())
    }

    /// Stop simulating a device. Cancels future ticks and waits for an
    /// in-flight tick to finish, so no write lands after this returns.
    pub async fn unregister(&self, device_id: Uuid) {
        let task = self.inner.tasks.lock().await.remove(&device_id);
        let Some(task) = task else {
            return;
        };
        task.cancel.cancel();
        if let Err(e) = task.join.await {
            warn!(%device_id, error = %e, "simulation task join failed");
        }
        info!(%device_id, "simulation unregistered");
    }

    /// Resume simulation for every device left online across a restart.
    /// Returns the number of devices registered.
    pub async fn bootstrap_all(&self) -> Result<usize> {
        let ids = self.inner.repo.list_online_device_ids().await?;
        let interval = self.inner.config.default_interval;
        for id in &ids {
            self.register(*id, interval).await?;
        }
        info!(count = ids.len(), "bootstrapped online devices");
        Ok(ids.len())
    }

    /// Stop every active task; used at process termination.
    pub async fn shutdown_all(&self) {
        let drained: Vec<(Uuid, SimulationTask)> =
            self.inner.tasks.lock().await.drain().collect();
        for (_, task) in &drained {
            task.cancel.cancel();
        }
        futures::future::join_all(drained.into_iter().map(|(device_id, task)| async move {
            if let Err(e) = task.join.await {
                warn!(%device_id, error = %e, "simulation task join failed");
            }
        }))
        .await;
        info!("all simulation tasks stopped");
    }

    /// Devices currently running a simulation task.
    pub async fn list_active(&self) -> Vec<Uuid> {
        self.inner.tasks.lock().await.keys().copied().collect()
    }

    /// Snapshot of a running task's counters, if registered.
    pub async fn task_status(&self, device_id: Uuid) -> Option<TaskStatus> {
        let tasks = self.inner.tasks.lock().await;
        let task = tasks.get(&device_id)?;
        let status = task.status.read().await.clone();
        Some(status)
    }

    async fn run_device_loop(
        &self,
        device_id: Uuid,
        interval: Duration,
        cancel: CancellationToken,
        status: Arc<RwLock<TaskStatus>>,
    ) {
        let mut rng = match self.inner.config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ (device_id.as_u128() as u64)),
            None => StdRng::from_entropy(),
        };

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.run_tick(device_id, interval, &mut rng, &status).await {
                TickOutcome::Continue => {}
                TickOutcome::Stop => {
                    self.remove_own_entry(device_id, &status).await;
                    break;
                }
            }
        }
    }

    /// Remove this task's registry entry after a self-stop. Compares the
    /// status handle so a replacement task registered in the meantime is
    /// left alone.
    async fn remove_own_entry(&self, device_id: Uuid, status: &Arc<RwLock<TaskStatus>>) {
        let mut tasks = self.inner.tasks.lock().await;
        if let Some(task) = tasks.get(&device_id) {
            if Arc::ptr_eq(&task.status, status) {
                tasks.remove(&device_id);
            }
        }
    }

    /// Bound a repository call by the tick interval; a timeout abandons the
    /// tick as a transient failure.
    async fn repo_call<T>(
        &self,
        interval: Duration,
        fut: impl Future<Output = Result<T, RepoError>>,
    ) -> Result<T, RepoError> {
        match tokio::time::timeout(interval, fut).await {
            Ok(res) => res,
            Err(_) => Err(RepoError::Transient(format!(
                "repository call exceeded {}ms",
                interval.as_millis()
            ))),
        }
    }

    async fn record_error(&self, status: &Arc<RwLock<TaskStatus>>, err: &RepoError) {
        let mut s = status.write().await;
        s.error_count += 1;
        s.last_error = Some(err.to_string());
    }

    async fn run_tick(
        &self,
        device_id: Uuid,
        interval: Duration,
        rng: &mut StdRng,
        status: &Arc<RwLock<TaskStatus>>,
    ) -> TickOutcome {
        let now = Utc::now();
        {
            let mut s = status.write().await;
            s.last_run = Some(now);
            s.run_count += 1;
        }

        let repo = self.inner.repo.clone();
        let mut state = match self.repo_call(interval, repo.fetch(device_id)).await {
            Ok(state) => state,
            Err(RepoError::NotFound(_)) => {
                info!(%device_id, "device record gone, stopping simulation");
                return TickOutcome::Stop;
            }
            Err(e) => {
                self.record_error(status, &e).await;
                warn!(%device_id, error = %e, "fetch failed, abandoning tick");
                return TickOutcome::Continue;
            }
        };

        if !state.online {
            info!(%device_id, "device went offline, stopping simulation");
            return TickOutcome::Stop;
        }

        for key in [ZoneKey::Hot, ZoneKey::Cold] {
            let Some(zone) = state.zone(key) else {
                continue;
            };
            let next_temp = thermal::temperature_step(
                zone.current_temp_c,
                zone.target_temp_c,
                zone.actuator_on,
                self.inner.config.ambient_temp_c,
                rng,
            );
            let next_humidity =
                thermal::humidity_step(next_temp, self.inner.config.base_humidity_pct, rng);

            let patch = ZonePatch {
                current_temp_c: Some(next_temp),
                current_humidity_pct: Some(next_humidity),
                ..Default::default()
            };
            match self
                .repo_call(interval, repo.persist_zone(device_id, key, patch))
                .await
            {
                Ok(()) => {
                    // Mirror the write locally so alert evaluation sees the
                    // post-tick state.
                    if let Some(z) = state.zone_mut(key) {
                        z.current_temp_c = next_temp;
                        z.current_humidity_pct = next_humidity;
                    }
                }
                Err(RepoError::NotFound(_)) => return TickOutcome::Stop,
                Err(e @ RepoError::UnsupportedZone { .. }) => {
                    // Capability mismatch: the write was rejected before any
                    // mutation; the device stays registered.
                    self.record_error(status, &e).await;
                    error!(%device_id, zone = %key, error = %e, "zone write rejected");
                    continue;
                }
                Err(e) => {
                    self.record_error(status, &e).await;
                    warn!(%device_id, zone = %key, error = %e, "zone persist failed, abandoning tick");
                    return TickOutcome::Continue;
                }
            }

            for (stream, value) in [
                (MetricStream::temp_for(key), next_temp),
                (MetricStream::humidity_for(key), next_humidity),
            ] {
                match self
                    .repo_call(
                        interval,
                        repo.append_reading(device_id, stream, value, now),
                    )
                    .await
                {
                    Ok(()) => {}
                    Err(RepoError::NotFound(_)) => return TickOutcome::Stop,
                    Err(e) => {
                        self.record_error(status, &e).await;
                        warn!(%device_id, stream = %stream, error = %e, "history append failed, abandoning tick");
                        return TickOutcome::Continue;
                    }
                }
            }
        }

        let next_charge =
            battery::battery_step(state.battery.charge_percent, state.any_actuator_on());
        let next_voltage = battery::voltage(next_charge);
        match self
            .repo_call(
                interval,
                repo.persist_battery(
                    device_id,
                    next_charge,
                    next_voltage,
                    state.battery.is_charging,
                ),
            )
            .await
        {
            Ok(()) => {
                state.battery.charge_percent = next_charge;
                state.battery.voltage_v = next_voltage;
            }
            Err(RepoError::NotFound(_)) => return TickOutcome::Stop,
            Err(e) => {
                self.record_error(status, &e).await;
                warn!(%device_id, error = %e, "battery persist failed, abandoning tick");
                return TickOutcome::Continue;
            }
        }

        match self
            .repo_call(
                interval,
                repo.append_reading(device_id, MetricStream::BatteryCharge, next_charge, now),
            )
            .await
        {
            Ok(()) => {}
            Err(RepoError::NotFound(_)) => return TickOutcome::Stop,
            Err(e) => {
                self.record_error(status, &e).await;
                warn!(%device_id, error = %e, "history append failed, abandoning tick");
                return TickOutcome::Continue;
            }
        }

        let alerts = alerts::evaluate(&state);
        self.log_alerts(device_id, &state, &alerts);

        let mut s = status.write().await;
        s.last_success = Some(now);
        s.success_count += 1;
        s.last_error = None;
        s.alerts_last_tick = alerts.len();

        TickOutcome::Continue
    }

    fn log_alerts(&self, device_id: Uuid, state: &DeviceState, alerts: &[alerts::Alert]) {
        for alert in alerts {
            match alert.severity {
                Severity::Danger => error!(
                    %device_id,
                    bag_type = %state.bag_type,
                    severity = %alert.severity,
                    "{}", alert.message
                ),
                Severity::Warning => warn!(
                    %device_id,
                    bag_type = %state.bag_type,
                    severity = %alert.severity,
                    "{}", alert.message
                ),
            }
        }
    }
}
