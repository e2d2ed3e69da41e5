use std::sync::Arc;

use anyhow::Result;
use thermal_fleet_telemetry::config::{Config, FleetConfig};
use thermal_fleet_telemetry::domain::{BagType, DeviceState};
use thermal_fleet_telemetry::repo::InMemoryRepository;
use thermal_fleet_telemetry::scheduler::SimulationScheduler;
use thermal_fleet_telemetry::telemetry;
use tracing::{info, warn};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let cfg = Config::load()?;

    let repo = Arc::new(InMemoryRepository::new());
    seed_demo_fleet(&repo, &cfg.fleet).await;

    let scheduler = SimulationScheduler::new(repo.clone(), cfg.scheduler_config());
    let count = scheduler.bootstrap_all().await?;
    info!(devices = count, "thermal fleet telemetry engine running");

    telemetry::shutdown_signal().await;
    scheduler.shutdown_all().await;
    warn!("shutdown complete");
    Ok(())
}

/// Seed the in-memory repository with an online demo fleet. Hot zones heat
/// toward food-holding temperature, cold zones chill toward fridge range.
async fn seed_demo_fleet(repo: &InMemoryRepository, fleet: &FleetConfig) {
    let plan = [
        (BagType::DualZone, fleet.dual_zone),
        (BagType::HeatingOnly, fleet.heating_only),
        (BagType::CoolingOnly, fleet.cooling_only),
    ];
    for (bag_type, count) in plan {
        for _ in 0..count {
            let mut dev = DeviceState::new(Uuid::new_v4(), bag_type);
            dev.online = true;
            if let Some(hot) = dev.hot_zone.as_mut() {
                hot.target_temp_c = 65.0;
                hot.actuator_on = true;
                hot.fan_on = true;
            }
            if let Some(cold) = dev.cold_zone.as_mut() {
                cold.target_temp_c = 4.0;
                cold.actuator_on = true;
            }
            info!(device_id = %dev.id, bag_type = %bag_type, "seeded demo device");
            repo.upsert_device(dev).await;
        }
    }
}
