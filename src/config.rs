use std::time::Duration;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::scheduler::SchedulerConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub fleet: FleetConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Default tick interval for devices registered at bootstrap.
    pub tick_seconds: u64,
    pub ambient_temp_c: f64,
    pub base_humidity_pct: f64,
    /// Set for reproducible simulation runs; omit for entropy seeding.
    pub random_seed: Option<u64>,
}

/// Demo fleet seeded into the in-memory repository at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct FleetConfig {
    pub dual_zone: u32,
    pub heating_only: u32,
    pub cooling_only: u32,
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("TFT__").split("__"));
        let cfg: Config = figment.extract()?;

        if cfg.simulation.tick_seconds == 0 {
            anyhow::bail!("simulation.tick_seconds must be at least 1");
        }
        if !cfg.simulation.ambient_temp_c.is_finite()
            || !cfg.simulation.base_humidity_pct.is_finite()
        {
            anyhow::bail!("simulation temperatures and humidity must be finite");
        }
        Ok(cfg)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            ambient_temp_c: self.simulation.ambient_temp_c,
            base_humidity_pct: self.simulation.base_humidity_pct,
            default_interval: Duration::from_secs(self.simulation.tick_seconds),
            random_seed: self.simulation.random_seed,
        }
    }
}
