//! # Telemetry Simulation Models
//!
//! Pure numeric models evolved once per scheduler tick:
//!
//! - **Thermal**: zone temperature convergence toward target (actuator on) or
//!   ambient (actuator off), plus memoryless humidity derivation
//! - **Battery**: fixed-rate charge drain with a permanent floor at empty,
//!   and linear voltage derivation
//!
//! Both are free functions with no I/O; the scheduler owns the RNG and feeds
//! the results back through the repository.

pub mod battery;
pub mod thermal;
