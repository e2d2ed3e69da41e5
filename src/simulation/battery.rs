//! Battery drain model.
//!
//! Charge drops a fixed number of percentage points per tick, faster while a
//! zone actuator is running. There is no recharge path in the model; the
//! `is_charging` flag on the device is informational only.

pub const NOMINAL_VOLTAGE_V: f64 = 12.6;

/// Drain per tick while a heater or cooler is running (percentage points).
pub const ACTIVE_DRAIN_PCT: f64 = 0.5;

/// Baseline drain per tick for electronics and fans (percentage points).
pub const IDLE_DRAIN_PCT: f64 = 0.1;

/// Advance the charge level by one tick. Floors at 0 permanently.
pub fn battery_step(current_charge: f64, active: bool) -> f64 {
    assert!(current_charge.is_finite(), "charge level must be finite");
    assert!(
        (0.0..=100.0).contains(&current_charge),
        "charge level out of bounds: {}",
        current_charge
    );

    let rate = if active { ACTIVE_DRAIN_PCT } else { IDLE_DRAIN_PCT };
    (current_charge - rate).max(0.0)
}

/// Pack voltage derived linearly from the charge level.
pub fn voltage(charge: f64) -> f64 {
    assert!(charge.is_finite(), "charge level must be finite");
    NOMINAL_VOLTAGE_V * (charge / 100.0)
}
