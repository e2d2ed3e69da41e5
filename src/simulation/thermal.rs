//! Thermal zone model.
//!
//! One step per scheduler tick. With the actuator off the zone drifts toward
//! ambient; with it on the zone moves a fixed step toward the target and
//! jitters inside a narrow band once it gets there. Overshoot across the
//! target between ticks is corrected on the following tick.

use rand::Rng;

pub const DEFAULT_AMBIENT_C: f64 = 25.0;

/// Fixed approach step while the actuator is driving toward target (°C/tick).
pub const ACTIVE_STEP_C: f64 = 2.0;

/// Gap below which the zone is considered at target and only jitters.
pub const STEADY_BAND_C: f64 = 0.5;

/// Maximum magnitude of steady-state noise (°C).
pub const STEADY_JITTER_C: f64 = 0.15;

/// Fraction of the gap to ambient closed per tick while inactive.
const AMBIENT_DRIFT_FACTOR: f64 = 0.05;

/// Advance a zone temperature by one tick.
///
/// While inactive the distance to `ambient` shrinks by 5% per tick, so the
/// distance to the attractor is non-increasing. While active the temperature
/// moves [`ACTIVE_STEP_C`] toward `target` until inside [`STEADY_BAND_C`],
/// then holds with ±[`STEADY_JITTER_C`] noise.
pub fn temperature_step<R: Rng>(
    current: f64,
    target: f64,
    active: bool,
    ambient: f64,
    rng: &mut R,
) -> f64 {
    assert!(current.is_finite(), "current temperature must be finite");
    assert!(target.is_finite(), "target temperature must be finite");
    assert!(ambient.is_finite(), "ambient temperature must be finite");

    if !active {
        return current + (ambient - current) * AMBIENT_DRIFT_FACTOR;
    }

    let gap = target - current;
    if gap.abs() < STEADY_BAND_C {
        current + rng.gen_range(-STEADY_JITTER_C..=STEADY_JITTER_C)
    } else if gap > 0.0 {
        current + ACTIVE_STEP_C
    } else {
        current - ACTIVE_STEP_C
    }
}

/// Derive zone humidity from the instantaneous temperature.
///
/// Memoryless: warmer air reads drier, colder air damper, around a
/// per-deployment base level. Clamped to the sensor's 10–90% range.
pub fn humidity_step<R: Rng>(current_temp: f64, base_humidity: f64, rng: &mut R) -> f64 {
    assert!(current_temp.is_finite(), "current temperature must be finite");
    assert!(base_humidity.is_finite(), "base humidity must be finite");

    let humidity = base_humidity + (25.0 - current_temp) * 0.5 + rng.gen_range(-2.5..=2.5);
    humidity.clamp(10.0, 90.0)
}
