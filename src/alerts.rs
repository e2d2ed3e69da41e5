//! Safety alert derivation.
//!
//! Pure evaluation of a device snapshot against its configured limits. The
//! scheduler logs the result after each tick; alerts are never persisted as
//! device state, so a recovered zone clears on the next evaluation.

use serde::{Deserialize, Serialize};

use crate::domain::{DeviceState, ZoneKey, ZoneState};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Danger,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Danger => write!(f, "danger"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub severity: Severity,
    pub zone: Option<ZoneKey>,
    pub message: String,
}

/// Evaluate a device snapshot against its safety limits.
///
/// Output order is fixed: hot zone too-cold, hot zone too-hot, cold zone
/// too-cold, cold zone too-hot, low battery. Absent zones contribute nothing;
/// temperatures inside `[min_temp, max_temp]` and charge at or above the
/// threshold yield an empty list.
pub fn evaluate(state: &DeviceState) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for key in [ZoneKey::Hot, ZoneKey::Cold] {
        if let Some(zone) = state.zone(key) {
            check_zone(&mut alerts, key, zone, state);
        }
    }

    let limits = &state.safety_limits;
    if state.battery.charge_percent < limits.low_battery_percent {
        alerts.push(Alert {
            severity: Severity::Warning,
            zone: None,
            message: format!(
                "battery at {:.1}%, below threshold {:.1}%",
                state.battery.charge_percent, limits.low_battery_percent
            ),
        });
    }

    alerts
}

fn check_zone(alerts: &mut Vec<Alert>, key: ZoneKey, zone: &ZoneState, state: &DeviceState) {
    let limits = &state.safety_limits;

    if zone.current_temp_c < limits.min_temp_c {
        alerts.push(Alert {
            severity: Severity::Danger,
            zone: Some(key),
            message: format!(
                "{} temperature {:.1}°C below minimum {:.1}°C",
                key, zone.current_temp_c, limits.min_temp_c
            ),
        });
    }
    if zone.current_temp_c > limits.max_temp_c {
        alerts.push(Alert {
            severity: Severity::Danger,
            zone: Some(key),
            message: format!(
                "{} temperature {:.1}°C above maximum {:.1}°C",
                key, zone.current_temp_c, limits.max_temp_c
            ),
        });
    }
}
