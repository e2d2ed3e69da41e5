use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bag hardware class. Determines which thermal zones the device carries;
/// immutable after creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BagType {
    DualZone,
    HeatingOnly,
    CoolingOnly,
}

impl BagType {
    pub fn has_hot(self) -> bool {
        matches!(self, BagType::DualZone | BagType::HeatingOnly)
    }

    pub fn has_cold(self) -> bool {
        matches!(self, BagType::DualZone | BagType::CoolingOnly)
    }

    pub fn supports(self, zone: ZoneKey) -> bool {
        match zone {
            ZoneKey::Hot => self.has_hot(),
            ZoneKey::Cold => self.has_cold(),
        }
    }
}

impl std::str::FromStr for BagType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dual-zone" => Ok(BagType::DualZone),
            "heating-only" => Ok(BagType::HeatingOnly),
            "cooling-only" => Ok(BagType::CoolingOnly),
            _ => Err(format!("Unknown bag type: {}", s)),
        }
    }
}

impl std::fmt::Display for BagType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BagType::DualZone => write!(f, "dual-zone"),
            BagType::HeatingOnly => write!(f, "heating-only"),
            BagType::CoolingOnly => write!(f, "cooling-only"),
        }
    }
}

/// Addressable thermal compartment of a bag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKey {
    Hot,
    Cold,
}

impl std::fmt::Display for ZoneKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneKey::Hot => write!(f, "hot_zone"),
            ZoneKey::Cold => write!(f, "cold_zone"),
        }
    }
}

/// State of one thermal zone. `actuator_on` is the heater for the hot zone
/// and the cooler for the cold zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneState {
    pub current_temp_c: f64,
    pub target_temp_c: f64,
    pub current_humidity_pct: f64,
    pub actuator_on: bool,
    pub fan_on: bool,
}

impl ZoneState {
    pub fn idle_at(temp_c: f64) -> Self {
        Self {
            current_temp_c: temp_c,
            target_temp_c: temp_c,
            current_humidity_pct: 45.0,
            actuator_on: false,
            fan_on: false,
        }
    }
}

/// Partial zone update written back by a simulation tick. `None` fields are
/// left untouched by the repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZonePatch {
    pub current_temp_c: Option<f64>,
    pub current_humidity_pct: Option<f64>,
    pub actuator_on: Option<bool>,
    pub fan_on: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryState {
    pub charge_percent: f64,
    pub voltage_v: f64,
    pub is_charging: bool,
}

impl Default for BatteryState {
    fn default() -> Self {
        Self {
            charge_percent: 100.0,
            voltage_v: crate::simulation::battery::NOMINAL_VOLTAGE_V,
            is_charging: false,
        }
    }
}

/// Configured alert thresholds for a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyLimits {
    pub min_temp_c: f64,
    pub max_temp_c: f64,
    pub low_battery_percent: f64,
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            min_temp_c: 0.0,
            max_temp_c: 80.0,
            low_battery_percent: 20.0,
        }
    }
}

/// Persisted record for one bag. A zone is present if and only if the bag
/// type grants that capability; `new` establishes the invariant and
/// repositories reject writes that would violate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceState {
    pub id: Uuid,
    pub bag_type: BagType,
    pub online: bool,
    pub hot_zone: Option<ZoneState>,
    pub cold_zone: Option<ZoneState>,
    pub battery: BatteryState,
    pub safety_limits: SafetyLimits,
    pub last_seen: DateTime<Utc>,
}

impl DeviceState {
    pub fn new(id: Uuid, bag_type: BagType) -> Self {
        Self {
            id,
            bag_type,
            online: false,
            hot_zone: bag_type.has_hot().then(|| ZoneState::idle_at(25.0)),
            cold_zone: bag_type.has_cold().then(|| ZoneState::idle_at(25.0)),
            battery: BatteryState::default(),
            safety_limits: SafetyLimits::default(),
            last_seen: Utc::now(),
        }
    }

    pub fn zone(&self, key: ZoneKey) -> Option<&ZoneState> {
        match key {
            ZoneKey::Hot => self.hot_zone.as_ref(),
            ZoneKey::Cold => self.cold_zone.as_ref(),
        }
    }

    pub fn zone_mut(&mut self, key: ZoneKey) -> Option<&mut ZoneState> {
        match key {
            ZoneKey::Hot => self.hot_zone.as_mut(),
            ZoneKey::Cold => self.cold_zone.as_mut(),
        }
    }

    /// True when any zone actuator is running. Drives the battery drain rate.
    pub fn any_actuator_on(&self) -> bool {
        self.hot_zone.as_ref().map(|z| z.actuator_on).unwrap_or(false)
            || self.cold_zone.as_ref().map(|z| z.actuator_on).unwrap_or(false)
    }
}

/// One sampled value on a metric stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Named telemetry streams the simulation appends to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MetricStream {
    HotZoneTemp,
    HotZoneHumidity,
    ColdZoneTemp,
    ColdZoneHumidity,
    BatteryCharge,
}

impl MetricStream {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricStream::HotZoneTemp => "hot_zone.temp",
            MetricStream::HotZoneHumidity => "hot_zone.humidity",
            MetricStream::ColdZoneTemp => "cold_zone.temp",
            MetricStream::ColdZoneHumidity => "cold_zone.humidity",
            MetricStream::BatteryCharge => "battery.charge",
        }
    }

    pub fn temp_for(zone: ZoneKey) -> Self {
        match zone {
            ZoneKey::Hot => MetricStream::HotZoneTemp,
            ZoneKey::Cold => MetricStream::ColdZoneTemp,
        }
    }

    pub fn humidity_for(zone: ZoneKey) -> Self {
        match zone {
            ZoneKey::Hot => MetricStream::HotZoneHumidity,
            ZoneKey::Cold => MetricStream::ColdZoneHumidity,
        }
    }
}

impl std::fmt::Display for MetricStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MetricStream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hot_zone.temp" => Ok(MetricStream::HotZoneTemp),
            "hot_zone.humidity" => Ok(MetricStream::HotZoneHumidity),
            "cold_zone.temp" => Ok(MetricStream::ColdZoneTemp),
            "cold_zone.humidity" => Ok(MetricStream::ColdZoneHumidity),
            "battery.charge" => Ok(MetricStream::BatteryCharge),
            _ => Err(format!("Unknown metric stream: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bag_type_capabilities() {
        assert!(BagType::DualZone.has_hot() && BagType::DualZone.has_cold());
        assert!(BagType::HeatingOnly.has_hot() && !BagType::HeatingOnly.has_cold());
        assert!(!BagType::CoolingOnly.has_hot() && BagType::CoolingOnly.has_cold());
    }

    #[test]
    fn test_zones_match_bag_type() {
        let heating = DeviceState::new(Uuid::new_v4(), BagType::HeatingOnly);
        assert!(heating.hot_zone.is_some());
        assert!(heating.cold_zone.is_none());
        assert!(heating.zone(ZoneKey::Cold).is_none());

        let dual = DeviceState::new(Uuid::new_v4(), BagType::DualZone);
        assert!(dual.zone(ZoneKey::Hot).is_some());
        assert!(dual.zone(ZoneKey::Cold).is_some());
    }

    #[test]
    fn test_bag_type_round_trip() {
        for s in ["dual-zone", "heating-only", "cooling-only"] {
            let parsed: BagType = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
        assert!("freezer".parse::<BagType>().is_err());
    }

    #[test]
    fn test_stream_names() {
        assert_eq!(MetricStream::temp_for(ZoneKey::Hot).as_str(), "hot_zone.temp");
        assert_eq!(
            MetricStream::humidity_for(ZoneKey::Cold).as_str(),
            "cold_zone.humidity"
        );
        let parsed: MetricStream = "battery.charge".parse().unwrap();
        assert_eq!(parsed, MetricStream::BatteryCharge);
    }

    #[test]
    fn test_device_state_json_round_trip() {
        let dev = DeviceState::new(Uuid::new_v4(), BagType::DualZone);
        let json = serde_json::to_string(&dev).unwrap();
        assert!(json.contains("\"dual-zone\""));
        let back: DeviceState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, dev.id);
        assert_eq!(back.bag_type, dev.bag_type);
        assert!(back.hot_zone.is_some() && back.cold_zone.is_some());
    }

    #[test]
    fn test_any_actuator_on() {
        let mut dev = DeviceState::new(Uuid::new_v4(), BagType::DualZone);
        assert!(!dev.any_actuator_on());
        dev.cold_zone.as_mut().unwrap().actuator_on = true;
        assert!(dev.any_actuator_on());
    }
}
