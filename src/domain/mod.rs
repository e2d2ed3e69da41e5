pub mod device;

pub use device::{
    BagType, BatteryState, DeviceState, MetricStream, Reading, SafetyLimits, ZoneKey, ZonePatch,
    ZoneState,
};
