//! Bounded telemetry history for charting.
//!
//! Each metric stream keeps the 100 most recent readings; older entries are
//! evicted from the front on overflow. Streams come into existence on first
//! append, so a device only carries history for metrics it actually has.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::domain::{MetricStream, Reading};

pub const HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Default)]
pub struct HistoryStore {
    streams: HashMap<MetricStream, VecDeque<Reading>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reading, evicting the oldest entries past capacity.
    pub fn append(&mut self, stream: MetricStream, value: f64, timestamp: DateTime<Utc>) {
        let readings = self.streams.entry(stream).or_default();
        readings.push_back(Reading { value, timestamp });
        while readings.len() > HISTORY_CAPACITY {
            readings.pop_front();
        }
    }

    /// Readings in chronological order, most recent last. Empty for a stream
    /// that has never been appended to.
    pub fn read(&self, stream: MetricStream) -> Vec<Reading> {
        self.streams
            .get(&stream)
            .map(|r| r.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, stream: MetricStream) -> usize {
        self.streams.get(&stream).map(VecDeque::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.streams.values().all(VecDeque::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streams_created_lazily() {
        let store = HistoryStore::new();
        assert!(store.read(MetricStream::BatteryCharge).is_empty());
        assert_eq!(store.len(MetricStream::HotZoneTemp), 0);
    }

    #[test]
    fn test_append_preserves_order() {
        let mut store = HistoryStore::new();
        for i in 0..10 {
            store.append(MetricStream::HotZoneTemp, i as f64, Utc::now());
        }
        let readings = store.read(MetricStream::HotZoneTemp);
        assert_eq!(readings.len(), 10);
        assert_eq!(readings[0].value, 0.0);
        assert_eq!(readings[9].value, 9.0);
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let mut store = HistoryStore::new();
        for i in 0..250 {
            store.append(MetricStream::BatteryCharge, i as f64, Utc::now());
        }
        let readings = store.read(MetricStream::BatteryCharge);
        assert_eq!(readings.len(), HISTORY_CAPACITY);
        // The 100 most recent values, chronological.
        assert_eq!(readings[0].value, 150.0);
        assert_eq!(readings[99].value, 249.0);
        for pair in readings.windows(2) {
            assert!(pair[1].value > pair[0].value);
        }
    }

    #[test]
    fn test_streams_evict_independently() {
        let mut store = HistoryStore::new();
        for i in 0..150 {
            store.append(MetricStream::HotZoneTemp, i as f64, Utc::now());
        }
        store.append(MetricStream::ColdZoneTemp, 4.0, Utc::now());
        assert_eq!(store.len(MetricStream::HotZoneTemp), HISTORY_CAPACITY);
        assert_eq!(store.len(MetricStream::ColdZoneTemp), 1);
    }
}
