//! Differencing state for cumulative counters.
//!
//! Readers that turn monotonically increasing counters into per-interval
//! volumes keep their previous raw values here. Each reader owns its own
//! state, so independent samplers never share baselines.

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Compute a counter delta, re-zeroing the baseline on regression.
///
/// A counter that went backwards was reset (device replaced, counter wrapped,
/// stats cleared), so the whole current value is what accumulated since.
pub fn counter_delta(curr: u64, prev: u64) -> u64 {
    if curr >= prev { curr - prev } else { curr }
}

/// How disk and network counters are exported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoMode {
    /// Cumulative total since boot; rates are derived downstream.
    #[default]
    Cumulative,
    /// Volume transferred since the previous tick.
    Rate,
}

/// Last observed raw value per counter identity.
///
/// Unknown keys start from a zero baseline.
#[derive(Debug, Clone)]
pub struct DeltaTracker<K> {
    prev: HashMap<K, u64>,
}

impl<K> Default for DeltaTracker<K> {
    fn default() -> Self {
        Self {
            prev: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> DeltaTracker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the delta against the stored baseline and stores `curr` as the
    /// new baseline.
    ///
    /// The second element is `true` when the counter regressed and the
    /// baseline was re-zeroed.
    pub fn update(&mut self, key: K, curr: u64) -> (u64, bool) {
        let prev = self.prev.insert(key, curr).unwrap_or(0);
        (counter_delta(curr, prev), curr < prev)
    }

    /// Drops baselines for counters that disappeared from the source.
    ///
    /// A counter that later reappears starts again from a zero baseline.
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.prev.retain(|k, _| keep(k));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_delta_monotonic() {
        assert_eq!(counter_delta(150, 100), 50);
        assert_eq!(counter_delta(100, 100), 0);
    }

    #[test]
    fn counter_delta_reset_rezeroes_baseline() {
        assert_eq!(counter_delta(30, 1_000), 30);
        assert_eq!(counter_delta(0, u64::MAX), 0);
    }

    #[test]
    fn tracker_first_sample_uses_zero_baseline() {
        let mut t = DeltaTracker::new();
        assert_eq!(t.update("sda", 500), (500, false));
        assert_eq!(t.update("sda", 500), (0, false));
    }

    #[test]
    fn tracker_tracks_keys_independently() {
        let mut t = DeltaTracker::new();
        t.update("sda", 100);
        t.update("sdb", 1_000);

        assert_eq!(t.update("sda", 160), (60, false));
        assert_eq!(t.update("sdb", 1_001), (1, false));
    }

    #[test]
    fn tracker_detects_reset() {
        let mut t = DeltaTracker::new();
        t.update("eth0", 10_000);
        assert_eq!(t.update("eth0", 40), (40, true));
        assert_eq!(t.update("eth0", 100), (60, false));
    }

    #[test]
    fn tracker_retain_forgets_baselines() {
        let mut t = DeltaTracker::new();
        t.update("sda".to_string(), 100);
        t.update("sdb".to_string(), 200);
        t.retain(|k| k == "sda");

        assert_eq!(t.update("sda".to_string(), 150), (50, false));
        // sdb lost its baseline, so its whole value counts again
        assert_eq!(t.update("sdb".to_string(), 250), (250, false));
    }

    #[test]
    fn io_mode_deserializes_snake_case() {
        let mode: IoMode = serde_json::from_str("\"rate\"").unwrap();
        assert_eq!(mode, IoMode::Rate);
        assert_eq!(IoMode::default(), IoMode::Cumulative);
    }
}
