//! Rolling statistics over the most recent values of a key.
//!
//! All statistics use the population definition: variance divides by the
//! number of values in the window, not by `count - 1`.
//!
//! Sentinels: the rolling average of a key with no history is `0.0`, and the
//! z-score is `0.0` when fewer than two values exist or when every value in
//! the window is identical. A `0.0` can therefore mean "no data yet" as well
//! as a real zero; use [`StatsEngine::try_rolling_average`] or
//! [`WindowStats::count`] when the difference matters.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::store::TimeSeriesStore;

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation around `mean`.
pub fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

/// Z-score of `current` against `values`.
pub fn z_score_over(values: &[f64], current: f64) -> f64 {
    WindowStats::compute(values, current).z_score
}

/// Statistics of one window snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    /// Values in the window.
    pub count: usize,
    /// Mean of the window, `0.0` when empty.
    pub mean: f64,
    /// Population standard deviation of the window.
    pub std_dev: f64,
    /// `(current - mean) / std_dev`, or `0.0` per the sentinel rules.
    pub z_score: f64,
}

impl WindowStats {
    /// Compute statistics of `values` and the z-score of `current`.
    pub fn compute(values: &[f64], current: f64) -> Self {
        let Some(mean) = mean(values) else {
            return Self {
                count: 0,
                mean: 0.0,
                std_dev: 0.0,
                z_score: 0.0,
            };
        };

        let std_dev = population_std_dev(values, mean);
        let z_score = if values.len() < 2 || std_dev == 0.0 {
            0.0
        } else {
            (current - mean) / std_dev
        };

        Self {
            count: values.len(),
            mean,
            std_dev,
            z_score,
        }
    }
}

/// Computes rolling statistics from a [`TimeSeriesStore`].
///
/// Holds no state of its own beyond the window size.
#[derive(Debug, Clone)]
pub struct StatsEngine {
    store: Arc<TimeSeriesStore>,
    window: usize,
}

impl StatsEngine {
    /// Default number of values per window.
    pub const DEFAULT_WINDOW: usize = 50;

    pub fn new(store: Arc<TimeSeriesStore>, window: usize) -> Self {
        Self {
            store,
            window: window.max(1),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window
    }

    pub fn store(&self) -> &Arc<TimeSeriesStore> {
        &self.store
    }

    /// Mean of the last W values for `key`; `0.0` when the key has no history.
    pub fn rolling_average(&self, key: &str) -> f64 {
        self.try_rolling_average(key).unwrap_or(0.0)
    }

    /// Mean of the last W values for `key`, `None` when the key has no history.
    pub fn try_rolling_average(&self, key: &str) -> Option<f64> {
        mean(&self.store.window(key, self.window))
    }

    /// Z-score of `current` against the last W values for `key`.
    pub fn z_score(&self, key: &str, current: f64) -> f64 {
        z_score_over(&self.store.window(key, self.window), current)
    }

    /// Mean, deviation and z-score from a single window read.
    pub fn snapshot_stats(&self, key: &str, current: f64) -> WindowStats {
        WindowStats::compute(&self.store.window(key, self.window), current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn engine_with(values: &[f64], window: usize) -> StatsEngine {
        let store = Arc::new(TimeSeriesStore::new(1000));
        for v in values {
            store.add("device-001", *v);
        }
        StatsEngine::new(store, window)
    }

    #[test]
    fn test_rolling_average_empty_key_is_zero() {
        let engine = engine_with(&[], 50);
        assert_eq!(engine.rolling_average("device-001"), 0.0);
        assert_eq!(engine.try_rolling_average("device-001"), None);
    }

    #[test]
    fn test_rolling_average_under_window_uses_all_values() {
        let engine = engine_with(&[2.0, 4.0, 6.0], 50);
        assert_eq!(engine.rolling_average("device-001"), 4.0);
        assert_eq!(engine.try_rolling_average("device-001"), Some(4.0));
    }

    #[test]
    fn test_rolling_average_over_window_uses_last_w() {
        let values: Vec<f64> = (1..=60).map(|v| v as f64).collect();
        let engine = engine_with(&values, 50);
        // Mean of 11..=60.
        assert_eq!(engine.rolling_average("device-001"), 35.5);
    }

    #[test]
    fn test_z_score_needs_two_values() {
        let engine = engine_with(&[], 50);
        assert_eq!(engine.z_score("device-001", 99.0), 0.0);

        let engine = engine_with(&[5.0], 50);
        assert_eq!(engine.z_score("device-001", 99.0), 0.0);
    }

    #[test]
    fn test_z_score_flat_window_is_zero() {
        let engine = engine_with(&[10.0, 10.0, 10.0, 10.0], 50);
        assert_eq!(engine.z_score("device-001", 10.0), 0.0);
        assert_eq!(engine.z_score("device-001", 1000.0), 0.0);
    }

    #[test]
    fn test_spike_lands_exactly_on_two_deviations() {
        // mean 28, population variance 1296, std dev 36.
        let engine = engine_with(&[10.0, 10.0, 10.0, 10.0, 100.0], 50);
        let stats = engine.snapshot_stats("device-001", 100.0);
        assert_eq!(stats.count, 5);
        assert_eq!(stats.mean, 28.0);
        assert_eq!(stats.std_dev, 36.0);
        assert_eq!(stats.z_score, 2.0);
        assert_eq!(engine.z_score("device-001", 10.0), -0.5);
    }

    #[test]
    fn test_spike_after_longer_baseline() {
        let engine = engine_with(&[10.0, 10.0, 10.0, 10.0, 10.0, 100.0], 50);
        let z = engine.z_score("device-001", 100.0);
        assert!((z - 2.236_068).abs() < 1e-6, "z = {z}");
    }

    #[test]
    fn test_population_not_sample_variance() {
        // Sample std dev of [1, 3] is ~1.414; population is 1.
        let stats = WindowStats::compute(&[1.0, 3.0], 3.0);
        assert_eq!(stats.std_dev, 1.0);
        assert_eq!(stats.z_score, 1.0);
    }

    #[test]
    fn test_z_score_respects_window() {
        // The early outlier falls outside a window of 4.
        let engine = engine_with(&[1000.0, 1.0, 2.0, 3.0, 4.0], 4);
        let stats = engine.snapshot_stats("device-001", 4.0);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 2.5);
    }

    #[test]
    fn test_snapshot_matches_separate_reads() {
        let engine = engine_with(&[3.0, 9.0, 4.0, 12.0, 7.0], 50);
        let stats = engine.snapshot_stats("device-001", 7.0);
        assert_eq!(stats.mean, engine.rolling_average("device-001"));
        assert_eq!(stats.z_score, engine.z_score("device-001", 7.0));
    }

    proptest! {
        #[test]
        fn prop_mean_lies_within_bounds(values in prop::collection::vec(-1.0e3f64..1.0e3, 1..100)) {
            let m = mean(&values).unwrap();
            let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(m >= lo - 1e-9 && m <= hi + 1e-9);
        }

        #[test]
        fn prop_z_score_of_mean_is_zero(values in prop::collection::vec(-1.0e3f64..1.0e3, 2..100)) {
            let stats = WindowStats::compute(&values, 0.0);
            let z = z_score_over(&values, stats.mean);
            prop_assert!(z.abs() < 1e-9);
        }

        #[test]
        fn prop_z_score_is_finite_for_finite_input(
            values in prop::collection::vec(-1.0e3f64..1.0e3, 0..100),
            current in -1.0e3f64..1.0e3,
        ) {
            prop_assert!(z_score_over(&values, current).is_finite());
        }
    }
}
