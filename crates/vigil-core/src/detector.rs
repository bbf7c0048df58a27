//! Threshold classification of z-scores.

use crate::types::{AnalyticsResult, Reading};

/// Flags readings whose z-score magnitude exceeds a threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyDetector {
    threshold: f64,
}

impl AnomalyDetector {
    /// Default z-score threshold.
    pub const DEFAULT_THRESHOLD: f64 = 2.0;

    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Strictly greater than: a z-score equal to the threshold is normal.
    pub fn is_anomalous(&self, z_score: f64) -> bool {
        z_score.abs() > self.threshold
    }

    /// Build the result record for `reading`.
    pub fn classify(&self, reading: &Reading, rolling_average: f64, z_score: f64) -> AnalyticsResult {
        AnalyticsResult {
            key: reading.key.clone(),
            rolling_average,
            z_score,
            is_anomaly: self.is_anomalous(z_score),
            timestamp: reading.timestamp,
            value: reading.value,
        }
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_is_not_anomalous() {
        let detector = AnomalyDetector::default();
        assert!(!detector.is_anomalous(2.0));
        assert!(!detector.is_anomalous(-2.0));
        assert!(detector.is_anomalous(2.000_001));
        assert!(detector.is_anomalous(-2.5));
        assert!(!detector.is_anomalous(0.0));
    }

    #[test]
    fn test_classify_copies_reading_fields() {
        let detector = AnomalyDetector::default();
        let reading = Reading::new("device-007", 1_700_000_000, 96.5);
        let result = detector.classify(&reading, 31.0, 3.1);

        assert_eq!(result.key, "device-007");
        assert_eq!(result.timestamp, 1_700_000_000);
        assert_eq!(result.value, 96.5);
        assert_eq!(result.rolling_average, 31.0);
        assert!(result.is_anomaly);
    }

    #[test]
    fn test_nan_is_not_anomalous() {
        assert!(!AnomalyDetector::default().is_anomalous(f64::NAN));
    }

    #[test]
    fn test_custom_threshold() {
        let detector = AnomalyDetector::new(3.0);
        let reading = Reading::new("device-001", 1, 50.0);
        assert!(!detector.classify(&reading, 10.0, 2.9).is_anomaly);
        assert!(detector.classify(&reading, 10.0, -3.1).is_anomaly);
    }
}
