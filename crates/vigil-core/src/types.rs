//! Reading and result records.

use serde::{Deserialize, Serialize};

/// Secondary measurements carried with a reading.
///
/// These are not part of the rolling statistics; they are forwarded to the
/// metrics sink and the mirror as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AuxMetrics {
    /// Requests per second reported by the device.
    #[serde(default)]
    pub rps: f64,

    /// Memory usage reported by the device.
    #[serde(default)]
    pub memory: f64,
}

/// A single numeric reading from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Source identifier (device id).
    pub key: String,

    /// Caller-supplied epoch timestamp. Not checked for monotonicity.
    pub timestamp: i64,

    /// The analysed value.
    pub value: f64,

    /// Secondary measurements.
    #[serde(default)]
    pub aux: AuxMetrics,
}

impl Reading {
    pub fn new(key: impl Into<String>, timestamp: i64, value: f64) -> Self {
        Self {
            key: key.into(),
            timestamp,
            value,
            aux: AuxMetrics::default(),
        }
    }

    pub fn with_aux(mut self, aux: AuxMetrics) -> Self {
        self.aux = aux;
        self
    }
}

/// Outcome of analysing one reading against its key's rolling window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsResult {
    pub key: String,
    pub rolling_average: f64,
    pub z_score: f64,
    pub is_anomaly: bool,
    pub timestamp: i64,
    pub value: f64,
}

/// Answer to an "analyze" query for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeSummary {
    pub key: String,

    /// Mean of the last `window_size` values, `0.0` when the key has no
    /// history. Check `samples` to tell "no data" apart from a true zero.
    pub rolling_average: f64,

    pub window_size: usize,

    /// Number of values the average was computed from.
    pub samples: usize,
}
