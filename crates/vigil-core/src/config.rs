//! Engine configuration.
//!
//! Defines window sizes, buffer and queue capacities, the anomaly threshold,
//! and the whole-series eviction policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the analytics engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of most recent values used for rolling statistics.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Hard cap on retained values per key.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// A reading is anomalous when `|z| > anomaly_threshold`.
    #[serde(default = "default_anomaly_threshold")]
    pub anomaly_threshold: f64,

    /// Capacity of the anomaly delivery queue.
    #[serde(default = "default_anomaly_queue_capacity")]
    pub anomaly_queue_capacity: usize,

    /// Time budget for a single drain call, in milliseconds.
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,

    /// Number of analytics worker tasks.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Pending analytics jobs allowed before new jobs are rejected.
    #[serde(default = "default_job_queue_capacity")]
    pub job_queue_capacity: usize,

    /// Queue only anomalous results instead of every result.
    #[serde(default)]
    pub publish_anomalies_only: bool,

    /// Whole-series eviction.
    #[serde(default)]
    pub eviction: EvictionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            buffer_capacity: default_buffer_capacity(),
            anomaly_threshold: default_anomaly_threshold(),
            anomaly_queue_capacity: default_anomaly_queue_capacity(),
            drain_timeout_ms: default_drain_timeout_ms(),
            workers: default_workers(),
            job_queue_capacity: default_job_queue_capacity(),
            publish_anomalies_only: false,
            eviction: EvictionConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Drain budget as a [`Duration`].
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// Check the configuration for values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::Invalid("window_size must be > 0".into()));
        }
        if self.buffer_capacity < self.window_size {
            return Err(ConfigError::Invalid(format!(
                "buffer_capacity ({}) must be >= window_size ({})",
                self.buffer_capacity, self.window_size
            )));
        }
        if !self.anomaly_threshold.is_finite() || self.anomaly_threshold <= 0.0 {
            return Err(ConfigError::Invalid(
                "anomaly_threshold must be a positive finite number".into(),
            ));
        }
        if self.anomaly_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "anomaly_queue_capacity must be > 0".into(),
            ));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be > 0".into()));
        }
        if self.job_queue_capacity == 0 {
            return Err(ConfigError::Invalid("job_queue_capacity must be > 0".into()));
        }
        self.eviction.validate()
    }
}

/// Eviction of whole per-key series that stopped receiving readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvictionConfig {
    /// Run the background sweeper.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Series not written for this long are removed.
    #[serde(default = "default_idle_ttl")]
    pub idle_ttl_secs: u64,

    /// Upper bound on tracked series; least recently written go first.
    #[serde(default = "default_max_series")]
    pub max_series: usize,

    /// Interval between sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            idle_ttl_secs: default_idle_ttl(),
            max_series: default_max_series(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl EvictionConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "eviction.sweep_interval_secs must be > 0".into(),
            ));
        }
        if self.enabled && self.max_series == 0 {
            return Err(ConfigError::Invalid("eviction.max_series must be > 0".into()));
        }
        Ok(())
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_window_size() -> usize {
    50
}

fn default_buffer_capacity() -> usize {
    1000
}

fn default_anomaly_threshold() -> f64 {
    2.0
}

fn default_anomaly_queue_capacity() -> usize {
    100
}

fn default_drain_timeout_ms() -> u64 {
    100
}

fn default_workers() -> usize {
    4
}

fn default_job_queue_capacity() -> usize {
    1024
}

fn default_idle_ttl() -> u64 {
    3600
}

fn default_max_series() -> usize {
    100_000
}

fn default_sweep_interval() -> u64 {
    60
}
