//! Configuration for vigil-daemon

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use vigil_core::EngineConfig;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Analytics engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Mirror configuration
    #[serde(default)]
    pub mirror: MirrorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Prefix for exported Prometheus metric names
    #[serde(default = "default_metrics_prefix")]
    pub metrics_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
            metrics_prefix: default_metrics_prefix(),
        }
    }
}

/// Where readings and results are mirrored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MirrorConfig {
    /// No mirror
    Disabled,

    /// In-process mirror with expiring entries
    Memory {
        /// Lifetime of a mirrored reading in seconds
        #[serde(default = "default_reading_ttl")]
        reading_ttl_secs: u64,

        /// Lifetime of the latest mirrored result in seconds
        #[serde(default = "default_result_ttl")]
        result_ttl_secs: u64,

        /// Seconds between purges of expired entries
        #[serde(default = "default_purge_interval")]
        purge_interval_secs: u64,
    },
}

impl Default for MirrorConfig {
    fn default() -> Self {
        MirrorConfig::Memory {
            reading_ttl_secs: default_reading_ttl(),
            result_ttl_secs: default_result_ttl(),
            purge_interval_secs: default_purge_interval(),
        }
    }
}

impl MirrorConfig {
    /// Entry lifetimes, `None` when the mirror is disabled.
    pub fn ttls(&self) -> Option<(Duration, Duration)> {
        match self {
            MirrorConfig::Disabled => None,
            MirrorConfig::Memory {
                reading_ttl_secs,
                result_ttl_secs,
                ..
            } => Some((
                Duration::from_secs(*reading_ttl_secs),
                Duration::from_secs(*result_ttl_secs),
            )),
        }
    }

    /// How often expired entries are purged, `None` when the mirror is disabled.
    pub fn purge_interval(&self) -> Option<Duration> {
        match self {
            MirrorConfig::Disabled => None,
            MirrorConfig::Memory {
                purge_interval_secs,
                ..
            } => Some(Duration::from_secs((*purge_interval_secs).max(1))),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_metrics_prefix() -> String {
    vigil_observability::metrics::DEFAULT_PREFIX.to_string()
}

fn default_reading_ttl() -> u64 {
    600
}

fn default_result_ttl() -> u64 {
    300
}

fn default_purge_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration from defaults, an optional file and `VIGIL_*`
    /// environment variables, in increasing precedence.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Nested keys use a double underscore: VIGIL_ENGINE__WINDOW_SIZE=100
        builder = builder.add_source(
            config::Environment::with_prefix("VIGIL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert_eq!(config.server.metrics_prefix, "iot");
        assert_eq!(config.engine.window_size, 50);
        assert!(matches!(config.mirror, MirrorConfig::Memory { .. }));
        assert!(config.engine.validate().is_ok());
    }

    #[test]
    fn test_load_without_file_matches_defaults() {
        let config = DaemonConfig::load(None).unwrap();
        assert_eq!(config.engine.anomaly_queue_capacity, 100);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_mirror_config_parsing() {
        let disabled: MirrorConfig = serde_json::from_str(r#"{"type": "disabled"}"#).unwrap();
        assert_eq!(disabled.ttls(), None);

        let memory: MirrorConfig =
            serde_json::from_str(r#"{"type": "memory", "result_ttl_secs": 30}"#).unwrap();
        assert_eq!(
            memory.ttls(),
            Some((Duration::from_secs(600), Duration::from_secs(30)))
        );
        assert_eq!(memory.purge_interval(), Some(Duration::from_secs(60)));
        assert_eq!(disabled.purge_interval(), None);
    }

    #[test]
    fn test_env_overrides_nested_keys() {
        std::env::set_var("VIGIL_ENGINE__WINDOW_SIZE", "7");
        let config = DaemonConfig::load(None);
        std::env::remove_var("VIGIL_ENGINE__WINDOW_SIZE");

        let config = config.unwrap();
        assert_eq!(config.engine.window_size, 7);
        assert_eq!(config.engine.buffer_capacity, 1000);
    }
}
