//! Vigil Core
//!
//! Per-device rolling statistics and anomaly detection for telemetry streams.
//!
//! ## Components
//!
//! - **Store**: bounded per-key history, safe for concurrent writers
//! - **Stats**: rolling average and z-score over the last W values
//! - **Detector**: threshold classification of z-scores
//! - **Channel**: bounded, lossy delivery of analytics results
//! - **Pipeline**: synchronous ingestion with background analytics
//! - **Eviction**: periodic removal of idle or excess series
//!
//! ## Example
//!
//! ```no_run
//! use vigil_core::{EngineConfig, IngestionPipeline, Reading};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = IngestionPipeline::standalone(EngineConfig::default())?;
//! pipeline.ingest(Reading::new("device-001", 1_700_000_000, 42.0))?;
//!
//! let avg = pipeline.rolling_average("device-001");
//! let results = pipeline.drain_default().await;
//! # let _ = (avg, results);
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod detector;
pub mod error;
pub mod eviction;
pub mod metrics;
pub mod mirror;
pub mod pipeline;
pub mod pool;
pub mod stats;
pub mod store;
pub mod types;

pub use channel::{AnomalyChannel, PublishOutcome};
pub use config::{EngineConfig, EvictionConfig};
pub use detector::AnomalyDetector;
pub use error::{
    ComputationError, ConfigError, IngestError, IngestResult, MirrorError, MirrorResult,
};
pub use eviction::EvictionSweeper;
pub use metrics::{CounterMetrics, CounterSnapshot, MetricsSink, NoopMetrics};
pub use mirror::{spawn_purge_task, InMemoryMirror, Mirror, NoopMirror};
pub use pipeline::{AnalyticsTask, IngestionPipeline};
pub use pool::{JobHandler, SubmitOutcome, WorkerPool};
pub use stats::{StatsEngine, WindowStats};
pub use store::TimeSeriesStore;
pub use types::{AnalyticsResult, AnalyzeSummary, AuxMetrics, Reading};
