//! Metrics collection and export for Vigil
//!
//! Provides Prometheus-compatible metrics for the analytics engine and the
//! HTTP surface.

pub mod collectors;
pub mod exporter;
pub mod registry;

pub use collectors::{http::HttpMetrics, pipeline::PipelineMetrics, VigilMetrics};
pub use exporter::{export_metrics, CONTENT_TYPE};
pub use registry::{MetricsRegistry, DEFAULT_PREFIX};

