//! Vigil Observability
//!
//! Prometheus metrics for the Vigil analytics engine.
//!
//! ## Features
//!
//! - **Pipeline metrics**: a [`vigil_core::MetricsSink`] backed by Prometheus collectors
//! - **HTTP metrics**: request counts and latency by endpoint
//! - **Export**: Prometheus text exposition

pub mod error;
pub mod metrics;

pub use error::ObservabilityError;
pub use metrics::{
    export_metrics, HttpMetrics, MetricsRegistry, PipelineMetrics, VigilMetrics, CONTENT_TYPE,
};

