//! Central metrics registry for Vigil

use std::sync::Arc;

use prometheus::Registry;
use vigil_core::MetricsSink;

use super::collectors::VigilMetrics;
use crate::error::Result;

/// Default metric name prefix.
pub const DEFAULT_PREFIX: &str = "iot";

/// Central metrics registry for Vigil
pub struct MetricsRegistry {
    registry: Arc<Registry>,
    metrics: VigilMetrics,
}

impl MetricsRegistry {
    /// Create a new metrics registry with default prefix "iot"
    pub fn new() -> Result<Self> {
        Self::with_prefix(DEFAULT_PREFIX)
    }

    /// Create a new metrics registry with custom prefix
    pub fn with_prefix(prefix: &str) -> Result<Self> {
        let registry = Arc::new(Registry::new_custom(Some(prefix.to_string()), None)?);
        let metrics = VigilMetrics::new(&registry)?;
        register_process_collector(&registry)?;
        tracing::debug!(prefix, "Metrics registry created");

        Ok(Self { registry, metrics })
    }

    /// Get the Vigil-specific metrics
    pub fn metrics(&self) -> &VigilMetrics {
        &self.metrics
    }

    /// Pipeline metrics as a sink for the analytics engine
    pub fn sink(&self) -> Arc<dyn MetricsSink> {
        Arc::new(self.metrics.pipeline.clone())
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> Result<String> {
        super::exporter::export_metrics(&self.registry)
    }

    /// Get the underlying registry for custom metrics
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

/// Resident memory, thread count, CPU time and open fds of this process.
#[cfg(target_os = "linux")]
fn register_process_collector(registry: &Registry) -> Result<()> {
    let collector = prometheus::process_collector::ProcessCollector::for_self();
    registry.register(Box::new(collector))?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn register_process_collector(_registry: &Registry) -> Result<()> {
    Ok(())
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_exports_prefixed_names() {
        let registry = MetricsRegistry::new().unwrap();
        let sink = registry.sink();
        sink.record_processed();
        sink.record_anomaly();
        sink.record_job_rejected();

        let output = registry.export().unwrap();
        assert!(output.contains("iot_metrics_processed_total 1"));
        assert!(output.contains("iot_anomalies_detected_total 1"));
        assert!(output.contains("iot_analytics_jobs_rejected_total 1"));
        assert!(output.contains("iot_tracked_series 0"));
    }

    #[test]
    fn test_registry_with_prefix() {
        let registry = MetricsRegistry::with_prefix("test").unwrap();
        registry
            .metrics()
            .http
            .record_request("/api/health", "GET", 0.01);
        let output = registry.export().unwrap();
        assert!(output.contains("test_requests_total"));
        assert!(output.contains("test_request_duration_seconds"));
    }

    #[test]
    fn test_sink_shares_collectors_with_registry() {
        let registry = MetricsRegistry::new().unwrap();
        registry.sink().record_evicted(4);
        assert_eq!(registry.metrics().pipeline.series_evicted_total.get(), 4);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_registry_exports_process_gauges() {
        let registry = MetricsRegistry::new().unwrap();
        let output = registry.export().unwrap();
        assert!(output.contains("iot_process_resident_memory_bytes"));
        assert!(output.contains("iot_process_threads"));
        assert!(output.contains("iot_active_connections 0"));
    }
}
