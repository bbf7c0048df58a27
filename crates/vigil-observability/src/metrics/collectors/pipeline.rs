//! Analytics pipeline metrics

use prometheus::{Gauge, IntCounter, IntGauge, Opts, Registry};
use vigil_core::{MetricsSink, Reading};

use crate::error::Result;

/// Counters and gauges fed by the ingestion pipeline.
#[derive(Clone)]
pub struct PipelineMetrics {
    /// Readings accepted and stored
    pub metrics_processed_total: IntCounter,

    /// Readings classified as anomalous
    pub anomalies_detected_total: IntCounter,

    /// Results queued for consumers
    pub anomaly_results_published_total: IntCounter,

    /// Results dropped because the anomaly queue was full
    pub anomaly_results_dropped_total: IntCounter,

    /// Analytics jobs rejected because the worker queue was full
    pub analytics_jobs_rejected_total: IntCounter,

    /// Analytics runs skipped after a non-finite statistic
    pub analytics_skipped_total: IntCounter,

    /// Whole series removed by eviction
    pub series_evicted_total: IntCounter,

    /// Requests per second reported by the most recent reading
    pub current_rps: Gauge,

    /// Series currently held in the store
    pub tracked_series: IntGauge,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter> {
    let counter = IntCounter::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl PipelineMetrics {
    /// Create and register pipeline metrics
    pub fn new(registry: &Registry) -> Result<Self> {
        let current_rps = Gauge::with_opts(Opts::new(
            "current_rps",
            "Requests per second reported by the most recent reading",
        ))?;
        registry.register(Box::new(current_rps.clone()))?;

        let tracked_series = IntGauge::with_opts(Opts::new(
            "tracked_series",
            "Number of per-device series held in memory",
        ))?;
        registry.register(Box::new(tracked_series.clone()))?;

        Ok(Self {
            metrics_processed_total: counter(
                registry,
                "metrics_processed_total",
                "Total readings accepted and stored",
            )?,
            anomalies_detected_total: counter(
                registry,
                "anomalies_detected_total",
                "Total readings classified as anomalous",
            )?,
            anomaly_results_published_total: counter(
                registry,
                "anomaly_results_published_total",
                "Total analytics results queued for consumers",
            )?,
            anomaly_results_dropped_total: counter(
                registry,
                "anomaly_results_dropped_total",
                "Total analytics results dropped on a full queue",
            )?,
            analytics_jobs_rejected_total: counter(
                registry,
                "analytics_jobs_rejected_total",
                "Total analytics jobs rejected on a full worker queue",
            )?,
            analytics_skipped_total: counter(
                registry,
                "analytics_skipped_total",
                "Total analytics runs skipped after a non-finite statistic",
            )?,
            series_evicted_total: counter(
                registry,
                "series_evicted_total",
                "Total series removed by idle or capacity eviction",
            )?,
            current_rps,
            tracked_series,
        })
    }
}

impl MetricsSink for PipelineMetrics {
    fn record_processed(&self) {
        self.metrics_processed_total.inc();
    }

    fn record_anomaly(&self) {
        self.anomalies_detected_total.inc();
    }

    fn record_published(&self) {
        self.anomaly_results_published_total.inc();
    }

    fn record_dropped(&self) {
        self.anomaly_results_dropped_total.inc();
    }

    fn record_job_rejected(&self) {
        self.analytics_jobs_rejected_total.inc();
    }

    fn record_computation_skipped(&self) {
        self.analytics_skipped_total.inc();
    }

    fn record_evicted(&self, count: usize) {
        self.series_evicted_total.inc_by(count as u64);
    }

    fn observe_reading(&self, reading: &Reading) {
        self.current_rps.set(reading.aux.rps);
    }

    fn set_tracked_series(&self, count: usize) {
        self.tracked_series.set(count as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::AuxMetrics;

    #[test]
    fn test_sink_methods_move_collectors() {
        let registry = Registry::new();
        let metrics = PipelineMetrics::new(&registry).unwrap();

        metrics.record_processed();
        metrics.record_processed();
        metrics.record_dropped();
        metrics.record_evicted(3);
        metrics.set_tracked_series(12);
        metrics.observe_reading(&Reading::new("device-001", 1, 50.0).with_aux(AuxMetrics {
            rps: 250.0,
            memory: 40.0,
        }));

        assert_eq!(metrics.metrics_processed_total.get(), 2);
        assert_eq!(metrics.anomaly_results_dropped_total.get(), 1);
        assert_eq!(metrics.series_evicted_total.get(), 3);
        assert_eq!(metrics.tracked_series.get(), 12);
        assert_eq!(metrics.current_rps.get(), 250.0);
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        PipelineMetrics::new(&registry).unwrap();
        assert!(PipelineMetrics::new(&registry).is_err());
    }
}
