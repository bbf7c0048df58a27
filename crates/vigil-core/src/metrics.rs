//! Metrics sink seam.
//!
//! The engine reports counters through an injected [`MetricsSink`] instead of
//! process globals, so it runs without any metrics backend in tests. All
//! methods default to no-ops.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::types::Reading;

/// Receiver of engine counters and gauges.
pub trait MetricsSink: Send + Sync {
    /// A reading was accepted and stored.
    fn record_processed(&self) {}

    /// A reading was classified as anomalous.
    fn record_anomaly(&self) {}

    /// A result was queued for consumers.
    fn record_published(&self) {}

    /// A result was dropped because the anomaly queue was full.
    fn record_dropped(&self) {}

    /// An analytics job was rejected because the worker queue was full.
    fn record_job_rejected(&self) {}

    /// Analytics for a reading failed and the result was skipped.
    fn record_computation_skipped(&self) {}

    /// Whole series were removed by eviction.
    fn record_evicted(&self, _count: usize) {}

    /// Latest accepted reading, for gauges over its secondary fields.
    fn observe_reading(&self, _reading: &Reading) {}

    /// Number of series currently tracked.
    fn set_tracked_series(&self, _count: usize) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {}

/// Point-in-time copy of [`CounterMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub processed: u64,
    pub anomalies: u64,
    pub published: u64,
    pub dropped: u64,
    pub jobs_rejected: u64,
    pub computations_skipped: u64,
    pub evicted: u64,
}

/// In-process monotonic counters. Never reset.
#[derive(Debug, Default)]
pub struct CounterMetrics {
    processed: AtomicU64,
    anomalies: AtomicU64,
    published: AtomicU64,
    dropped: AtomicU64,
    jobs_rejected: AtomicU64,
    computations_skipped: AtomicU64,
    evicted: AtomicU64,
}

impl CounterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            anomalies: self.anomalies.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            jobs_rejected: self.jobs_rejected.load(Ordering::Relaxed),
            computations_skipped: self.computations_skipped.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSink for CounterMetrics {
    fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_anomaly(&self) {
        self.anomalies.fetch_add(1, Ordering::Relaxed);
    }

    fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    fn record_job_rejected(&self) {
        self.jobs_rejected.fetch_add(1, Ordering::Relaxed);
    }

    fn record_computation_skipped(&self) {
        self.computations_skipped.fetch_add(1, Ordering::Relaxed);
    }

    fn record_evicted(&self, count: usize) {
        self.evicted.fetch_add(count as u64, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = CounterMetrics::new();
        metrics.record_processed();
        metrics.record_processed();
        metrics.record_anomaly();
        metrics.record_evicted(3);
        metrics.record_evicted(2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.processed, 2);
        assert_eq!(snapshot.anomalies, 1);
        assert_eq!(snapshot.evicted, 5);
        assert_eq!(snapshot.dropped, 0);
    }

    #[test]
    fn test_noop_accepts_everything() {
        let sink: &dyn MetricsSink = &NoopMetrics;
        sink.record_processed();
        sink.observe_reading(&Reading::new("d", 0, 1.0));
        sink.set_tracked_series(10);
    }
}
