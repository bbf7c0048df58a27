//! HTTP request metrics

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};

use crate::error::Result;

/// Metrics for the HTTP surface
#[derive(Clone)]
pub struct HttpMetrics {
    /// Requests by endpoint and method
    pub requests_total: IntCounterVec,

    /// Request latency by endpoint
    pub request_duration_seconds: HistogramVec,

    /// Requests currently being served
    pub active_connections: IntGauge,
}

impl HttpMetrics {
    /// Create and register HTTP metrics
    pub fn new(registry: &Registry) -> Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new("requests_total", "Total HTTP requests"),
            &["endpoint", "method"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("request_duration_seconds", "HTTP request duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
            &["endpoint"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        let active_connections =
            IntGauge::new("active_connections", "HTTP requests currently in flight")?;
        registry.register(Box::new(active_connections.clone()))?;

        Ok(Self {
            requests_total,
            request_duration_seconds,
            active_connections,
        })
    }

    /// Record one completed request
    pub fn record_request(&self, endpoint: &str, method: &str, duration_secs: f64) {
        self.requests_total
            .with_label_values(&[endpoint, method])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[endpoint])
            .observe(duration_secs);
    }

    /// Count a request as in flight until the returned guard is dropped
    pub fn in_flight(&self) -> InFlightGuard {
        self.active_connections.inc();
        InFlightGuard {
            gauge: self.active_connections.clone(),
        }
    }
}

/// Decrements the in-flight gauge on drop, including when the request
/// future is cancelled.
pub struct InFlightGuard {
    gauge: IntGauge,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_request() {
        let registry = Registry::new();
        let metrics = HttpMetrics::new(&registry).unwrap();
        metrics.record_request("/api/metrics", "POST", 0.002);
        metrics.record_request("/api/metrics", "POST", 0.004);

        assert_eq!(
            metrics
                .requests_total
                .with_label_values(&["/api/metrics", "POST"])
                .get(),
            2
        );
        assert_eq!(
            metrics
                .request_duration_seconds
                .with_label_values(&["/api/metrics"])
                .get_sample_count(),
            2
        );
    }

    #[test]
    fn test_in_flight_guard_tracks_active_connections() {
        let registry = Registry::new();
        let metrics = HttpMetrics::new(&registry).unwrap();

        let first = metrics.in_flight();
        let second = metrics.in_flight();
        assert_eq!(metrics.active_connections.get(), 2);

        drop(first);
        assert_eq!(metrics.active_connections.get(), 1);
        drop(second);
        assert_eq!(metrics.active_connections.get(), 0);
    }
}
