//! Ingestion pipeline.
//!
//! `ingest` validates a reading and appends it to the store before
//! returning. Statistics, classification, publication and mirroring run
//! afterwards on the analytics worker pool; nothing on that path can fail
//! the caller.
//!
//! Because analytics runs after the append, a reading's window always
//! contains the reading itself, and may also contain readings for the same
//! key that arrived before its job was picked up.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::channel::{AnomalyChannel, PublishOutcome};
use crate::config::EngineConfig;
use crate::detector::AnomalyDetector;
use crate::error::{ComputationError, ConfigError, IngestError, IngestResult};
use crate::metrics::{MetricsSink, NoopMetrics};
use crate::mirror::{Mirror, NoopMirror};
use crate::pool::{JobHandler, SubmitOutcome, WorkerPool};
use crate::stats::{self, StatsEngine};
use crate::store::TimeSeriesStore;
use crate::types::{AnalyticsResult, AnalyzeSummary, Reading};

/// Per-reading analytics job: statistics, classification, publication.
pub struct AnalyticsTask {
    stats: StatsEngine,
    detector: AnomalyDetector,
    channel: Arc<AnomalyChannel>,
    metrics: Arc<dyn MetricsSink>,
    mirror: Arc<dyn Mirror>,
    anomalies_only: bool,
}

impl AnalyticsTask {
    /// Compute and classify without publishing.
    pub fn analyze(&self, reading: &Reading) -> Result<AnalyticsResult, ComputationError> {
        let window = self.stats.snapshot_stats(&reading.key, reading.value);

        if !window.mean.is_finite() {
            return Err(ComputationError::NonFinite {
                key: reading.key.clone(),
                statistic: "rolling average",
            });
        }
        if !window.z_score.is_finite() {
            return Err(ComputationError::NonFinite {
                key: reading.key.clone(),
                statistic: "z-score",
            });
        }

        Ok(self.detector.classify(reading, window.mean, window.z_score))
    }

    fn publish(&self, result: AnalyticsResult) {
        if self.anomalies_only && !result.is_anomaly {
            return;
        }
        match self.channel.try_publish(result) {
            PublishOutcome::Enqueued => self.metrics.record_published(),
            PublishOutcome::Dropped => self.metrics.record_dropped(),
        }
    }
}

#[async_trait]
impl JobHandler<Reading> for AnalyticsTask {
    async fn handle(&self, reading: Reading) {
        if let Err(e) = self.mirror.store_reading(&reading).await {
            debug!(key = %reading.key, error = %e, "Mirror write for reading failed");
        }

        let result = match self.analyze(&reading) {
            Ok(result) => result,
            Err(e) => {
                error!(key = %reading.key, error = %e, "Analytics skipped");
                self.metrics.record_computation_skipped();
                return;
            }
        };

        if result.is_anomaly {
            self.metrics.record_anomaly();
            warn!(
                key = %result.key,
                value = result.value,
                z_score = result.z_score,
                rolling_average = result.rolling_average,
                "Anomaly detected"
            );
        }

        if let Err(e) = self.mirror.store_result(&result).await {
            debug!(key = %result.key, error = %e, "Mirror write for result failed");
        }

        self.publish(result);
    }
}

/// Orchestrates store, statistics, detection and delivery.
pub struct IngestionPipeline {
    config: EngineConfig,
    store: Arc<TimeSeriesStore>,
    stats: StatsEngine,
    channel: Arc<AnomalyChannel>,
    metrics: Arc<dyn MetricsSink>,
    pool: WorkerPool<Reading>,
}

impl IngestionPipeline {
    /// Build a pipeline and spawn its analytics workers on the current
    /// tokio runtime.
    pub fn new(
        config: EngineConfig,
        metrics: Arc<dyn MetricsSink>,
        mirror: Arc<dyn Mirror>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let store = Arc::new(TimeSeriesStore::new(config.buffer_capacity));
        let stats = StatsEngine::new(store.clone(), config.window_size);
        let channel = Arc::new(AnomalyChannel::new(config.anomaly_queue_capacity));

        let task = Arc::new(AnalyticsTask {
            stats: stats.clone(),
            detector: AnomalyDetector::new(config.anomaly_threshold),
            channel: channel.clone(),
            metrics: metrics.clone(),
            mirror,
            anomalies_only: config.publish_anomalies_only,
        });
        let pool = WorkerPool::spawn(config.workers, config.job_queue_capacity, task);

        Ok(Self {
            config,
            store,
            stats,
            channel,
            metrics,
            pool,
        })
    }

    /// Pipeline with no metrics backend and no mirror.
    pub fn standalone(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::new(config, Arc::new(NoopMetrics), Arc::new(NoopMirror))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<TimeSeriesStore> {
        &self.store
    }

    pub fn channel(&self) -> &Arc<AnomalyChannel> {
        &self.channel
    }

    pub fn metrics(&self) -> &Arc<dyn MetricsSink> {
        &self.metrics
    }

    /// Accept a reading.
    ///
    /// On success the reading is already visible to [`Self::rolling_average`];
    /// its analytics result appears on the channel later, or not at all if
    /// the worker queue was full.
    pub fn ingest(&self, reading: Reading) -> IngestResult<()> {
        if reading.key.is_empty() {
            return Err(IngestError::EmptyKey);
        }
        if !reading.value.is_finite() {
            return Err(IngestError::NonFiniteValue { key: reading.key });
        }

        self.store.add(&reading.key, reading.value);
        self.metrics.record_processed();
        self.metrics.observe_reading(&reading);

        match self.pool.submit(reading) {
            SubmitOutcome::Queued => {}
            SubmitOutcome::Rejected => {
                self.metrics.record_job_rejected();
                warn!("Analytics queue full, skipping analytics for reading");
            }
            SubmitOutcome::Closed => {
                debug!("Analytics pool closed, skipping analytics for reading");
            }
        }
        Ok(())
    }

    /// Mean of the last W values for `key`; `0.0` when it has no history.
    pub fn rolling_average(&self, key: &str) -> f64 {
        self.stats.rolling_average(key)
    }

    /// Z-score of `current` against `key`'s window.
    pub fn z_score(&self, key: &str, current: f64) -> f64 {
        self.stats.z_score(key, current)
    }

    /// Rolling average plus the window size and sample count it used.
    pub fn analyze(&self, key: &str) -> AnalyzeSummary {
        let window = self.store.window(key, self.stats.window_size());
        AnalyzeSummary {
            key: key.to_string(),
            rolling_average: stats::mean(&window).unwrap_or(0.0),
            window_size: self.stats.window_size(),
            samples: window.len(),
        }
    }

    /// Drain queued results within `max_wait`.
    pub async fn drain(&self, max_wait: Duration) -> Vec<AnalyticsResult> {
        self.channel.drain(max_wait).await
    }

    /// Drain queued results within the configured budget.
    pub async fn drain_default(&self) -> Vec<AnalyticsResult> {
        self.drain(self.config.drain_timeout()).await
    }

    /// Analytics jobs waiting for a worker.
    pub fn pending_jobs(&self) -> usize {
        self.pool.pending()
    }

    /// Stop accepting analytics jobs and wait for queued ones to finish.
    /// Readings ingested afterwards are still stored.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("config", &self.config)
            .field("series", &self.store.series_count())
            .field("channel", &self.channel)
            .field("pool", &self.pool)
            .finish()
    }
}
