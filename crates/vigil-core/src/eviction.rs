//! Background removal of whole series.
//!
//! The sweeper runs on its own interval, separate from ingestion, and
//! applies two rules in order: drop series idle longer than the TTL, then
//! drop the least recently written series beyond the `max_series` bound.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::EvictionConfig;
use crate::metrics::MetricsSink;
use crate::store::TimeSeriesStore;

/// Periodic eviction of idle and excess series.
pub struct EvictionSweeper {
    store: Arc<TimeSeriesStore>,
    config: EvictionConfig,
    metrics: Arc<dyn MetricsSink>,
}

impl EvictionSweeper {
    pub fn new(
        store: Arc<TimeSeriesStore>,
        config: EvictionConfig,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            store,
            config,
            metrics,
        }
    }

    /// Run one sweep. Returns the number of series removed.
    pub fn sweep(&self) -> usize {
        let idle = self.store.evict_idle(self.config.idle_ttl());
        let excess = self.store.evict_excess(self.config.max_series);
        let removed = idle + excess;

        if removed > 0 {
            info!(
                idle = idle,
                excess = excess,
                remaining = self.store.series_count(),
                "Evicted series"
            );
            self.metrics.record_evicted(removed);
        } else {
            debug!(remaining = self.store.series_count(), "Eviction sweep found nothing");
        }
        self.metrics.set_tracked_series(self.store.series_count());
        removed
    }

    /// Sweep on the configured interval until `shutdown` flips to `true`
    /// or its sender is dropped.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.config.sweep_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it.
            ticker.tick().await;

            info!(
                interval_secs = self.config.sweep_interval_secs,
                idle_ttl_secs = self.config.idle_ttl_secs,
                max_series = self.config.max_series,
                "Eviction sweeper started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep();
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Eviction sweeper stopped");
        })
    }
}
