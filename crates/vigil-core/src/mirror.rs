//! Mirror seam for copying readings and results to an external cache.
//!
//! The engine writes to the mirror from the analytics path only and never
//! lets a mirror failure reach ingestion or publication. Expired entries are
//! removed by a separate purge task (see [`spawn_purge_task`]).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::{MirrorError, MirrorResult};
use crate::types::{AnalyticsResult, Reading};

/// Key under which the latest analytics result is kept.
pub const LATEST_RESULT_KEY: &str = "analytics:latest";

/// Mirror key for a reading.
pub fn reading_key(reading: &Reading) -> String {
    format!("metric:{}:{}", reading.key, reading.timestamp)
}

/// External cache of recent readings and results.
#[async_trait]
pub trait Mirror: Send + Sync {
    /// Copy a raw reading.
    async fn store_reading(&self, reading: &Reading) -> MirrorResult<()>;

    /// Copy an analytics result.
    async fn store_result(&self, result: &AnalyticsResult) -> MirrorResult<()>;

    /// Check that the mirror is reachable.
    async fn ping(&self) -> MirrorResult<()>;

    /// Drop expired entries. Returns the number removed.
    async fn purge_expired(&self) -> usize {
        0
    }
}

/// Mirror that stores nothing and is always reachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMirror;

#[async_trait]
impl Mirror for NoopMirror {
    async fn store_reading(&self, _reading: &Reading) -> MirrorResult<()> {
        Ok(())
    }

    async fn store_result(&self, _result: &AnalyticsResult) -> MirrorResult<()> {
        Ok(())
    }

    async fn ping(&self) -> MirrorResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct MirrorEntry {
    payload: String,
    expires_at: Instant,
}

/// In-process mirror with per-entry expiry.
#[derive(Debug)]
pub struct InMemoryMirror {
    entries: RwLock<HashMap<String, MirrorEntry>>,
    reading_ttl: Duration,
    result_ttl: Duration,
    available: AtomicBool,
}

impl InMemoryMirror {
    pub fn new(reading_ttl: Duration, result_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            reading_ttl,
            result_ttl,
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the backing store going away or coming back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> MirrorResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(MirrorError::Unavailable("in-memory mirror disabled".into()))
        }
    }

    async fn put(&self, key: String, payload: String, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            MirrorEntry {
                payload,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.payload.clone())
    }

    /// A mirrored reading, if present and not expired.
    pub async fn get_reading(&self, key: &str, timestamp: i64) -> Option<Reading> {
        let payload = self.get(&format!("metric:{key}:{timestamp}")).await?;
        serde_json::from_str(&payload).ok()
    }

    /// The most recently mirrored result, if not expired.
    pub async fn latest_result(&self) -> Option<AnalyticsResult> {
        let payload = self.get(LATEST_RESULT_KEY).await?;
        serde_json::from_str(&payload).ok()
    }

    /// Entries currently held, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for InMemoryMirror {
    fn default() -> Self {
        Self::new(Duration::from_secs(600), Duration::from_secs(300))
    }
}

#[async_trait]
impl Mirror for InMemoryMirror {
    async fn store_reading(&self, reading: &Reading) -> MirrorResult<()> {
        self.check_available()?;
        let payload = serde_json::to_string(reading)?;
        self.put(reading_key(reading), payload, self.reading_ttl).await;
        Ok(())
    }

    async fn store_result(&self, result: &AnalyticsResult) -> MirrorResult<()> {
        self.check_available()?;
        let payload = serde_json::to_string(result)?;
        self.put(LATEST_RESULT_KEY.to_string(), payload, self.result_ttl)
            .await;
        Ok(())
    }

    async fn ping(&self) -> MirrorResult<()> {
        self.check_available()
    }

    async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }
}

/// Purge expired entries from `mirror` every `every` until `shutdown` flips
/// to `true` or its sender is dropped.
pub fn spawn_purge_task(
    mirror: Arc<dyn Mirror>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        info!(interval_secs = every.as_secs(), "Mirror purge task started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let purged = mirror.purge_expired().await;
                    if purged > 0 {
                        debug!(purged, "Purged expired mirror entries");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Mirror purge task stopped");
    })
}
