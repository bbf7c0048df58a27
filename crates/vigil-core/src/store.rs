//! Bounded per-key time-series store.
//!
//! Each key owns a FIFO buffer capped at `capacity` values. Buffers live in a
//! sharded concurrent map: a write takes the exclusive lock of the key's
//! shard only, a read takes the shared lock of that shard and copies the
//! requested tail out before releasing it. Writers on keys in different
//! shards never contend, and a reader never observes a half-applied append.
//!
//! Whole series are removed only by the eviction calls, which run off the
//! write path (see [`crate::eviction`]).

use std::collections::VecDeque;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

/// One key's retained history.
#[derive(Debug)]
struct SeriesBuffer {
    values: VecDeque<f64>,
    last_write: Instant,
}

impl SeriesBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            // Grows on demand; most keys never reach the cap.
            values: VecDeque::with_capacity(capacity.min(64)),
            last_write: Instant::now(),
        }
    }

    fn push(&mut self, value: f64, capacity: usize) {
        self.values.push_back(value);
        while self.values.len() > capacity {
            self.values.pop_front();
        }
        self.last_write = Instant::now();
    }

    fn tail(&self, size: usize) -> Vec<f64> {
        let start = self.values.len().saturating_sub(size);
        self.values.range(start..).copied().collect()
    }
}

/// Thread-safe store of recent values per key.
#[derive(Debug)]
pub struct TimeSeriesStore {
    series: DashMap<String, SeriesBuffer>,
    capacity: usize,
}

impl TimeSeriesStore {
    /// Default hard cap on values retained per key.
    pub const DEFAULT_CAPACITY: usize = 1000;

    /// Create a store retaining at most `capacity` values per key.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            series: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Per-key hard cap.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `value` to `key`'s buffer, dropping the oldest values beyond
    /// the cap. Creates the buffer on first use.
    pub fn add(&self, key: &str, value: f64) {
        if let Some(mut buffer) = self.series.get_mut(key) {
            buffer.push(value, self.capacity);
            return;
        }
        self.series
            .entry(key.to_owned())
            .or_insert_with(|| SeriesBuffer::new(self.capacity))
            .push(value, self.capacity);
    }

    /// The most recent `min(size, len)` values for `key`, oldest first.
    /// Empty when the key is unknown.
    pub fn window(&self, key: &str, size: usize) -> Vec<f64> {
        self.series
            .get(key)
            .map(|buffer| buffer.tail(size))
            .unwrap_or_default()
    }

    /// Every retained value for `key`, oldest first.
    pub fn values(&self, key: &str) -> Vec<f64> {
        self.window(key, self.capacity)
    }

    /// Number of values retained for `key`.
    pub fn len(&self, key: &str) -> usize {
        self.series.get(key).map(|b| b.values.len()).unwrap_or(0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.series.contains_key(key)
    }

    /// Number of tracked series.
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Remove series that have not been written for at least `ttl`.
    /// Returns the number of series removed.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let before = self.series.len();
        self.series
            .retain(|_, buffer| buffer.last_write.elapsed() < ttl);
        before.saturating_sub(self.series.len())
    }

    /// Remove the least recently written series until at most `max_series`
    /// remain. Returns the number of series removed.
    pub fn evict_excess(&self, max_series: usize) -> usize {
        let excess = self.series.len().saturating_sub(max_series);
        if excess == 0 {
            return 0;
        }

        let mut by_age: Vec<(String, Instant)> = self
            .series
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().last_write))
            .collect();
        by_age.sort_by_key(|(_, last_write)| *last_write);

        let mut removed = 0;
        for (key, seen) in by_age.into_iter().take(excess) {
            // Skip series written since the scan.
            if self
                .series
                .remove_if(&key, |_, buffer| buffer.last_write <= seen)
                .is_some()
            {
                removed += 1;
            }
        }
        removed
    }
}

impl Default for TimeSeriesStore {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
