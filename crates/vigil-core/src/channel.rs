//! Bounded, lossy delivery of analytics results to consumers.
//!
//! Producers never wait: when the queue is full the new result is dropped
//! and counted. Consumers drain whatever is queued under a wall-clock
//! budget.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tracing::warn;

use crate::types::AnalyticsResult;

/// What happened to a published result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Queued for the next drain.
    Enqueued,
    /// Queue was full; the result was discarded.
    Dropped,
}

/// Fixed-capacity queue of [`AnalyticsResult`]s.
pub struct AnomalyChannel {
    sender: mpsc::Sender<AnalyticsResult>,
    receiver: Mutex<mpsc::Receiver<AnalyticsResult>>,
    capacity: usize,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl AnomalyChannel {
    /// Default queue capacity.
    pub const DEFAULT_CAPACITY: usize = 100;

    /// Create a queue holding at most `capacity` results (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: Mutex::new(receiver),
            capacity,
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Results currently waiting to be drained.
    pub fn len(&self) -> usize {
        self.capacity.saturating_sub(self.sender.capacity())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Results accepted since creation.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Results discarded since creation.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Enqueue `result` without waiting.
    pub fn try_publish(&self, result: AnalyticsResult) -> PublishOutcome {
        match self.sender.try_send(result) {
            Ok(()) => {
                self.published.fetch_add(1, Ordering::Relaxed);
                PublishOutcome::Enqueued
            }
            Err(mpsc::error::TrySendError::Full(result)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(key = %result.key, "Anomaly channel full, dropping result");
                PublishOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(result)) => {
                // Unreachable while the channel owns its receiver.
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(key = %result.key, "Anomaly channel closed, dropping result");
                PublishOutcome::Dropped
            }
        }
    }

    /// Collect queued results, oldest first, until the queue is empty or
    /// `max_wait` has elapsed. Never waits for new results to arrive.
    pub async fn drain(&self, max_wait: Duration) -> Vec<AnalyticsResult> {
        let deadline = Instant::now() + max_wait;

        // Another consumer may hold the receiver; give up at the deadline.
        let Ok(mut receiver) = tokio::time::timeout_at(deadline, self.receiver.lock()).await else {
            return Vec::new();
        };

        let mut drained = Vec::new();
        while let Ok(result) = receiver.try_recv() {
            drained.push(result);
            if Instant::now() >= deadline {
                break;
            }
        }
        drained
    }
}

impl Default for AnomalyChannel {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for AnomalyChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnomalyChannel")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("published", &self.published_count())
            .field("dropped", &self.dropped_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn result(key: &str, timestamp: i64) -> AnalyticsResult {
        AnalyticsResult {
            key: key.to_string(),
            rolling_average: 10.0,
            z_score: 2.5,
            is_anomaly: true,
            timestamp,
            value: 90.0,
        }
    }

    #[tokio::test]
    async fn test_full_queue_drops_newest() {
        let channel = AnomalyChannel::new(3);
        for ts in 0..3 {
            assert_eq!(channel.try_publish(result("d", ts)), PublishOutcome::Enqueued);
        }
        assert_eq!(channel.try_publish(result("d", 3)), PublishOutcome::Dropped);
        assert_eq!(channel.len(), 3);
        assert_eq!(channel.dropped_count(), 1);

        let drained = channel.drain(Duration::from_millis(100)).await;
        let timestamps: Vec<i64> = drained.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![0, 1, 2]);
        assert!(channel.is_empty());
    }

    #[tokio::test]
    async fn test_drain_empty_returns_within_budget() {
        let channel = AnomalyChannel::new(10);
        let drained = tokio::time::timeout(
            Duration::from_secs(1),
            channel.drain(Duration::from_millis(100)),
        )
        .await
        .expect("drain must not block");
        assert!(drained.is_empty());
    }

    #[tokio::test]
    async fn test_queue_accepts_again_after_drain() {
        let channel = AnomalyChannel::new(2);
        channel.try_publish(result("a", 1));
        channel.try_publish(result("a", 2));
        assert_eq!(channel.drain(Duration::from_millis(50)).await.len(), 2);

        assert_eq!(channel.try_publish(result("a", 3)), PublishOutcome::Enqueued);
        let drained = channel.drain(Duration::from_millis(50)).await;
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].timestamp, 3);
        assert_eq!(channel.published_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_gives_up_while_receiver_busy() {
        let channel = Arc::new(AnomalyChannel::new(4));
        channel.try_publish(result("a", 1));

        let guard = channel.receiver.lock().await;
        let drained = channel.drain(Duration::from_millis(100)).await;
        assert!(drained.is_empty());
        drop(guard);

        assert_eq!(channel.drain(Duration::from_millis(100)).await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_publishers_never_exceed_capacity() {
        let channel = Arc::new(AnomalyChannel::new(50));
        let mut handles = Vec::new();
        for worker in 0..8 {
            let channel = channel.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    channel.try_publish(result("burst", worker * 100 + i));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(channel.published_count() + channel.dropped_count(), 200);
        assert_eq!(channel.published_count(), 50);
        assert_eq!(channel.drain(Duration::from_millis(100)).await.len(), 50);
    }
}
