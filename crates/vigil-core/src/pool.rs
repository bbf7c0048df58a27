//! Bounded worker pool for background jobs.
//!
//! Jobs go into a fixed-size queue served by a fixed number of long-lived
//! tasks. Submission never waits: when the queue is full the job is rejected
//! and the caller decides what to count or log.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Processes one job at a time on a pool worker.
#[async_trait]
pub trait JobHandler<J>: Send + Sync {
    async fn handle(&self, job: J);
}

/// Result of submitting a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Queued,
    /// Queue full; the job was discarded.
    Rejected,
    /// Pool is shutting down; the job was discarded.
    Closed,
}

/// Fixed set of tasks draining a bounded job queue.
pub struct WorkerPool<J> {
    sender: RwLock<Option<mpsc::Sender<J>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    queue_capacity: usize,
}

impl<J: Send + 'static> WorkerPool<J> {
    /// Spawn `workers` tasks on the current tokio runtime.
    ///
    /// Both `workers` and `queue_capacity` are raised to at least one.
    pub fn spawn<H>(workers: usize, queue_capacity: usize, handler: Arc<H>) -> Self
    where
        H: JobHandler<J> + 'static,
    {
        let queue_capacity = queue_capacity.max(1);
        let (sender, receiver) = mpsc::channel::<J>(queue_capacity);
        let receiver = Arc::new(AsyncMutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|worker_id| {
                let receiver = receiver.clone();
                let handler = handler.clone();
                tokio::spawn(async move {
                    loop {
                        let job = {
                            let mut receiver = receiver.lock().await;
                            receiver.recv().await
                        };
                        let Some(job) = job else {
                            break;
                        };
                        if AssertUnwindSafe(handler.handle(job))
                            .catch_unwind()
                            .await
                            .is_err()
                        {
                            error!(worker_id, "Job handler panicked; worker continues");
                        }
                    }
                    debug!(worker_id, "Worker stopped");
                })
            })
            .collect();

        Self {
            sender: RwLock::new(Some(sender)),
            handles: Mutex::new(handles),
            queue_capacity,
        }
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Jobs waiting for a worker.
    pub fn pending(&self) -> usize {
        self.sender
            .read()
            .as_ref()
            .map(|sender| self.queue_capacity.saturating_sub(sender.capacity()))
            .unwrap_or(0)
    }

    /// Queue `job` without waiting.
    pub fn submit(&self, job: J) -> SubmitOutcome {
        let sender = self.sender.read();
        let Some(sender) = sender.as_ref() else {
            return SubmitOutcome::Closed;
        };
        match sender.try_send(job) {
            Ok(()) => SubmitOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => SubmitOutcome::Rejected,
            Err(mpsc::error::TrySendError::Closed(_)) => SubmitOutcome::Closed,
        }
    }

    /// Stop accepting jobs, let workers finish what is queued, and wait for
    /// them to exit.
    pub async fn shutdown(&self) {
        self.sender.write().take();
        let handles: Vec<_> = std::mem::take(&mut *self.handles.lock());
        let workers = handles.len();
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker task failed during shutdown");
            }
        }
        if workers > 0 {
            info!(workers, "Worker pool stopped");
        }
    }
}

impl<J> std::fmt::Debug for WorkerPool<J> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("queue_capacity", &self.queue_capacity)
            .field("workers", &self.handles.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    #[derive(Default)]
    struct Counting {
        seen: AtomicUsize,
    }

    #[async_trait]
    impl JobHandler<usize> for Counting {
        async fn handle(&self, job: usize) {
            self.seen.fetch_add(job, Ordering::SeqCst);
        }
    }

    /// Blocks every job until a permit is released.
    struct Gate {
        release: Semaphore,
        started: AtomicUsize,
    }

    #[async_trait]
    impl JobHandler<()> for Gate {
        async fn handle(&self, _job: ()) {
            self.started.fetch_add(1, Ordering::SeqCst);
            if let Ok(permit) = self.release.acquire().await {
                permit.forget();
            }
        }
    }

    struct Panicky {
        seen: AtomicUsize,
    }

    #[async_trait]
    impl JobHandler<bool> for Panicky {
        async fn handle(&self, explode: bool) {
            if explode {
                panic!("boom");
            }
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_jobs_run_and_shutdown_drains_queue() {
        let handler = Arc::new(Counting::default());
        let pool = WorkerPool::spawn(3, 64, handler.clone());
        for job in 1..=10 {
            assert_eq!(pool.submit(job), SubmitOutcome::Queued);
        }
        pool.shutdown().await;

        assert_eq!(handler.seen.load(Ordering::SeqCst), 55);
        assert_eq!(pool.submit(1), SubmitOutcome::Closed);
    }

    #[tokio::test]
    async fn test_full_queue_rejects_without_waiting() {
        let handler = Arc::new(Gate {
            release: Semaphore::new(0),
            started: AtomicUsize::new(0),
        });
        let pool = WorkerPool::spawn(1, 2, handler.clone());

        // First job occupies the only worker.
        assert_eq!(pool.submit(()), SubmitOutcome::Queued);
        while handler.started.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        assert_eq!(pool.submit(()), SubmitOutcome::Queued);
        assert_eq!(pool.submit(()), SubmitOutcome::Queued);
        assert_eq!(pool.pending(), 2);
        assert_eq!(pool.submit(()), SubmitOutcome::Rejected);

        handler.release.add_permits(3);
        pool.shutdown().await;
        assert_eq!(handler.started.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_kill_worker() {
        let handler = Arc::new(Panicky {
            seen: AtomicUsize::new(0),
        });
        let pool = WorkerPool::spawn(1, 8, handler.clone());
        pool.submit(true);
        pool.submit(false);
        pool.submit(false);
        pool.shutdown().await;

        assert_eq!(handler.seen.load(Ordering::SeqCst), 2);
    }
}
