//! Bounded-concurrency worker pool
//!
//! A fixed number of workers pull jobs from one queue. Shutdown has two independent
//! knobs: dropping jobs that have not started yet, and waiting for the workers.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A unit of work accepted by the pool
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Errors returned by the pool
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool is shut down")]
    ShutDown,
}

/// How a shutdown treats queued and running work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownPolicy {
    /// Drop queued jobs that no worker has started
    pub cancel_pending: bool,

    /// Return only after every worker has exited
    pub wait: bool,
}

#[derive(Default)]
struct PoolCounters {
    active: AtomicUsize,
    outstanding: AtomicUsize,
    cancel_pending: AtomicBool,
}

/// Marks a job as running for as long as it is alive
struct ActiveGuard<'a> {
    counters: &'a PoolCounters,
}

impl<'a> ActiveGuard<'a> {
    fn new(counters: &'a PoolCounters) -> Self {
        counters.active.fetch_add(1, Ordering::SeqCst);
        Self { counters }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        self.counters.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fixed-size pool of async workers
pub struct WorkerPool {
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<PoolCounters>,
    shut_down: AtomicBool,
}

impl WorkerPool {
    /// Starts `workers` workers
    ///
    /// Once `cancel` fires, queued jobs are dropped the same way as after a
    /// cancel-pending shutdown.
    pub fn new(workers: usize, cancel: CancellationToken) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let counters = Arc::new(PoolCounters::default());

        let handles = (0..workers.max(1))
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let counters = Arc::clone(&counters);
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    worker_loop(worker_id, receiver, counters, cancel).await;
                })
            })
            .collect();

        Self {
            sender: Mutex::new(Some(sender)),
            handles: Mutex::new(handles),
            counters,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Queues a job
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The job is queued
    /// * `Err(PoolError::ShutDown)` - The pool no longer accepts work
    pub fn submit<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = sender.as_ref() else {
            return Err(PoolError::ShutDown);
        };

        self.counters.outstanding.fetch_add(1, Ordering::SeqCst);
        if sender.send(Box::pin(job)).is_err() {
            self.counters.outstanding.fetch_sub(1, Ordering::SeqCst);
            return Err(PoolError::ShutDown);
        }
        Ok(())
    }

    /// Stops accepting work, then applies `policy`
    ///
    /// Calling this again is allowed; a later call with `wait` joins workers that an
    /// earlier non-waiting call left running.
    pub async fn shutdown(&self, policy: ShutdownPolicy) {
        self.shut_down.store(true, Ordering::SeqCst);
        if policy.cancel_pending {
            self.counters.cancel_pending.store(true, Ordering::SeqCst);
        }

        // Dropping the sender lets workers exit once the queue is drained
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if !policy.wait {
            return;
        }

        let handles: Vec<_> = self
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("Worker exited abnormally: {}", e);
            }
        }
    }

    /// Jobs currently running
    pub fn active_count(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    /// Jobs submitted but not yet finished or dropped
    pub fn outstanding(&self) -> usize {
        self.counters.outstanding.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

async fn worker_loop(
    worker_id: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Job>>>,
    counters: Arc<PoolCounters>,
    cancel: CancellationToken,
) {
    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let Some(job) = job else {
            break;
        };

        if counters.cancel_pending.load(Ordering::SeqCst) || cancel.is_cancelled() {
            counters.outstanding.fetch_sub(1, Ordering::SeqCst);
            continue;
        }

        let _guard = ActiveGuard::new(&counters);

        // Each job runs in its own task so a panic ends the job, not the worker
        if let Err(e) = tokio::spawn(job).await {
            if e.is_panic() {
                tracing::error!("Job panicked on worker {}", worker_id);
            } else {
                tracing::warn!("Job aborted on worker {}: {}", worker_id, e);
            }
        }
    }

    tracing::debug!("Worker {} stopped", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_runs_submitted_jobs() {
        let pool = WorkerPool::new(2, CancellationToken::new());
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let done = Arc::clone(&done);
            pool.submit(async move {
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        pool.shutdown(ShutdownPolicy {
            cancel_pending: false,
            wait: true,
        })
        .await;

        assert_eq!(done.load(Ordering::SeqCst), 10);
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.active_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(3, CancellationToken::new());
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..12 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        pool.shutdown(ShutdownPolicy {
            cancel_pending: false,
            wait: true,
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_fails() {
        let pool = WorkerPool::new(1, CancellationToken::new());
        pool.shutdown(ShutdownPolicy::default()).await;

        assert!(pool.is_shut_down());
        assert!(matches!(pool.submit(async {}), Err(PoolError::ShutDown)));
    }

    #[tokio::test]
    async fn test_cancel_pending_skips_queued_jobs() {
        let pool = WorkerPool::new(1, CancellationToken::new());
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let finished = Arc::new(AtomicBool::new(false));
        let pending_ran = Arc::new(AtomicUsize::new(0));

        {
            let started = Arc::clone(&started);
            let release = Arc::clone(&release);
            let finished = Arc::clone(&finished);
            pool.submit(async move {
                started.notify_one();
                release.notified().await;
                finished.store(true, Ordering::SeqCst);
            })
            .unwrap();
        }
        started.notified().await;

        for _ in 0..3 {
            let pending_ran = Arc::clone(&pending_ran);
            pool.submit(async move {
                pending_ran.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        assert_eq!(pool.active_count(), 1);
        assert_eq!(pool.outstanding(), 4);

        pool.shutdown(ShutdownPolicy {
            cancel_pending: true,
            wait: false,
        })
        .await;

        release.notify_one();
        pool.shutdown(ShutdownPolicy {
            cancel_pending: true,
            wait: true,
        })
        .await;

        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(pending_ran.load(Ordering::SeqCst), 0);
        assert_eq!(pool.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_kill_worker() {
        let pool = WorkerPool::new(1, CancellationToken::new());
        let after = Arc::new(AtomicBool::new(false));

        pool.submit(async {
            panic!("boom");
        })
        .unwrap();

        {
            let after = Arc::clone(&after);
            pool.submit(async move {
                after.store(true, Ordering::SeqCst);
            })
            .unwrap();
        }

        pool.shutdown(ShutdownPolicy {
            cancel_pending: false,
            wait: true,
        })
        .await;

        assert!(after.load(Ordering::SeqCst));
        assert_eq!(pool.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_cancel_token_drops_queued_jobs() {
        let cancel = CancellationToken::new();
        let pool = WorkerPool::new(1, cancel.clone());
        let ran = Arc::new(AtomicUsize::new(0));

        cancel.cancel();
        for _ in 0..3 {
            let ran = Arc::clone(&ran);
            pool.submit(async move {
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        pool.shutdown(ShutdownPolicy {
            cancel_pending: false,
            wait: true,
        })
        .await;

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(pool.outstanding(), 0);
    }
}
