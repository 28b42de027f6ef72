//! Fixed-size worker pool
//!
//! A [`WorkerPool`] owns `n` worker tasks sharing one job queue. Workers are
//! seeded at creation with the names of the stage functions they may run;
//! a job naming any other function is rejected by the worker that picks it
//! up.
//!
//! Stages talk to the pool through a [`PoolReservation`]: reserving fails
//! with [`MapReduceError::InvalidPool`] once the pool has been shut down,
//! every job submitted through the reservation is counted by its
//! [`CompletionLatch`], and dropping the reservation releases it exactly
//! once on every exit path.

mod job;
mod latch;
mod worker;

pub use job::{JobFailure, JobHandle, JobId, JobOutcome};
pub use latch::CompletionLatch;

use crate::error::{MapReduceError, MapReduceResult};
use crate::function::StageFn;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use worker::{Job, Worker};

/// Builder for [`WorkerPool`]
#[derive(Debug, Default)]
pub struct WorkerPoolBuilder {
    workers: usize,
    seeds: Vec<Arc<str>>,
}

impl WorkerPoolBuilder {
    /// Number of worker execution contexts
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Seed every worker with a function name
    pub fn seed(mut self, name: impl Into<Arc<str>>) -> Self {
        self.seeds.push(name.into());
        self
    }

    /// Seed every worker with a stage function
    pub fn seed_fn<K, V, O>(self, func: &StageFn<K, V, O>) -> Self {
        self.seed(func.shared_name())
    }

    /// Spawn the workers on the current tokio runtime
    pub fn build(self) -> MapReduceResult<WorkerPool> {
        if self.workers == 0 {
            return Err(MapReduceError::PoolProvisionFailed {
                workers: 0,
                reason: "a pool needs at least one worker".to_string(),
            });
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            MapReduceError::PoolProvisionFailed {
                workers: self.workers,
                reason: e.to_string(),
            }
        })?;

        let id = format!("pool-{}", uuid::Uuid::new_v4().simple());
        let seeded: Arc<HashSet<Arc<str>>> = Arc::new(self.seeds.into_iter().collect());
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Arc::new(tokio::sync::Mutex::new(rx));

        let handles = (0..self.workers)
            .map(|n| runtime.spawn(Worker::new(n, seeded.clone()).run(queue.clone())))
            .collect();

        info!(pool = %id, workers = self.workers, functions = seeded.len(), "Worker pool provisioned");

        Ok(WorkerPool {
            inner: Arc::new(PoolInner {
                id,
                size: self.workers,
                live: AtomicBool::new(true),
                reservations: AtomicUsize::new(0),
                next_job: AtomicU64::new(0),
                sender: Mutex::new(Some(tx)),
                handles: Mutex::new(handles),
            }),
        })
    }
}

struct PoolInner {
    id: String,
    size: usize,
    live: AtomicBool,
    reservations: AtomicUsize,
    next_job: AtomicU64,
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Handle to a live pool of workers
///
/// Cloning the handle shares the pool. The pool stops accepting work after
/// [`WorkerPool::shutdown`] or when the last handle is dropped.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    pub fn builder() -> WorkerPoolBuilder {
        WorkerPoolBuilder::default()
    }

    pub fn pool_id(&self) -> &str {
        &self.inner.id
    }

    pub fn size(&self) -> usize {
        self.inner.size
    }

    pub fn is_live(&self) -> bool {
        self.inner.live.load(Ordering::SeqCst)
    }

    pub fn active_reservations(&self) -> usize {
        self.inner.reservations.load(Ordering::SeqCst)
    }

    /// Reserve the pool for one stage
    pub fn reserve(&self) -> MapReduceResult<PoolReservation> {
        if !self.is_live() {
            return Err(self.invalid());
        }
        let active = self.inner.reservations.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(pool = %self.inner.id, active, "Pool reserved");
        Ok(PoolReservation {
            pool: self.clone(),
            latch: CompletionLatch::new(0),
        })
    }

    /// Stop accepting work, let queued jobs drain and join every worker
    ///
    /// Calling this on an already shut-down pool does nothing.
    pub async fn shutdown(&self) {
        if !self.inner.live.swap(false, Ordering::SeqCst) {
            return;
        }
        let outstanding = self.active_reservations();
        if outstanding > 0 {
            warn!(pool = %self.inner.id, outstanding, "Shutting down pool with active reservations");
        }

        drop(lock(&self.inner.sender).take());
        let handles: Vec<_> = lock(&self.inner.handles).drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(pool = %self.inner.id, "Worker task ended abnormally: {}", e);
            }
        }
        info!(pool = %self.inner.id, "Worker pool shut down");
    }

    fn invalid(&self) -> MapReduceError {
        MapReduceError::InvalidPool {
            pool_id: self.inner.id.clone(),
        }
    }

    fn enqueue(&self, job: Job) -> MapReduceResult<()> {
        let sender = lock(&self.inner.sender);
        match sender.as_ref() {
            Some(tx) if self.is_live() => tx.send(job).map_err(|_| self.invalid()),
            _ => Err(self.invalid()),
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("id", &self.inner.id)
            .field("size", &self.inner.size)
            .field("live", &self.is_live())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Scoped reservation of a pool for one stage
///
/// Released when dropped.
pub struct PoolReservation {
    pool: WorkerPool,
    latch: CompletionLatch,
}

impl PoolReservation {
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Jobs submitted through this reservation that have not completed
    pub fn pending(&self) -> usize {
        self.latch.pending()
    }

    /// Submit one job for the named function
    pub fn submit<T, F>(&self, function: Arc<str>, work: F) -> MapReduceResult<JobHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        let id = self.pool.inner.next_job.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        self.latch.add(1);
        let done = self.latch.guard();
        let name = function.clone();
        let body = Box::new(move |dispatch: worker::Dispatch| {
            Box::pin(async move {
                let outcome = worker::execute(&name, dispatch, work).await;
                let _ = tx.send(outcome);
                drop(done);
            }) as futures::future::BoxFuture<'static, ()>
        });

        // On failure the job is dropped here, which counts the latch back down.
        self.pool.enqueue(Job { id, function, body })?;
        Ok(JobHandle::new(JobId(id), rx))
    }

    /// Block until every job submitted through this reservation completes
    pub async fn wait_all(&self) {
        self.latch.wait().await;
    }

    /// Release the reservation now instead of at end of scope
    pub fn release(self) {}
}

impl Drop for PoolReservation {
    fn drop(&mut self) {
        let remaining = self.pool.inner.reservations.fetch_sub(1, Ordering::SeqCst) - 1;
        debug!(pool = %self.pool.inner.id, remaining, "Pool reservation released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn pool(workers: usize) -> WorkerPool {
        WorkerPool::builder()
            .workers(workers)
            .seed("square")
            .build()
            .expect("pool should build")
    }

    #[tokio::test]
    async fn test_zero_workers_fails_provisioning() {
        let err = WorkerPool::builder().workers(0).build().unwrap_err();
        assert!(matches!(
            err,
            MapReduceError::PoolProvisionFailed { workers: 0, .. }
        ));
    }

    #[test]
    fn test_build_outside_runtime_fails_provisioning() {
        let err = WorkerPool::builder().workers(2).build().unwrap_err();
        assert!(matches!(
            err,
            MapReduceError::PoolProvisionFailed { workers: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_jobs_run_and_report_by_handle() {
        let pool = pool(2);
        assert_eq!(pool.size(), 2);
        let reservation = pool.reserve().unwrap();
        assert_eq!(reservation.pool().pool_id(), pool.pool_id());
        let name: Arc<str> = Arc::from("square");

        let handles: Vec<_> = (0..5u64)
            .map(|n| reservation.submit(name.clone(), move || Ok(n * n)).unwrap())
            .collect();
        reservation.wait_all().await;
        assert_eq!(reservation.pending(), 0);

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.outcome().await.unwrap());
        }
        assert_eq!(results, vec![0, 1, 4, 9, 16]);

        drop(reservation);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_unseeded_function_is_rejected() {
        let pool = pool(1);
        let reservation = pool.reserve().unwrap();
        let handle = reservation
            .submit(Arc::from("cube"), || Ok(27u32))
            .unwrap();
        reservation.wait_all().await;

        match handle.outcome().await {
            Err(JobFailure::Unseeded { function, worker }) => {
                assert_eq!(function, "cube");
                assert_eq!(worker, 0);
            }
            other => panic!("expected Unseeded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reservation_counts_and_releases() {
        let pool = pool(1);
        assert_eq!(pool.active_reservations(), 0);
        {
            let _first = pool.reserve().unwrap();
            let second = pool.reserve().unwrap();
            assert_eq!(pool.active_reservations(), 2);
            second.release();
            assert_eq!(pool.active_reservations(), 1);
        }
        assert_eq!(pool.active_reservations(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_invalidates_handle_and_is_idempotent() {
        let pool = pool(2);
        let alias = pool.clone();
        pool.shutdown().await;
        pool.shutdown().await;

        assert!(!alias.is_live());
        match alias.reserve() {
            Err(MapReduceError::InvalidPool { pool_id }) => assert_eq!(pool_id, pool.pool_id()),
            Err(other) => panic!("expected InvalidPool, got {:?}", other),
            Ok(_) => panic!("reserve should fail on a shut-down pool"),
        }
    }

    #[tokio::test]
    async fn test_concurrency_bounded_by_worker_count() {
        let pool = pool(2);
        let reservation = pool.reserve().unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let name: Arc<str> = Arc::from("square");

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                reservation
                    .submit(name.clone(), move || {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(20));
                        running.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .unwrap()
            })
            .collect();
        reservation.wait_all().await;

        for handle in handles {
            handle.outcome().await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_jobs() {
        let pool = pool(1);
        let reservation = pool.reserve().unwrap();
        let handles: Vec<_> = (0..3u64)
            .map(|n| reservation.submit(Arc::from("square"), move || Ok(n)).unwrap())
            .collect();

        pool.shutdown().await;
        for (n, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.outcome().await, Ok(n as u64));
        }
        assert_eq!(reservation.pending(), 0);
    }
}
