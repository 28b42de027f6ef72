//! Worker execution contexts
//!
//! Each worker pulls jobs off the pool's shared queue and runs them one at a
//! time. User functions are synchronous, so a job body runs on tokio's
//! blocking thread pool while the worker task awaits it.

use super::job::JobFailure;
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace};

/// How a worker admits a dequeued job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    Run { worker: usize },
    Rejected { worker: usize },
}

type JobBody = Box<dyn FnOnce(Dispatch) -> BoxFuture<'static, ()> + Send>;

/// A queued unit of work, type-erased over its result
pub(crate) struct Job {
    pub(crate) id: u64,
    pub(crate) function: Arc<str>,
    pub(crate) body: JobBody,
}

pub(crate) type JobQueue = Arc<Mutex<mpsc::UnboundedReceiver<Job>>>;

pub(crate) struct Worker {
    id: usize,
    seeded: Arc<HashSet<Arc<str>>>,
}

impl Worker {
    pub(crate) fn new(id: usize, seeded: Arc<HashSet<Arc<str>>>) -> Self {
        Self { id, seeded }
    }

    /// Run jobs until the queue is closed and drained
    pub(crate) async fn run(self, queue: JobQueue) {
        debug!(worker = self.id, seeded = self.seeded.len(), "Worker started");
        loop {
            let job = {
                let mut rx = queue.lock().await;
                rx.recv().await
            };
            let Some(job) = job else { break };

            let dispatch = if self.seeded.contains(&job.function) {
                Dispatch::Run { worker: self.id }
            } else {
                Dispatch::Rejected { worker: self.id }
            };
            trace!(worker = self.id, job = job.id, function = %job.function, ?dispatch, "Dispatching job");
            (job.body)(dispatch).await;
        }
        debug!(worker = self.id, "Worker stopped");
    }
}

/// Run a synchronous job body on the blocking pool and classify the result
pub(crate) async fn execute<T, F>(
    function: &str,
    dispatch: Dispatch,
    work: F,
) -> Result<T, JobFailure>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    match dispatch {
        Dispatch::Rejected { worker } => Err(JobFailure::Unseeded {
            function: function.to_string(),
            worker,
        }),
        Dispatch::Run { .. } => match tokio::task::spawn_blocking(work).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(JobFailure::Failed(format!("{:#}", err))),
            Err(join_err) => Err(JobFailure::Panicked(panic_message(join_err))),
        },
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
