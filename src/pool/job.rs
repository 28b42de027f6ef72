//! Job handles and job failure types

use std::fmt;
use thiserror::Error;
use tokio::sync::oneshot;

/// Opaque handle the pool assigns to each submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub(crate) u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Why a job produced no value
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobFailure {
    #[error("{0}")]
    Failed(String),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error("function `{function}` was not seeded into worker {worker}")]
    Unseeded { function: String, worker: usize },

    #[error("worker exited before reporting a result")]
    WorkerLost,
}

pub type JobOutcome<T> = Result<T, JobFailure>;

/// Result slot for one submitted job
#[derive(Debug)]
pub struct JobHandle<T> {
    id: JobId,
    slot: oneshot::Receiver<JobOutcome<T>>,
}

impl<T> JobHandle<T> {
    pub(crate) fn new(id: JobId, slot: oneshot::Receiver<JobOutcome<T>>) -> Self {
        Self { id, slot }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Fetch the job's outcome, waiting for it if it has not been reported
    pub async fn outcome(self) -> JobOutcome<T> {
        self.slot.await.unwrap_or(Err(JobFailure::WorkerLost))
    }
}
