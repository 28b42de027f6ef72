//! Single-stage execution engine
//!
//! A stage applies one [`StageFn`] to every pair of a [`KvCollection`] and
//! assembles the results. Without a pool the pairs are visited inline in
//! insertion order; with a pool one job is submitted per pair in insertion
//! order, the stage blocks until the whole job set has completed, and the
//! results are harvested in submission order.
//!
//! The first failure aborts the stage. Output assembled so far is dropped,
//! so a caller only ever sees a complete collection or an error.
//!
//! Stages compose: the output of [`StageExecutor::run_map`] is a valid input
//! for [`StageExecutor::run_reduce`], and any stage's output can feed a
//! further stage run on the same executor.

use crate::collection::{Key, KvCollection};
use crate::error::{Discipline, MapReduceError, MapReduceResult};
use crate::function::{MapFn, ReduceFn, StageFn};
use crate::pool::{JobHandle, WorkerPool};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Options for a stage executor
#[derive(Debug, Clone, Default)]
pub struct StageOptions {
    /// Pool to distribute work units over; `None` runs inline
    pub pool: Option<WorkerPool>,
}

/// Runs stages inline or across a worker pool
#[derive(Debug, Clone, Default)]
pub struct StageExecutor {
    pool: Option<WorkerPool>,
}

/// Job ledger entry: the key a pending job was submitted for
struct LedgerEntry<K, O> {
    key: K,
    handle: JobHandle<O>,
}

impl StageExecutor {
    pub fn new(options: StageOptions) -> Self {
        Self { pool: options.pool }
    }

    /// Executor that runs every work unit on the calling task
    pub fn inline() -> Self {
        Self::default()
    }

    /// Executor that distributes work units over `pool`
    pub fn pooled(pool: WorkerPool) -> Self {
        Self { pool: Some(pool) }
    }

    pub fn pool(&self) -> Option<&WorkerPool> {
        self.pool.as_ref()
    }

    /// Run a map stage, grouping every emitted value under its output key
    ///
    /// Values for an output key are appended in the order results are
    /// processed: insertion order inline, submission order when pooled.
    pub async fn run_map<K, V, MK, MV>(
        &self,
        data: KvCollection<K, V>,
        func: &MapFn<K, V, MK, MV>,
    ) -> MapReduceResult<KvCollection<MK, Vec<MV>>>
    where
        K: Key,
        V: Send + 'static,
        MK: Key,
        MV: Send + 'static,
    {
        let outputs = self.execute(Discipline::Map, data, func).await?;

        let mut grouped = KvCollection::new();
        for (_, pairs) in outputs {
            for (key, value) in pairs {
                grouped.append(key, value);
            }
        }
        Ok(grouped)
    }

    /// Run a reduce stage, storing each result list under its input key
    pub async fn run_reduce<K, V, R>(
        &self,
        data: KvCollection<K, Vec<V>>,
        func: &ReduceFn<K, V, R>,
    ) -> MapReduceResult<KvCollection<K, Vec<R>>>
    where
        K: Key,
        V: Send + 'static,
        R: Send + 'static,
    {
        let outputs = self.execute(Discipline::Reduce, data, func).await?;

        let mut reduced = KvCollection::new();
        for (key, values) in outputs {
            reduced.insert(key, values);
        }
        Ok(reduced)
    }

    async fn execute<K, V, O>(
        &self,
        discipline: Discipline,
        data: KvCollection<K, V>,
        func: &StageFn<K, V, O>,
    ) -> MapReduceResult<Vec<(K, O)>>
    where
        K: Key,
        V: Send + 'static,
        O: Send + 'static,
    {
        if data.is_empty() {
            debug!(%discipline, function = func.name(), "Empty input, skipping stage");
            return Ok(Vec::new());
        }

        let pairs = data.len();
        let start = Instant::now();
        info!(%discipline, function = func.name(), pairs, pooled = self.pool.is_some(), "Starting stage");

        let outputs = match &self.pool {
            None => execute_inline(discipline, data, func)?,
            Some(pool) => execute_pooled(discipline, data, func, pool).await?,
        };

        info!(
            %discipline,
            function = func.name(),
            pairs,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Stage completed"
        );
        Ok(outputs)
    }
}

fn execute_inline<K, V, O>(
    discipline: Discipline,
    data: KvCollection<K, V>,
    func: &StageFn<K, V, O>,
) -> MapReduceResult<Vec<(K, O)>>
where
    K: Key,
{
    let mut outputs = Vec::with_capacity(data.len());
    for (key, value) in data {
        trace!(%discipline, key = %key, "Applying function inline");
        match func.call(&key, &value) {
            Ok(output) => outputs.push((key, output)),
            Err(err) => return Err(stage_failed(discipline, func, &key, format!("{:#}", err))),
        }
    }
    Ok(outputs)
}

async fn execute_pooled<K, V, O>(
    discipline: Discipline,
    data: KvCollection<K, V>,
    func: &StageFn<K, V, O>,
    pool: &WorkerPool,
) -> MapReduceResult<Vec<(K, O)>>
where
    K: Key,
    V: Send + 'static,
    O: Send + 'static,
{
    let reservation = pool.reserve()?;
    let name = func.shared_name();

    let mut ledger = Vec::with_capacity(data.len());
    for (key, value) in data {
        let job_fn = func.clone();
        let job_key = key.clone();
        match reservation.submit(name.clone(), move || job_fn.call(&job_key, &value)) {
            Ok(handle) => {
                trace!(%discipline, key = %key, job = %handle.id(), "Submitted job");
                ledger.push(LedgerEntry { key, handle });
            }
            Err(err) => {
                warn!(%discipline, pool = pool.pool_id(), "Submission failed, waiting for submitted jobs: {}", err);
                reservation.wait_all().await;
                return Err(err);
            }
        }
    }

    debug!(%discipline, jobs = ledger.len(), pool = pool.pool_id(), "Waiting for jobs");
    reservation.wait_all().await;

    let mut outputs = Vec::with_capacity(ledger.len());
    for LedgerEntry { key, handle } in ledger {
        let job = handle.id();
        match handle.outcome().await {
            Ok(output) => outputs.push((key, output)),
            Err(failure) => {
                debug!(%discipline, %job, key = %key, "Job failed, discarding stage output");
                return Err(stage_failed(discipline, func, &key, failure.to_string()));
            }
        }
    }
    Ok(outputs)
}

fn stage_failed<K: Key, V, O>(
    discipline: Discipline,
    func: &StageFn<K, V, O>,
    key: &K,
    message: String,
) -> MapReduceError {
    MapReduceError::StageFailed {
        function: func.name().to_string(),
        discipline,
        key: key.to_string(),
        message,
    }
}
