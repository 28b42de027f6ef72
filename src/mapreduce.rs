//! Two-stage pipeline orchestrator
//!
//! Runs a map stage followed by a reduce stage over one input collection.
//! When the configured concurrency is above zero a worker pool is
//! provisioned first, seeded with both functions, shared by the two stages
//! and shut down after them whatever the outcome.
//!
//! # State machine
//!
//! ```text
//! [Idle] → [PoolProvisioning] → [Mapping] → [Reducing] → [Done]
//!   │              ↓                ↓            ↓
//!   └─────────→ [Failed] ←──────────┴────────────┘
//! ```
//!
//! `Idle` moves straight to `Mapping` when no pool is needed. Pool release
//! is an exit action of every transition out of `PoolProvisioning` and the
//! states after it, not a state of its own.

use crate::collection::{Key, KvCollection};
use crate::config::PipelineConfig;
use crate::error::MapReduceResult;
use crate::function::{FunctionRegistry, MapFn, ReduceFn};
use crate::pool::WorkerPool;
use crate::stage::StageExecutor;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Lifecycle state of one pipeline call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Idle,
    PoolProvisioning,
    Mapping,
    Reducing,
    Done,
    Failed,
}

impl PipelineState {
    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, PoolProvisioning)
                | (Idle, Mapping)
                | (PoolProvisioning, Mapping)
                | (Mapping, Reducing)
                | (Reducing, Done)
                | (PoolProvisioning, Failed)
                | (Mapping, Failed)
                | (Reducing, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "Idle",
            PipelineState::PoolProvisioning => "PoolProvisioning",
            PipelineState::Mapping => "Mapping",
            PipelineState::Reducing => "Reducing",
            PipelineState::Done => "Done",
            PipelineState::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

/// Records the states a pipeline call passes through
#[derive(Debug, Clone)]
struct StateTracker {
    history: Vec<PipelineState>,
}

impl StateTracker {
    fn new() -> Self {
        Self {
            history: vec![PipelineState::Idle],
        }
    }

    fn current(&self) -> PipelineState {
        *self.history.last().unwrap_or(&PipelineState::Idle)
    }

    fn advance(&mut self, next: PipelineState) {
        let current = self.current();
        debug_assert!(
            current.can_transition_to(next),
            "illegal pipeline transition {} -> {}",
            current,
            next
        );
        debug!("Pipeline transition: {} -> {}", current, next);
        self.history.push(next);
    }
}

/// Counters collected while a pipeline runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineMetrics {
    pub input_pairs: usize,
    pub intermediate_keys: usize,
    pub output_keys: usize,
    pub workers: usize,
    pub duration: Duration,
}

/// Final collection together with how the pipeline got there
#[derive(Debug, Clone)]
pub struct PipelineOutcome<K, R> {
    pub output: KvCollection<K, Vec<R>>,
    pub states: Vec<PipelineState>,
    pub metrics: PipelineMetrics,
}

type PoolHook = Arc<dyn Fn(&WorkerPool) + Send + Sync>;

/// Map-reduce pipeline driven by a [`PipelineConfig`]
#[derive(Clone, Default)]
pub struct MapReduce {
    config: PipelineConfig,
    on_pool: Option<PoolHook>,
}

impl MapReduce {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            on_pool: None,
        }
    }

    /// Call `hook` with every pool this pipeline provisions, before any stage runs
    pub fn on_pool_provisioned<F>(mut self, hook: F) -> Self
    where
        F: Fn(&WorkerPool) + Send + Sync + 'static,
    {
        self.on_pool = Some(Arc::new(hook));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run map then reduce and return the reduced collection
    pub async fn run<K, V, MK, MV, R>(
        &self,
        data: KvCollection<K, V>,
        map_fn: &MapFn<K, V, MK, MV>,
        reduce_fn: &ReduceFn<MK, MV, R>,
    ) -> MapReduceResult<KvCollection<MK, Vec<R>>>
    where
        K: Key,
        V: Send + 'static,
        MK: Key,
        MV: Send + 'static,
        R: Send + 'static,
    {
        self.run_detailed(data, map_fn, reduce_fn)
            .await
            .map(|outcome| outcome.output)
    }

    /// Resolve both functions by name, then run the pipeline
    pub async fn run_named<K, V, MK, MV, R>(
        &self,
        data: KvCollection<K, V>,
        registry: &FunctionRegistry<K, V, MK, MV, R>,
        map_name: &str,
        reduce_name: &str,
    ) -> MapReduceResult<KvCollection<MK, Vec<R>>>
    where
        K: Key,
        V: Send + 'static,
        MK: Key,
        MV: Send + 'static,
        R: Send + 'static,
    {
        let map_fn = registry.resolve_map(map_name)?;
        let reduce_fn = registry.resolve_reduce(reduce_name)?;
        self.run(data, &map_fn, &reduce_fn).await
    }

    /// Run the pipeline and report visited states and metrics
    pub async fn run_detailed<K, V, MK, MV, R>(
        &self,
        data: KvCollection<K, V>,
        map_fn: &MapFn<K, V, MK, MV>,
        reduce_fn: &ReduceFn<MK, MV, R>,
    ) -> MapReduceResult<PipelineOutcome<MK, R>>
    where
        K: Key,
        V: Send + 'static,
        MK: Key,
        MV: Send + 'static,
        R: Send + 'static,
    {
        let start = Instant::now();
        let mut tracker = StateTracker::new();
        let mut metrics = PipelineMetrics {
            input_pairs: data.len(),
            workers: self.config.concurrency,
            ..Default::default()
        };

        info!(
            map = map_fn.name(),
            reduce = reduce_fn.name(),
            pairs = data.len(),
            concurrency = self.config.concurrency,
            "Starting map-reduce pipeline"
        );

        let pool = if self.config.is_threaded() {
            tracker.advance(PipelineState::PoolProvisioning);
            let provisioned = WorkerPool::builder()
                .workers(self.config.concurrency)
                .seed_fn(map_fn)
                .seed_fn(reduce_fn)
                .build();
            match provisioned {
                Ok(pool) => {
                    if let Some(hook) = &self.on_pool {
                        hook(&pool);
                    }
                    Some(pool)
                }
                Err(e) => {
                    tracker.advance(PipelineState::Failed);
                    error!("Pool provisioning failed: {}", e);
                    return Err(e);
                }
            }
        } else {
            None
        };

        let executor = match &pool {
            Some(pool) => StageExecutor::pooled(pool.clone()),
            None => StageExecutor::inline(),
        };
        let result =
            run_stages(&executor, &mut tracker, &mut metrics, data, map_fn, reduce_fn).await;
        drop(executor);

        if let Some(pool) = pool {
            pool.shutdown().await;
        }

        metrics.duration = start.elapsed();
        match result {
            Ok(output) => {
                tracker.advance(PipelineState::Done);
                metrics.output_keys = output.len();
                info!(
                    keys = output.len(),
                    elapsed_ms = metrics.duration.as_millis() as u64,
                    "Map-reduce pipeline completed"
                );
                Ok(PipelineOutcome {
                    output,
                    states: tracker.history,
                    metrics,
                })
            }
            Err(e) => {
                tracker.advance(PipelineState::Failed);
                error!("Map-reduce pipeline failed: {}", e);
                Err(e)
            }
        }
    }
}

impl fmt::Debug for MapReduce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapReduce")
            .field("config", &self.config)
            .field("on_pool", &self.on_pool.is_some())
            .finish()
    }
}

async fn run_stages<K, V, MK, MV, R>(
    executor: &StageExecutor,
    tracker: &mut StateTracker,
    metrics: &mut PipelineMetrics,
    data: KvCollection<K, V>,
    map_fn: &MapFn<K, V, MK, MV>,
    reduce_fn: &ReduceFn<MK, MV, R>,
) -> MapReduceResult<KvCollection<MK, Vec<R>>>
where
    K: Key,
    V: Send + 'static,
    MK: Key,
    MV: Send + 'static,
    R: Send + 'static,
{
    tracker.advance(PipelineState::Mapping);
    let mapped = executor.run_map(data, map_fn).await?;
    metrics.intermediate_keys = mapped.len();

    tracker.advance(PipelineState::Reducing);
    executor.run_reduce(mapped, reduce_fn).await
}

/// Run a map-reduce pipeline with `concurrency` workers (0 for inline)
pub async fn map_reduce<K, V, MK, MV, R>(
    data: KvCollection<K, V>,
    map_fn: &MapFn<K, V, MK, MV>,
    reduce_fn: &ReduceFn<MK, MV, R>,
    concurrency: usize,
) -> MapReduceResult<KvCollection<MK, Vec<R>>>
where
    K: Key,
    V: Send + 'static,
    MK: Key,
    MV: Send + 'static,
    R: Send + 'static,
{
    MapReduce::new(PipelineConfig::new(concurrency))
        .run(data, map_fn, reduce_fn)
        .await
}
