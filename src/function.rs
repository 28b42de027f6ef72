//! Named stage functions and their registry
//!
//! Workers run user code without sharing state with the control task, so
//! every function handed to a stage is a self-contained `Send + Sync`
//! closure paired with a name. The name is what a worker is seeded with and
//! what errors report.

use crate::collection::Key;
use crate::error::{MapReduceError, MapReduceResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type BoxedStageFn<K, V, O> = dyn Fn(&K, &V) -> anyhow::Result<O> + Send + Sync;

/// A named function applied to every pair of a stage's input
pub struct StageFn<K, V, O> {
    name: Arc<str>,
    func: Arc<BoxedStageFn<K, V, O>>,
}

/// Map function: `(key, value) -> [(out_key, out_value)]`
pub type MapFn<K, V, MK, MV> = StageFn<K, V, Vec<(MK, MV)>>;

/// Reduce function: `(key, values) -> [value]`
pub type ReduceFn<K, V, R> = StageFn<K, Vec<V>, Vec<R>>;

impl<K, V, O> StageFn<K, V, O> {
    pub fn new<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(&K, &V) -> anyhow::Result<O> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        self.name.clone()
    }

    /// Invoke the function on one pair
    pub fn call(&self, key: &K, value: &V) -> anyhow::Result<O> {
        (self.func)(key, value)
    }
}

impl<K, V, O> Clone for StageFn<K, V, O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: self.func.clone(),
        }
    }
}

impl<K, V, O> fmt::Debug for StageFn<K, V, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageFn").field("name", &self.name).finish()
    }
}

/// Registry resolving map/reduce functions by name
///
/// Lets callers (the CLI, config-driven pipelines) refer to functions by a
/// registered name and fail with an argument error when a name does not
/// resolve.
pub struct FunctionRegistry<K, V, MK, MV, R> {
    maps: HashMap<String, MapFn<K, V, MK, MV>>,
    reduces: HashMap<String, ReduceFn<MK, MV, R>>,
}

impl<K, V, MK, MV, R> FunctionRegistry<K, V, MK, MV, R>
where
    K: Key,
    MK: Key,
{
    pub fn new() -> Self {
        Self {
            maps: HashMap::new(),
            reduces: HashMap::new(),
        }
    }

    pub fn register_map(mut self, func: MapFn<K, V, MK, MV>) -> Self {
        self.maps.insert(func.name().to_string(), func);
        self
    }

    pub fn register_reduce(mut self, func: ReduceFn<MK, MV, R>) -> Self {
        self.reduces.insert(func.name().to_string(), func);
        self
    }

    pub fn resolve_map(&self, name: &str) -> MapReduceResult<MapFn<K, V, MK, MV>> {
        self.maps.get(name).cloned().ok_or_else(|| {
            MapReduceError::invalid_argument(
                "map_fn",
                format!("no map function registered as `{}`", name),
            )
        })
    }

    pub fn resolve_reduce(&self, name: &str) -> MapReduceResult<ReduceFn<MK, MV, R>> {
        self.reduces.get(name).cloned().ok_or_else(|| {
            MapReduceError::invalid_argument(
                "reduce_fn",
                format!("no reduce function registered as `{}`", name),
            )
        })
    }

    /// Registered map function names, sorted
    pub fn map_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.maps.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered reduce function names, sorted
    pub fn reduce_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.reduces.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<K: Key, V, MK: Key, MV, R> Default for FunctionRegistry<K, V, MK, MV, R> {
    fn default() -> Self {
        Self::new()
    }
}
