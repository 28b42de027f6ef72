//! # mapreduce
//!
//! Two-phase map-reduce over in-memory key/value collections, inline or
//! across a fixed-size worker pool.
//!
//! ## Modules
//!
//! - `collection` - Insertion-ordered key/value collections
//! - `function` - Named map/reduce functions and their registry
//! - `pool` - Worker pool, reservations and completion latch
//! - `stage` - Single-stage executor (map and reduce disciplines)
//! - `mapreduce` - Two-stage pipeline orchestrator
//! - `config` - Pipeline configuration
//! - `wordcount` - Word-count map/reduce pair
//! - `slab` - Splitting text input into slabs of lines
//! - `app`, `cli` - Binary support: logging, config, argument parsing
//!
//! ## Example
//!
//! ```
//! use mapreduce::{map_reduce, KvCollection};
//! use mapreduce::wordcount::{word_count_map, word_count_reduce};
//!
//! # tokio_test::block_on(async {
//! let data = KvCollection::try_from_pairs(vec![
//!     ("a".to_string(), "x y".to_string()),
//!     ("b".to_string(), "y y".to_string()),
//! ])?;
//! let counts = map_reduce(data, &word_count_map(), &word_count_reduce(), 2).await?;
//! assert_eq!(counts.get(&"y".to_string()), Some(&vec![3]));
//! # Ok::<(), mapreduce::MapReduceError>(())
//! # }).unwrap();
//! ```
pub mod app;
pub mod cli;
pub mod collection;
pub mod config;
pub mod error;
pub mod function;
pub mod mapreduce;
pub mod pool;
pub mod slab;
pub mod stage;
pub mod wordcount;

pub use collection::{Key, KvCollection};
pub use config::PipelineConfig;
pub use error::{Discipline, MapReduceError, MapReduceResult};
pub use function::{FunctionRegistry, MapFn, ReduceFn, StageFn};
pub use mapreduce::{map_reduce, MapReduce, PipelineOutcome, PipelineState};
pub use pool::{PoolReservation, WorkerPool};
pub use stage::{StageExecutor, StageOptions};
