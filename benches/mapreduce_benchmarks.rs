//! Performance benchmarks for map-reduce pipelines
//! Measures inline versus pooled execution and per-stage overhead

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use mapreduce::wordcount::{word_count_map, word_count_reduce};
use mapreduce::{map_reduce, KvCollection, StageExecutor, WorkerPool};
use std::hint::black_box;
use tokio::runtime::Runtime;

const VOCABULARY: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa",
];

/// Create documents with a fixed number of words each
fn create_documents(count: usize, words_per_doc: usize) -> KvCollection<String, String> {
    KvCollection::try_from_pairs((0..count).map(|i| {
        let text = (0..words_per_doc)
            .map(|j| VOCABULARY[(i * 7 + j) % VOCABULARY.len()])
            .collect::<Vec<_>>()
            .join(" ");
        (format!("doc-{}", i), text)
    }))
    .unwrap()
}

fn bench_pipeline_concurrency(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("pipeline_concurrency");
    let map = word_count_map();
    let reduce = word_count_reduce();

    for concurrency in &[0usize, 1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("word_count_500_docs", concurrency),
            concurrency,
            |b, &concurrency| {
                b.to_async(&rt).iter_batched(
                    || create_documents(500, 200),
                    |data| {
                        let map = map.clone();
                        let reduce = reduce.clone();
                        async move {
                            let out = map_reduce(data, &map, &reduce, concurrency).await.unwrap();
                            black_box(out);
                        }
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_map_stage_input_size(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("map_stage_input_size");
    let map = word_count_map();
    let pool = rt.block_on(async {
        WorkerPool::builder()
            .workers(4)
            .seed_fn(&map)
            .build()
            .unwrap()
    });

    for size in &[10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("inline", size), size, |b, &size| {
            b.to_async(&rt).iter_batched(
                || create_documents(size, 50),
                |data| {
                    let map = map.clone();
                    async move {
                        black_box(StageExecutor::inline().run_map(data, &map).await.unwrap());
                    }
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("pooled", size), size, |b, &size| {
            b.to_async(&rt).iter_batched(
                || create_documents(size, 50),
                |data| {
                    let map = map.clone();
                    let executor = StageExecutor::pooled(pool.clone());
                    async move {
                        black_box(executor.run_map(data, &map).await.unwrap());
                    }
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
    rt.block_on(pool.shutdown());
}

criterion_group!(benches, bench_pipeline_concurrency, bench_map_stage_input_size);
criterion_main!(benches);
