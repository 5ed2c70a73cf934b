//! Benchmarks for resource pool checkout and return.
//!
//! Run with: `cargo bench --package poolkit-benches --bench resource_pool`

// Allow missing docs for criterion_group! macro generated functions
#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use poolkit_core::CancellationToken;
use poolkit_pool::{PoolConfig, ResourcePool};
use poolkit_testing::{MockFactory, MockResource};

fn warm_pool(rt: &tokio::runtime::Runtime, min: usize, max: usize) -> Arc<ResourcePool<MockResource>> {
    let pool = ResourcePool::new(
        PoolConfig::new().min_connections(min).max_connections(max),
        MockFactory::new(),
    );
    rt.block_on(pool.start()).expect("prewarm");
    Arc::new(pool)
}

/// Benchmark a single checkout and return on a warm pool
fn bench_get_put(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let pool = warm_pool(&rt, 4, 4);
    let cancel = CancellationToken::new();

    c.bench_function("get_put", |b| {
        b.to_async(&rt).iter(|| {
            let pool = Arc::clone(&pool);
            let cancel = cancel.clone();
            async move {
                let resource = pool.get(&cancel).await.expect("get");
                pool.put(resource).await.expect("put");
            }
        });
    });

    rt.block_on(pool.stop());
}

/// Benchmark tasks contending for a pool of 4
fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended");
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let pool = warm_pool(&rt, 4, 4);

    for tasks in [4u64, 16, 64] {
        group.throughput(Throughput::Elements(tasks));
        group.bench_with_input(BenchmarkId::new("tasks", tasks), &tasks, |b, &tasks| {
            b.to_async(&rt).iter(|| {
                let pool = Arc::clone(&pool);
                async move {
                    let handles: Vec<_> = (0..tasks)
                        .map(|_| {
                            let pool = Arc::clone(&pool);
                            tokio::spawn(async move {
                                let cancel = CancellationToken::new();
                                let resource = pool.get(&cancel).await.expect("get");
                                tokio::task::yield_now().await;
                                pool.put(resource).await.expect("put");
                            })
                        })
                        .collect();
                    for handle in futures::future::join_all(handles).await {
                        handle.expect("task");
                    }
                }
            });
        });
    }

    group.finish();
    rt.block_on(pool.stop());
}

criterion_group!(benches, bench_get_put, bench_contended);
criterion_main!(benches);
