//! Benchmarks for per-host and per-peer lookups.
//!
//! Run with: `cargo bench --package poolkit-benches --bench keyed_pools`

// Allow missing docs for criterion_group! macro generated functions
#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use poolkit_http::{HttpConnectionPool, HttpPoolConfig};
use poolkit_p2p::{P2pConfig, P2pConnectionPool};

/// Benchmark host client lookup with a populated map
fn bench_http_get_client(c: &mut Criterion) {
    let mut group = c.benchmark_group("http_get_client");

    for hosts in [1usize, 16, 256] {
        let pool = HttpConnectionPool::new(HttpPoolConfig::default()).expect("pool");
        let names: Vec<_> = (0..hosts).map(|i| format!("node-{i}:11434")).collect();
        for name in &names {
            pool.get_client(name);
        }

        group.bench_with_input(BenchmarkId::new("hosts", hosts), &names, |b, names| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % names.len();
                black_box(pool.get_client(&names[i]));
            });
        });
    }

    group.finish();
}

/// Benchmark peer record lookup with a populated map
fn bench_p2p_get_connection(c: &mut Criterion) {
    let mut group = c.benchmark_group("p2p_get_connection");
    let rt = tokio::runtime::Runtime::new().expect("runtime");

    for peers in [1usize, 16, 256] {
        let pool = P2pConnectionPool::new(P2pConfig::default());
        let names: Vec<_> = (0..peers).map(|i| format!("peer-{i}")).collect();
        rt.block_on(async {
            for name in &names {
                pool.get_connection(name).await.expect("connect");
            }
        });

        group.bench_with_input(BenchmarkId::new("peers", peers), &names, |b, names| {
            let mut i = 0;
            b.to_async(&rt).iter(|| {
                i = (i + 1) % names.len();
                let name = &names[i];
                let pool = &pool;
                async move { black_box(pool.get_connection(name).await.expect("lookup")) }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_http_get_client, bench_p2p_get_connection);
criterion_main!(benches);
