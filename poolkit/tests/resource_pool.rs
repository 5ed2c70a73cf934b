//! Integration tests for the generic resource pool.
//!
//! These drive `ResourcePool` through the mock factory from
//! `poolkit-testing` and check the sizing, validation and lifecycle
//! guarantees callers rely on.

use std::sync::Arc;
use std::time::Duration;

use poolkit::prelude::*;
use poolkit_testing::{
    MockFactory, MockResource, assert_counters_consistent, assert_pool_bound, with_timeout,
};
use tokio::time::Instant;

fn pool(config: PoolConfig, factory: &MockFactory) -> ResourcePool<MockResource> {
    ResourcePool::new(config, factory.clone())
}

// =============================================================================
// Sizing
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checkouts_stay_within_bound() {
    const MAX: usize = 4;
    let factory = MockFactory::new().with_create_delay(Duration::from_millis(2));
    let pool = Arc::new(pool(PoolConfig::new().max_connections(MAX), &factory));

    let workers: Vec<_> = (0..32)
        .map(|_| {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move {
                let cancel = CancellationToken::new();
                for _ in 0..20 {
                    let resource = pool.get(&cancel).await.unwrap();
                    assert_pool_bound(&pool.stats(), MAX);
                    tokio::task::yield_now().await;
                    pool.put(resource).await.unwrap();
                }
            })
        })
        .collect();

    with_timeout(Duration::from_secs(30), async {
        for result in futures::future::join_all(workers).await {
            result.unwrap();
        }
    })
    .await;

    let stats = pool.stats();
    assert_pool_bound(&stats, MAX);
    assert_counters_consistent(&stats);
    assert!(factory.peak_live() <= MAX as u64);
    assert_eq!(stats.active_connections, 0);
    assert!(stats.connections_reused > 0);
}

#[tokio::test]
async fn test_min_max_scenario() {
    let factory = MockFactory::new();
    let pool = Arc::new(pool(
        PoolConfig::new().min_connections(2).max_connections(4),
        &factory,
    ));
    pool.start().await.unwrap();
    assert_eq!(pool.stats().total_connections, 2);
    assert_eq!(pool.stats().idle_connections, 2);

    let cancel = CancellationToken::new();
    let mut held = Vec::new();
    for _ in 0..4 {
        held.push(pool.get(&cancel).await.unwrap());
    }
    let stats = pool.stats();
    assert_eq!(stats.total_connections, 4);
    assert_eq!(stats.active_connections, 4);
    assert_eq!(stats.connections_created, 4);

    let waiter = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.get(&CancellationToken::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished(), "fifth get must wait for a put");

    let returned = held.pop().unwrap();
    let serial = returned.serial;
    pool.put(returned).await.unwrap();

    let fifth = with_timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fifth.serial, serial);
    assert_eq!(pool.stats().total_connections, 4);
    assert_eq!(factory.created(), 4);

    held.push(fifth);
    for resource in held {
        pool.put(resource).await.unwrap();
    }
    pool.stop().await;
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_stale_resource_is_never_handed_out() {
    let max_age = Duration::from_secs(10);
    let factory = MockFactory::new().with_max_valid_age(max_age);
    let pool = pool(PoolConfig::new().max_connections(3), &factory);
    let cancel = CancellationToken::new();

    let first = pool.get(&cancel).await.unwrap();
    let second = pool.get(&cancel).await.unwrap();
    pool.put(first).await.unwrap();
    pool.put(second).await.unwrap();

    tokio::time::advance(Duration::from_secs(11)).await;

    for _ in 0..3 {
        let resource = pool.get(&cancel).await.unwrap();
        assert!(resource.get_ref().created_at.elapsed() <= max_age);
        pool.put(resource).await.unwrap();
    }

    let stats = pool.stats();
    assert_eq!(stats.connections_closed, 2);
    assert_eq!(stats.total_connections, 1);
    assert_counters_consistent(&stats);
}

#[tokio::test]
async fn test_put_of_invalid_resource_returns_error_and_frees_slot() {
    let factory = MockFactory::new();
    let pool = pool(PoolConfig::new().max_connections(1), &factory);
    let cancel = CancellationToken::new();

    let resource = pool.get(&cancel).await.unwrap();
    factory.fail_validate(true);
    let err = pool.put(resource).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(pool.stats().total_connections, 0);
    assert_eq!(factory.closed(), 1);

    factory.fail_validate(false);
    let replacement = pool.get(&cancel).await.unwrap();
    assert_eq!(replacement.serial, 2);
}

#[tokio::test]
async fn test_health_check_closes_failing_idle_resources() {
    let factory = MockFactory::new();
    let pool = pool(
        PoolConfig::new().min_connections(3).max_connections(5),
        &factory,
    );
    pool.start().await.unwrap();

    factory.fail_validate(true);
    pool.health_check().await;

    let stats = pool.stats();
    assert_eq!(stats.idle_connections, 0);
    assert_eq!(stats.health_check_errors, 3);
    assert_eq!(factory.closed(), 3);
    pool.stop().await;
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_get_at_capacity_returns_cancelled() {
    let factory = MockFactory::new();
    let pool = pool(PoolConfig::new().max_connections(1), &factory);
    let held = pool.get(&CancellationToken::new()).await.unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = pool.get(&cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(pool.stats().total_connections, 1);

    pool.put(held).await.unwrap();
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_stop_is_idempotent_and_closes_pool() {
    let factory = MockFactory::new();
    let pool = pool(
        PoolConfig::new().min_connections(2).max_connections(4),
        &factory,
    );
    pool.start().await.unwrap();
    assert!(pool.is_running());

    let cancel = CancellationToken::new();
    let outstanding = pool.get(&cancel).await.unwrap();
    pool.put(outstanding).await.unwrap();

    pool.stop().await;
    pool.stop().await;

    let stats = pool.stats();
    assert_eq!(stats.active_connections, 0);
    assert_eq!(stats.total_connections, 0);
    assert_eq!(factory.live(), 0);
    assert!(!pool.is_running());
    assert!(matches!(pool.get(&cancel).await, Err(PoolError::Closed)));
}

#[tokio::test]
async fn test_put_after_stop_closes_resource() {
    let factory = MockFactory::new();
    let pool = pool(PoolConfig::new().max_connections(2), &factory);
    let resource = pool.get(&CancellationToken::new()).await.unwrap();

    pool.stop().await;
    pool.put(resource).await.unwrap();

    assert_eq!(factory.live(), 0);
    assert_eq!(pool.stats().total_connections, 0);
}

#[tokio::test]
async fn test_failed_prewarm_reports_creation_error() {
    let factory = MockFactory::new();
    factory.fail_create(true);
    let pool = pool(PoolConfig::new().min_connections(2), &factory);

    let err = pool.start().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Creation);
    assert!(err.to_string().contains("failed to create initial connection"));
    assert!(!pool.is_running());

    factory.fail_create(false);
    pool.start().await.unwrap();
    assert_eq!(pool.stats().total_connections, 2);
    pool.stop().await;
}
