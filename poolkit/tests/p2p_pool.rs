//! Integration tests for the P2P connection pool.
//!
//! Time-based eviction runs on a paused Tokio clock so that idle and lifetime
//! thresholds can be crossed with `tokio::time::advance`.

use std::sync::Arc;
use std::time::Duration;

use poolkit::prelude::*;
use poolkit_testing::{MockConnector, with_timeout};

fn pool(config: P2pConfig) -> (P2pConnectionPool, MockConnector) {
    let connector = MockConnector::new();
    (
        P2pConnectionPool::with_connector(config, connector.clone()),
        connector,
    )
}

// =============================================================================
// Deduplication
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lookups_create_one_connection() {
    let connector = MockConnector::new().with_connect_delay(Duration::from_millis(20));
    let pool = Arc::new(P2pConnectionPool::with_connector(
        P2pConfig::default(),
        connector.clone(),
    ));

    let lookups: Vec<_> = (0..24)
        .map(|_| {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.get_connection("node-1").await })
        })
        .collect();

    let connections: Vec<_> = with_timeout(Duration::from_secs(5), futures::future::join_all(lookups))
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    assert!(connections.iter().all(|c| Arc::ptr_eq(c, &connections[0])));
    assert_eq!(connections[0].address(), "mock://node-1");
    assert_eq!(connector.connects(), 1);

    let stats = pool.stats().await;
    assert_eq!(stats.connections_created, 1);
    assert_eq!(stats.total_connections, 1);
}

// =============================================================================
// Eviction
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_idle_peer_is_evicted_by_health_check() {
    let (pool, connector) = pool(P2pConfig::new().idle_timeout(Duration::from_secs(120)));
    let conn = pool.get_connection("node-1").await.unwrap();

    tokio::time::advance(Duration::from_secs(121)).await;
    pool.health_check().await;

    assert_eq!(pool.peer_count().await, 0);
    assert!(!conn.is_connected());
    let stats = pool.stats().await;
    assert_eq!(stats.connection_errors, 1);
    assert_eq!(stats.connections_evicted, 1);
    assert_eq!(stats.active_connections, 0);
    assert_eq!(connector.disconnects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_recently_used_peer_survives_health_check() {
    let (pool, _) = pool(P2pConfig::new().idle_timeout(Duration::from_secs(120)));
    pool.get_connection("node-1").await.unwrap();

    tokio::time::advance(Duration::from_secs(100)).await;
    pool.send_message("node-1", b"keepalive").await.unwrap();
    tokio::time::advance(Duration::from_secs(100)).await;
    pool.health_check().await;

    assert_eq!(pool.peer_count().await, 1);
    assert_eq!(pool.stats().await.connection_errors, 0);
}

#[tokio::test]
async fn test_failed_probe_evicts_peer() {
    let (pool, connector) = pool(P2pConfig::default());
    pool.get_connection("node-1").await.unwrap();
    pool.get_connection("node-2").await.unwrap();

    connector.fail_probe(true);
    pool.health_check().await;

    assert_eq!(connector.probes(), 2);
    assert_eq!(pool.peer_count().await, 0);
    assert_eq!(pool.stats().await.connection_errors, 2);
}

#[tokio::test(start_paused = true)]
async fn test_expired_peer_is_evicted_by_cleanup() {
    let (pool, connector) = pool(
        P2pConfig::new()
            .idle_timeout(Duration::from_secs(3600))
            .max_lifetime(Duration::from_secs(600)),
    );
    pool.get_connection("node-1").await.unwrap();

    for _ in 0..6 {
        tokio::time::advance(Duration::from_secs(100)).await;
        pool.send_message("node-1", b"x").await.unwrap();
    }
    tokio::time::advance(Duration::from_secs(1)).await;

    assert_eq!(pool.cleanup().await, 1);
    assert_eq!(pool.peer_count().await, 0);
    assert_eq!(connector.disconnects(), 1);

    // a later lookup reconnects
    pool.get_connection("node-1").await.unwrap();
    assert_eq!(connector.connects(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_background_tasks_evict_without_double_close() {
    let (pool, connector) = pool(
        P2pConfig::new()
            .idle_timeout(Duration::from_secs(60))
            .health_check_interval(Duration::from_secs(30)),
    );
    pool.start().unwrap();
    pool.get_connection("node-1").await.unwrap();
    pool.get_connection("node-2").await.unwrap();

    tokio::time::sleep(Duration::from_secs(125)).await;

    assert_eq!(pool.peer_count().await, 0);
    let stats = pool.stats().await;
    assert_eq!(stats.active_connections, 0);
    assert_eq!(stats.connections_evicted, 2);
    assert_eq!(connector.disconnects(), 2);
    pool.stop().await;
}

// =============================================================================
// Messaging
// =============================================================================

#[tokio::test]
async fn test_send_errors_are_counted_by_kind() {
    let (pool, connector) = pool(P2pConfig::default());

    connector.fail_send(Some(ErrorKind::Timeout));
    let err = pool.send_message("node-1", b"a").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    connector.fail_send(Some(ErrorKind::Connection));
    pool.send_message("node-1", b"b").await.unwrap_err();

    connector.fail_send(Some(ErrorKind::Validation));
    let err = pool.send_message("node-1", b"c").await.unwrap_err();
    assert!(matches!(&err, PoolError::Peer { peer_id, .. } if peer_id == "node-1"));

    let stats = pool.stats().await;
    assert_eq!(stats.timeout_errors, 1);
    assert_eq!(stats.connection_errors, 1);
    assert_eq!(stats.protocol_errors, 1);
    assert_eq!(stats.messages_sent, 0);
    assert_eq!(pool.connection_stats().await["node-1"].errors, 3);
}

#[tokio::test]
async fn test_unreachable_peer() {
    let (pool, connector) = pool(P2pConfig::default());
    connector.fail_connect(true);

    let err = pool.send_message("node-9", b"hello").await.unwrap_err();
    assert!(err.to_string().contains("node-9"));
    pool.receive_message("node-9", b"hi").await;

    let stats = pool.stats().await;
    assert_eq!(stats.failed_connections, 2);
    assert_eq!(stats.messages_received, 1);
    assert_eq!(pool.peer_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_connect_times_out() {
    let connector = MockConnector::new().with_connect_delay(Duration::from_secs(30));
    let pool = P2pConnectionPool::with_connector(
        P2pConfig::new().connection_timeout(Duration::from_secs(2)),
        connector,
    );

    let err = pool.get_connection("node-1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    let stats = pool.stats().await;
    assert_eq!(stats.timeout_errors, 1);
    assert_eq!(stats.failed_connections, 1);
}

#[tokio::test(start_paused = true)]
async fn test_connect_retry_when_enabled() {
    let connector = MockConnector::new();
    connector.fail_connect(true);
    let pool = P2pConnectionPool::with_connector(
        P2pConfig::new()
            .retry_on_connect(true)
            .max_retries(2)
            .retry_backoff(Duration::from_millis(100), Duration::from_secs(1)),
        connector.clone(),
    );

    pool.get_connection("node-1").await.unwrap_err();
    assert_eq!(connector.connects(), 3);
    assert_eq!(pool.stats().await.failed_connections, 1);
}
