//! End-to-end tests for the HTTP connection pool against a local axum server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, http::StatusCode, routing::get};
use poolkit::http::Method;
use poolkit::prelude::*;
use poolkit_testing::with_timeout;
use tokio::net::TcpListener;
use tokio::time::Instant;

/// Start a test server and return its address.
async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/ok", get(|| async { "ok" }))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route(
            "/pause",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                "done"
            }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing is listening on.
async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

// =============================================================================
// Request accounting
// =============================================================================

#[tokio::test]
async fn test_successful_requests_are_counted() {
    let addr = spawn_server().await;
    let pool = HttpConnectionPool::new(HttpPoolConfig::default()).unwrap();

    for _ in 0..3 {
        let response = pool.get(&format!("http://{addr}/ok")).await.unwrap();
        assert_eq!(response.text().await.unwrap(), "ok");
    }

    let stats = pool.stats();
    assert_eq!(stats.total_requests, 3);
    assert_eq!(stats.successful_requests, 3);
    assert_eq!(stats.failed_requests, 0);
    assert_eq!(stats.clients_created, 1);
    assert!(stats.last_activity.is_some());
}

#[tokio::test]
async fn test_error_status_is_still_a_successful_round_trip() {
    let addr = spawn_server().await;
    let pool = HttpConnectionPool::new(HttpPoolConfig::default()).unwrap();

    let response = pool.get(&format!("http://{addr}/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(pool.stats().successful_requests, 1);
}

#[tokio::test]
async fn test_request_builder_goes_through_execute() {
    let addr = spawn_server().await;
    let pool = HttpConnectionPool::new(HttpPoolConfig::default()).unwrap();

    let request = pool
        .request(Method::GET, &format!("http://{addr}/ok"))
        .unwrap()
        .header("x-node", "node-1")
        .build()
        .unwrap();
    let response = pool.execute(request).await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(pool.stats().total_requests, 1);
}

#[tokio::test]
async fn test_timeout_is_categorized() {
    let addr = spawn_server().await;
    let pool = HttpConnectionPool::new(
        HttpPoolConfig::new().request_timeout(Duration::from_millis(200)),
    )
    .unwrap();

    let err = pool.get(&format!("http://{addr}/slow")).await.unwrap_err();
    assert!(matches!(
        err,
        PoolError::Http {
            kind: HttpErrorKind::Timeout,
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Timeout);

    let stats = pool.stats();
    assert_eq!(stats.failed_requests, 1);
    assert_eq!(stats.timeout_errors, 1);
    assert_eq!(stats.connection_errors, 0);
}

#[tokio::test]
async fn test_connection_refused_is_categorized() {
    let addr = closed_addr().await;
    let pool = HttpConnectionPool::new(
        HttpPoolConfig::new().dial_timeout(Duration::from_secs(2)),
    )
    .unwrap();

    let err = pool.get(&format!("http://{addr}/ok")).await.unwrap_err();
    assert!(matches!(
        err,
        PoolError::Http {
            kind: HttpErrorKind::Connection,
            ..
        }
    ));
    assert!(err.to_string().contains(&addr.to_string()));
    assert!(std::error::Error::source(&err).is_some());

    let stats = pool.stats();
    assert_eq!(stats.failed_requests, 1);
    assert_eq!(stats.connection_errors, 1);
    assert_eq!(stats.timeout_errors, 0);
}

#[tokio::test]
async fn test_unresolvable_host_counts_as_dns_error() {
    let pool = HttpConnectionPool::new(
        HttpPoolConfig::new().dial_timeout(Duration::from_secs(5)),
    )
    .unwrap();

    let err = pool.get("http://poolkit-node.invalid/ok").await.unwrap_err();
    assert!(matches!(
        err,
        PoolError::Http {
            kind: HttpErrorKind::Dns,
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Connection);

    let stats = pool.stats();
    assert_eq!(stats.failed_requests, 1);
    assert_eq!(stats.dns_errors, 1);
    assert_eq!(stats.connection_errors, 0);
    assert_eq!(stats.timeout_errors, 0);
}

#[tokio::test]
async fn test_response_time_reports_latest_request() {
    let addr = spawn_server().await;
    let pool = HttpConnectionPool::new(HttpPoolConfig::default()).unwrap();

    pool.get(&format!("http://{addr}/pause")).await.unwrap();
    let slow = pool.stats().average_response_time;
    assert!(slow >= Duration::from_millis(300));

    pool.get(&format!("http://{addr}/ok")).await.unwrap();
    let fast = pool.stats().average_response_time;
    // a running mean of the two samples would still be at least 150ms
    assert!(fast < Duration::from_millis(150), "got {fast:?}");
    assert!(fast < slow);
}

// =============================================================================
// Per-host clients
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_client() {
    let addr = spawn_server().await;
    let pool = Arc::new(HttpConnectionPool::new(HttpPoolConfig::default()).unwrap());

    let requests: Vec<_> = (0..16)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let url = format!("http://{addr}/ok");
            tokio::spawn(async move { pool.get(&url).await.map(|r| r.status()) })
        })
        .collect();

    for result in futures::future::join_all(requests).await {
        assert!(result.unwrap().unwrap().is_success());
    }

    let stats = pool.stats();
    assert_eq!(stats.clients_created, 1);
    assert_eq!(stats.active_clients, 1);
    assert_eq!(stats.successful_requests, 16);
    assert_eq!(pool.client_count(), 1);
}

#[tokio::test]
async fn test_per_host_limit_serializes_requests() {
    let addr = spawn_server().await;
    let pool = Arc::new(
        HttpConnectionPool::new(HttpPoolConfig::new().max_conns_per_host(1)).unwrap(),
    );
    let url = format!("http://{addr}/pause");

    let started = Instant::now();
    let (a, b) = tokio::join!(pool.get(&url), pool.get(&url));
    a.unwrap();
    b.unwrap();
    assert!(
        started.elapsed() >= Duration::from_millis(600),
        "two requests through one slot must not overlap"
    );

    let client = pool.get_client(&addr.to_string());
    assert_eq!(client.available_permits(), Some(1));
}

#[tokio::test]
async fn test_close_idle_connections_keeps_pool_usable() {
    let addr = spawn_server().await;
    let pool = HttpConnectionPool::new(HttpPoolConfig::default()).unwrap();
    let url = format!("http://{addr}/ok");

    pool.get(&url).await.unwrap();
    pool.close_idle_connections().unwrap();
    assert_eq!(pool.client_count(), 0);

    pool.get(&url).await.unwrap();
    let stats = pool.stats();
    assert_eq!(stats.clients_created, 2);
    assert_eq!(stats.successful_requests, 2);
}

// =============================================================================
// Registry
// =============================================================================

#[tokio::test]
async fn test_registry_keeps_named_pools_apart() {
    let addr = spawn_server().await;
    let registry = HttpClientPool::new(HttpPoolConfig::default());

    let inference = registry
        .get_or_create(
            "inference",
            Some(HttpPoolConfig::new().request_timeout(Duration::from_secs(120))),
        )
        .unwrap();
    let control = registry.get_or_create("control", None).unwrap();
    assert!(Arc::ptr_eq(
        &inference,
        &registry.get_or_create("inference", None).unwrap()
    ));
    assert_eq!(inference.config().request_timeout, Duration::from_secs(120));

    with_timeout(Duration::from_secs(5), inference.get(&format!("http://{addr}/ok")))
        .await
        .unwrap();
    control.get_client("node-2:11434");

    let stats = registry.stats();
    assert_eq!(
        stats.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["control", "inference"]
    );
    assert_eq!(stats["inference"].total_requests, 1);
    assert_eq!(stats["control"].total_requests, 0);
    assert_eq!(stats["control"].clients_created, 1);

    registry.close_all().unwrap();
    assert_eq!(inference.client_count(), 0);
}
