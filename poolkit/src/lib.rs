//! # poolkit
//!
//! Connection pooling for nodes of a distributed inference cluster.
//!
//! Three independent pools share one error type, one statistics model and one
//! background-task supervisor:
//!
//! - [`ResourcePool`]: a bounded, health-checked pool of homogeneous
//!   resources produced by a caller-supplied [`ResourceFactory`]. Callers
//!   check a resource out with `get` and hand it back with `put`.
//! - [`HttpConnectionPool`]: one long-lived HTTP client per destination host
//!   over a shared keep-alive transport, and [`HttpClientPool`], a registry of
//!   named HTTP pools.
//! - [`P2pConnectionPool`]: one connection record per peer, aged out by
//!   idle time and lifetime.
//!
//! # Quick Start
//!
//! ```rust
//! use poolkit::prelude::*;
//!
//! let config = PoolkitConfig::from_json_str(r#"{
//!     "resource": { "min_connections": 2, "max_connections": 8 },
//!     "http": { "max_conns_per_host": 4 },
//!     "p2p": { "idle_timeout": 60000 }
//! }"#)?;
//!
//! assert_eq!(config.resource.max_connections, 8);
//! assert_eq!(config.http.max_conns_per_host, 4);
//! assert_eq!(config.p2p.idle_timeout, std::time::Duration::from_secs(60));
//!
//! let http = HttpConnectionPool::new(config.http.clone())?;
//! let p2p = P2pConnectionPool::new(config.p2p.clone());
//! # drop((http, p2p));
//! # Ok::<(), PoolError>(())
//! ```
//!
//! # Feature Flags
//!
//! - `tracing-subscriber`: enables [`telemetry::init_tracing`], which
//!   installs a formatted subscriber filtered by `RUST_LOG`.

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod prelude;
#[cfg(feature = "tracing-subscriber")]
pub mod telemetry;

#[cfg(feature = "tracing-subscriber")]
pub use telemetry::{LogFormat, init_tracing};

pub use config::PoolkitConfig;

pub use poolkit_core::{
    BackgroundTasks, CancellationToken, ErrorKind, ExponentialBackoff, HttpErrorKind, PoolError,
    Result, RetryPolicy, StatsCell,
};
pub use poolkit_http::{HostClient, HttpClientPool, HttpConnectionPool, HttpPoolConfig, HttpPoolStats};
pub use poolkit_p2p::{
    P2pConfig, P2pConnectionPool, P2pStats, PeerConnection, PeerConnectionInfo, PeerConnector,
    StaticAddressConnector,
};
pub use poolkit_pool::{PoolConfig, PoolStats, PooledResource, ResourceFactory, ResourcePool};

/// HTTP pool re-exports.
pub mod http {
    //! Per-host HTTP client pooling.
    pub use poolkit_http::*;
}

/// P2P pool re-exports.
pub mod p2p {
    //! Per-peer connection records.
    pub use poolkit_p2p::*;
}
