//! # poolkit-http
//!
//! One long-lived HTTP client per destination host, all sharing a single
//! keep-alive `reqwest` transport.
//!
//! - [`HttpConnectionPool`] resolves a [`HostClient`] per host with
//!   double-checked locking and counts every request it executes.
//! - [`HttpClientPool`] keeps independently configured pools by name.
//!
//! Requests are never returned to the pool: clients are shared and stay
//! open until the pool is closed or the cleanup task evicts them.
//!
//! # Example
//!
//! ```rust
//! use poolkit_http::{HttpConnectionPool, HttpPoolConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let pool = HttpConnectionPool::new(
//!     HttpPoolConfig::new()
//!         .request_timeout(Duration::from_secs(30))
//!         .max_conns_per_host(8),
//! )?;
//!
//! let a = pool.get_client("node-1:11434");
//! let b = pool.get_client("node-1:11434");
//! assert!(Arc::ptr_eq(&a, &b));
//! assert_eq!(pool.stats().clients_created, 1);
//! # Ok::<(), poolkit_core::PoolError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod pool;
pub mod registry;
pub mod stats;

pub use client::HostClient;
pub use config::HttpPoolConfig;
pub use pool::HttpConnectionPool;
pub use registry::HttpClientPool;
pub use stats::HttpPoolStats;

pub use reqwest::{Method, Request, RequestBuilder, Response};
