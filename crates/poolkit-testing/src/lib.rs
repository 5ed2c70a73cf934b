//! Testing utilities for poolkit.
//!
//! This crate provides mocks and assertions for exercising pools without
//! real network resources:
//!
//! - [`MockFactory`]: a [`ResourceFactory`](poolkit_pool::ResourceFactory)
//!   with switchable failures, creation delays and live-resource tracking
//! - [`MockConnector`]: a [`PeerConnector`](poolkit_p2p::PeerConnector) with
//!   switchable connect, send and probe failures
//! - Assertions over pool statistics
//!
//! # Example
//!
//! ```rust
//! use poolkit_core::CancellationToken;
//! use poolkit_pool::{PoolConfig, ResourcePool};
//! use poolkit_testing::{MockFactory, assert_pool_bound};
//!
//! # tokio_test::block_on(async {
//! let factory = MockFactory::new();
//! let pool = ResourcePool::new(PoolConfig::new().max_connections(2), factory.clone());
//!
//! let a = pool.get(&CancellationToken::new()).await.unwrap();
//! assert_eq!(factory.created(), 1);
//! pool.put(a).await.unwrap();
//!
//! assert_pool_bound(&pool.stats(), 2);
//! # });
//! ```

#![deny(missing_docs)]

pub mod assertions;
pub mod async_helpers;
pub mod mock;

pub use assertions::{assert_counters_consistent, assert_pool_bound};
pub use async_helpers::{with_default_timeout, with_timeout};
pub use mock::{MockConnector, MockFactory, MockResource};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::assertions::{assert_counters_consistent, assert_pool_bound};
    pub use crate::async_helpers::{wait_for, with_default_timeout, with_timeout};
    pub use crate::mock::{MockConnector, MockFactory, MockResource};
}
