//! # poolkit-pool
//!
//! A bounded, health-checked pool of homogeneous resources.
//!
//! Resources come from a caller-supplied [`ResourceFactory`]; the pool owns
//! sizing, the idle store, statistics and two background tasks:
//!
//! - **Health check** every `health_check_interval`: validates idle resources
//!   and closes the ones that fail.
//! - **Cleanup** every `idle_timeout / 2`: closes idle resources past
//!   `max_lifetime`, and idle resources past `idle_timeout` while more than
//!   `min_connections` remain.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use poolkit_core::{CancellationToken, PoolError};
//! use poolkit_pool::{PoolConfig, ResourceFactory, ResourcePool};
//!
//! struct Numbers;
//!
//! #[async_trait]
//! impl ResourceFactory<u32> for Numbers {
//!     async fn create(&self) -> Result<u32, PoolError> {
//!         Ok(7)
//!     }
//!     async fn validate(&self, _n: &u32) -> Result<(), PoolError> {
//!         Ok(())
//!     }
//!     async fn close(&self, _n: u32) -> Result<(), PoolError> {
//!         Ok(())
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let pool = ResourcePool::new(PoolConfig::new().min_connections(1).max_connections(4), Numbers);
//! let n = pool.get(&CancellationToken::new()).await?;
//! assert_eq!(*n, 7);
//! pool.put(n).await?;
//! assert_eq!(pool.stats().idle_connections, 1);
//! # Ok::<(), PoolError>(())
//! # });
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod factory;
pub mod pool;
pub mod resource;
pub mod stats;

pub use config::PoolConfig;
pub use factory::ResourceFactory;
pub use pool::ResourcePool;
pub use resource::PooledResource;
pub use stats::PoolStats;
