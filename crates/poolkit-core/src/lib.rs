//! # poolkit-core
//!
//! Shared building blocks for the poolkit connection pools.
//!
//! This crate provides the pieces every pool in the workspace is assembled from:
//!
//! - **Error handling**: the unified [`PoolError`] type with a coarse [`ErrorKind`]
//! - **Statistics**: [`StatsCell`], a lock-guarded record with atomic snapshots
//! - **Background tasks**: [`BackgroundTasks`], periodic maintenance with
//!   cooperative shutdown that waits for every task to exit
//! - **Retry**: [`RetryPolicy`] and [`ExponentialBackoff`] for resource creation
//! - **Serde helpers**: [`duration_serde`] encodes durations as milliseconds
//!
//! Cancellation is expressed with [`CancellationToken`], re-exported from
//! `tokio-util` so callers do not need a direct dependency.
//!
//! # Example
//!
//! ```rust
//! use poolkit_core::{PoolError, RetryPolicy};
//!
//! # tokio_test::block_on(async {
//! let policy = RetryPolicy::disabled();
//! let value = policy
//!     .run("create", || async { Ok::<_, PoolError>(42) })
//!     .await
//!     .unwrap();
//! assert_eq!(value, 42);
//! # });
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod background;
pub mod duration_serde;
pub mod error;
pub mod retry;
pub mod stats;

pub use background::BackgroundTasks;
pub use error::{BoxError, ErrorKind, HttpErrorKind, PoolError};
pub use retry::{ExponentialBackoff, RetryPolicy};
pub use stats::StatsCell;
pub use tokio_util::sync::CancellationToken;

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::background::BackgroundTasks;
    pub use crate::error::{ErrorKind, HttpErrorKind, PoolError};
    pub use crate::retry::{ExponentialBackoff, RetryPolicy};
    pub use crate::stats::StatsCell;
    pub use crate::Result;
    pub use tokio_util::sync::CancellationToken;
}
