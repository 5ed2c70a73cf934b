//! The resource factory capability supplied by pool users.

use std::sync::Arc;

use async_trait::async_trait;
use poolkit_core::PoolError;

/// Creates, validates and closes the resources held by a pool.
///
/// The pool never constructs resources itself. Every resource it hands out
/// came from [`create`](ResourceFactory::create), and every resource it drops
/// is passed to [`close`](ResourceFactory::close) first.
#[async_trait]
pub trait ResourceFactory<R>: Send + Sync + 'static
where
    R: Send + Sync + 'static,
{
    /// Create a new resource.
    async fn create(&self) -> Result<R, PoolError>;

    /// Check that a resource is still usable.
    async fn validate(&self, resource: &R) -> Result<(), PoolError>;

    /// Release a resource. Errors are logged by the pool and otherwise ignored.
    async fn close(&self, resource: R) -> Result<(), PoolError>;
}

#[async_trait]
impl<R, F> ResourceFactory<R> for Arc<F>
where
    R: Send + Sync + 'static,
    F: ResourceFactory<R> + ?Sized,
{
    async fn create(&self) -> Result<R, PoolError> {
        (**self).create().await
    }

    async fn validate(&self, resource: &R) -> Result<(), PoolError> {
        (**self).validate(resource).await
    }

    async fn close(&self, resource: R) -> Result<(), PoolError> {
        (**self).close(resource).await
    }
}
