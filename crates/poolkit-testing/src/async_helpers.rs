//! Async testing utilities.
//!
//! Timeout wrappers so that a hung pool fails the test instead of the CI job.

use std::future::Future;
use std::time::Duration;

/// Default timeout for async operations in tests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a future with a timeout.
///
/// # Panics
///
/// Panics if the future does not complete within the timeout.
pub async fn with_timeout<T, F>(timeout: Duration, future: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(timeout, future)
        .await
        .expect("Test timed out")
}

/// Run a future with [`DEFAULT_TIMEOUT`].
pub async fn with_default_timeout<T, F>(future: F) -> T
where
    F: Future<Output = T>,
{
    with_timeout(DEFAULT_TIMEOUT, future).await
}

/// Wait for a condition to become true.
///
/// Polls the condition every `interval` until it returns true or `timeout`
/// elapses. Uses the Tokio clock, so it works with a paused runtime.
///
/// # Panics
///
/// Panics if the condition is not met within the timeout.
pub async fn wait_for<F>(timeout: Duration, interval: Duration, mut condition: F)
where
    F: FnMut() -> bool,
{
    let start = tokio::time::Instant::now();
    while !condition() {
        assert!(
            start.elapsed() <= timeout,
            "Condition not met within timeout"
        );
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_with_timeout_returns_value() {
        let value = with_timeout(Duration::from_secs(1), async { 42 }).await;
        assert_eq!(value, 42);
    }

    #[tokio::test(start_paused = true)]
    #[should_panic(expected = "Test timed out")]
    async fn test_with_timeout_panics() {
        with_timeout(Duration::from_millis(10), std::future::pending::<()>()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_polls_until_true() {
        let polls = AtomicUsize::new(0);
        wait_for(Duration::from_secs(1), Duration::from_millis(10), || {
            polls.fetch_add(1, Ordering::SeqCst) >= 3
        })
        .await;
        assert_eq!(polls.load(Ordering::SeqCst), 4);
    }
}
