//! Background maintenance task supervision.
//!
//! Pools run their health-check and cleanup passes as independent periodic
//! tasks. [`BackgroundTasks`] owns the shared shutdown signal and the task
//! handles, so that `shutdown()` can cancel every task and wait until each one
//! has observably exited before the pool starts closing resources.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Smallest period accepted for a periodic task.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A set of periodic tasks sharing one cooperative shutdown signal.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    shutdown: CancellationToken,
    handles: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
}

impl BackgroundTasks {
    /// Create an empty task set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The shutdown signal shared by every task in the set.
    #[must_use]
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Whether `shutdown()` has been requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Number of tasks that have been spawned and not yet joined.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no task is currently registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn a task that runs `tick` every `period` until shutdown.
    ///
    /// The first tick fires one full period after spawning. A tick that is
    /// still running when shutdown is requested is allowed to finish.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_periodic<F, Fut>(&self, name: &'static str, period: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let period = period.max(MIN_PERIOD);
        let shutdown = self.shutdown.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        trace!(task = name, "running periodic task");
                        tick().await;
                    }
                }
            }

            debug!(task = name, "periodic task exited");
        });

        self.handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((name, handle));
    }

    /// Signal shutdown and wait for every task to exit.
    ///
    /// Calling this more than once is harmless; later calls find no handles
    /// left to join.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let handles = std::mem::take(&mut *self.handles.lock().unwrap_or_else(|e| e.into_inner()));
        for (name, handle) in handles {
            if let Err(e) = handle.await {
                warn!(task = name, error = %e, "background task ended abnormally");
            }
        }
    }
}
