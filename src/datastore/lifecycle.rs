use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

/// Shared shutdown scope for pollers and listeners.
///
/// Cancelling it signals every task that observes the token; `shutdown` also
/// waits until every task spawned through the scope has returned.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    token: CancellationToken,
    tracker: TaskTracker,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(task)
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn task_count(&self) -> usize {
        self.tracker.len()
    }

    pub async fn shutdown(&self) {
        info!(tasks = self.tracker.len(), "shutting down");

        self.token.cancel();
        self.tracker.close();
        self.tracker.wait().await;

        debug!("all tasks stopped");
    }
}
