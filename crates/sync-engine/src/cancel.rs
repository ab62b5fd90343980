// crates/sync-engine/src/cancel.rs
//! Cooperative cancellation

use crate::error::{TaskError, TaskResult};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared cancellation flag for one task
///
/// Clones observe the same flag. Once cancelled a token stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Requests cancellation
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Completes once the token is cancelled
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so waiting cannot fail.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }

    /// Fails with `TaskError::Cancelled` once cancellation was requested
    pub fn check(&self) -> TaskResult<()> {
        if self.is_cancelled() {
            Err(TaskError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `future` unless `token` is cancelled first
///
/// The future is dropped as soon as cancellation is observed, which aborts
/// any network I/O it was waiting on.
pub async fn run_until_cancelled<F>(token: &CancelToken, future: F) -> TaskResult<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(TaskError::Cancelled),
        output = future => Ok(output),
    }
}
