//! Cancellable handle for background loops (intervention poller, dashboard feed).

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{CoreError, Result};

/// Owns a spawned loop and the token that stops it.
///
/// Dropping the handle cancels the loop, so a recurring timer never
/// outlives whoever started it. Use [`RecurringTask::stop`] to also wait
/// for the loop to finish.
#[derive(Debug)]
pub struct RecurringTask {
    name: &'static str,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl RecurringTask {
    /// Spawn `body` on the current runtime, handing it the cancellation token.
    pub fn spawn<F, Fut>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(body(cancel.clone()));
        tracing::debug!(task = name, "recurring task started");
        Self {
            name,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel the loop and wait until it has exited.
    pub async fn stop(mut self) -> Result<()> {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .map_err(|e| CoreError::Custom(format!("{} task failed to join: {e}", self.name)))?;
        }
        Ok(())
    }
}

impl Drop for RecurringTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
