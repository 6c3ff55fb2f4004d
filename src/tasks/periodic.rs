//! Periodic Task Handle
//!
//! Spawns a tokio task that runs a closure on every interval tick until it is
//! told to stop through a one-shot channel.

use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{CacheError, Result};

// == Periodic Task ==
/// Owner handle of a running periodic task.
///
/// `stop` consumes the handle, so the stop signal can be sent only once.
#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawns `tick` every `interval` on the current tokio runtime.
    ///
    /// The first run happens one full interval after spawning. Fails with
    /// `Internal` when called outside a runtime.
    pub fn spawn<F, Fut>(name: &'static str, interval: Duration, mut tick: F) -> Result<Self>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            CacheError::Internal(format!("{} task requires a Tokio runtime", name))
        })?;
        if interval.is_zero() {
            return Err(CacheError::Internal(format!(
                "{} task requires a positive interval",
                name
            )));
        }

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // Skip the first immediate tick - wait a full interval first
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => tick().await,
                    // a dropped sender stops the task as well
                    _ = &mut stop_rx => break,
                }
            }
        });

        Ok(Self {
            name,
            stop_tx,
            handle,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    // == Stop ==
    /// Signals the task and waits for its current tick to finish.
    pub async fn stop(self) {
        // the task may already be gone, nothing left to signal then
        let _ = self.stop_tx.send(());
        if let Err(e) = self.handle.await {
            tracing::warn!("{} task ended abnormally: {}", self.name, e);
        }
    }
}
