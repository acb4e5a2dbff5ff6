use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::FleetError;

/// Handle of the remote process behind a worker.
///
/// Implemented by the runtime's communication layer.
pub trait WorkerNode: Send + Sync {
    fn disable_execution(&self);

    fn retrieve_tracing_and_debug_data(&self);

    /// Asks the node to stop. The node calls [`ShutdownListener::notify_end`] (or
    /// [`ShutdownListener::notify_failure`]) exactly once when it is done.
    fn stop(&self, listener: ShutdownListener);
}

/// Countdown barrier shared by all nodes stopped in one shutdown.
#[derive(Clone)]
pub struct ShutdownListener {
    semaphore: Arc<Semaphore>,
    reported: Arc<AtomicUsize>,
}

impl Default for ShutdownListener {
    fn default() -> Self {
        ShutdownListener {
            semaphore: Arc::new(Semaphore::new(0)),
            reported: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ShutdownListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify_end(&self) {
        self.reported.fetch_add(1, Ordering::SeqCst);
        self.semaphore.add_permits(1);
    }

    pub fn notify_failure(&self, error: &anyhow::Error) {
        log::error!("Worker node failed to stop cleanly: {error:#}");
        self.notify_end();
    }

    /// Waits until `count` nodes have reported back.
    pub async fn wait_for(&self, count: usize, timeout: Option<Duration>) -> crate::Result<()> {
        if count == 0 {
            return Ok(());
        }
        let acquire = self.semaphore.acquire_many(count as u32);
        let permit = match timeout {
            Some(timeout) => match tokio::time::timeout(timeout, acquire).await {
                Ok(permit) => permit,
                Err(_) => {
                    let pending = count.saturating_sub(self.reported.load(Ordering::SeqCst));
                    return Err(FleetError::ShutdownTimeout(pending));
                }
            },
            None => acquire.await,
        };
        permit
            .map_err(|e| FleetError::GenericError(format!("Shutdown barrier closed: {e}")))?
            .forget();
        Ok(())
    }
}
