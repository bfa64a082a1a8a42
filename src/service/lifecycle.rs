//! Shutdown coordination.

use crate::types::Event;
use std::sync::atomic::Ordering;

use super::TaskService;

impl TaskService {
    /// Gracefully shut down the service
    ///
    /// 1. Cancels the shared token, aborting in-flight downloads and queue waits
    /// 2. Waits for every worker to persist its current task and exit
    /// 3. Waits for pending deferred enqueues to give up
    ///
    /// Tasks still in the queue stay `Pending` or `Running` in the store and are
    /// recovered on the next start. Calling this more than once is harmless.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating graceful shutdown");

        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;

        if !self.shutdown_emitted.swap(true, Ordering::SeqCst) {
            self.emit_event(Event::Shutdown);
            tracing::info!("Graceful shutdown complete");
        }
    }

    /// Whether shutdown has been requested
    pub fn is_shutting_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once shutdown has been requested, without waiting for workers
    pub fn shutdown_requested(&self) -> impl std::future::Future<Output = ()> + Send + use<> {
        self.cancel.clone().cancelled_owned()
    }
}
