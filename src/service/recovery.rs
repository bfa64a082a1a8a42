//! Re-enqueueing of tasks left unfinished by a previous run.

use crate::error::Result;
use crate::types::{Event, Task};
use tokio::sync::mpsc::error::TrySendError;

use super::TaskService;

impl TaskService {
    /// Offer every pending or running task to the work queue.
    ///
    /// Tasks are offered oldest first. A task that does not fit is handed to a deferred
    /// unit that waits for queue space (or shutdown), so each recovered task is enqueued
    /// at most once and construction never blocks.
    ///
    /// Returns the number of recovered tasks.
    pub(crate) async fn resume_pending_tasks(&self) -> Result<usize> {
        let mut unfinished: Vec<Task> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|task| task.status.is_resumable())
            .collect();
        unfinished.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let total = unfinished.len();
        let mut deferred = 0usize;

        for task in unfinished {
            let id = task.id.clone();
            match self.queue.tx.try_send(task) {
                Ok(()) => {
                    tracing::debug!(task_id = %id, "recovered task queued");
                    self.emit_event(Event::TaskQueued { id });
                }
                Err(TrySendError::Full(task)) => {
                    deferred += 1;
                    self.defer_enqueue(task);
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::warn!(task_id = %id, "task queue is closed, recovered task not queued");
                }
            }
        }

        if total > 0 {
            tracing::info!(
                recovered = total,
                deferred,
                "Restored unfinished tasks from previous session"
            );
        }

        Ok(total)
    }

    /// Wait for queue space in the background, giving up on shutdown
    fn defer_enqueue(&self, task: Task) {
        let service = self.clone();
        self.tracker.spawn(async move {
            let id = task.id.clone();
            tokio::select! {
                biased;
                _ = service.cancel.cancelled() => {
                    tracing::debug!(task_id = %id, "deferred enqueue abandoned on shutdown");
                }
                sent = service.queue.tx.send(task) => match sent {
                    Ok(()) => {
                        tracing::debug!(task_id = %id, "deferred task queued");
                        service.emit_event(Event::TaskQueued { id });
                    }
                    Err(_) => {
                        tracing::warn!(task_id = %id, "task queue closed before deferred enqueue");
                    }
                },
            }
        });
    }
}
