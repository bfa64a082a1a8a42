//! Task creation and lookup.

use crate::error::{Error, Result};
use crate::types::{Event, Task, TaskId};
use tokio::sync::mpsc::error::TrySendError;

use super::TaskService;

impl TaskService {
    /// Create a task for `urls`, persist it and offer it to the work queue.
    ///
    /// The enqueue never waits: if the queue is full the task stays `Pending` in the
    /// store and is picked up by recovery on the next start. The created task is
    /// returned either way. URLs are not validated here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CannotSaveTask`] if the task could not be persisted; in that
    /// case nothing is enqueued.
    pub async fn create_task<I, S>(&self, urls: I) -> Result<Task>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let task = Task::new(urls);

        if let Err(e) = self.store.save(&task).await {
            tracing::error!(task_id = %task.id, error = %e, "failed to save task");
            return Err(Error::CannotSaveTask(e));
        }
        self.emit_event(Event::TaskCreated {
            id: task.id.clone(),
        });

        match self.queue.tx.try_send(task.clone()) {
            Ok(()) => {
                tracing::debug!(task_id = %task.id, files = task.files.len(), "task queued");
                self.emit_event(Event::TaskQueued {
                    id: task.id.clone(),
                });
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    task_id = %task.id,
                    "task queue is full, task stays pending until next restart"
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(task_id = %task.id, "task queue is closed, task stays pending");
            }
        }

        Ok(task)
    }

    /// Look up a task by ID
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no task has this ID.
    pub async fn get_task(&self, id: &TaskId) -> Result<Task> {
        Ok(self.store.get(id).await?)
    }

    /// All tasks, in no particular order
    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.store.list().await?)
    }
}
