//! Worker pool: each worker drains the shared queue and drives tasks file by file.

use crate::types::{Event, FileStatus, Task, TaskStatus};

use super::TaskService;

impl TaskService {
    /// Spawn the fixed worker pool on the service's tracker
    pub(crate) fn start_workers(&self) {
        for worker_id in 0..self.worker_count {
            let service = self.clone();
            self.tracker.spawn(async move {
                service.run_worker(worker_id).await;
            });
        }
    }

    /// Take tasks off the queue until shutdown.
    ///
    /// Cancellation is checked first at every wait, so a worker never starts a new task
    /// once shutdown has begun. A task already in progress is always finished.
    async fn run_worker(self, worker_id: usize) {
        tracing::debug!(worker_id, "worker started");

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                task = async {
                    let mut rx = self.queue.rx.lock().await;
                    rx.recv().await
                } => task,
            };

            let Some(task) = next else { break };
            self.process_task(task).await;
        }

        tracing::debug!(worker_id, "worker stopped");
    }

    /// Drive one task through every file that is not yet done.
    ///
    /// Every state change is written back to the store; write failures are logged and
    /// processing continues. A fetch aborted by shutdown marks the file failed like any
    /// other error, and the remaining files fail fast on the cancelled token.
    pub(crate) async fn process_task(&self, mut task: Task) {
        tracing::info!(task_id = %task.id, files = task.files.len(), "processing task");

        task.status = TaskStatus::Running;
        self.persist_progress(&task).await;
        self.emit_event(Event::TaskStarted {
            id: task.id.clone(),
        });

        for index in 0..task.files.len() {
            if task.files[index].status == FileStatus::Done {
                continue;
            }

            let url = task.files[index].url.clone();
            task.files[index].mark_running();
            self.persist_progress(&task).await;
            tracing::debug!(task_id = %task.id, index, url = %url, "file started");
            self.emit_event(Event::FileStarted {
                id: task.id.clone(),
                index,
                url: url.clone(),
            });

            match self.fetcher.fetch(&url, &task.id, &self.cancel).await {
                Ok(path) => {
                    tracing::debug!(task_id = %task.id, index, path = %path.display(), "file done");
                    self.emit_event(Event::FileCompleted {
                        id: task.id.clone(),
                        index,
                        path: path.clone(),
                    });
                    task.files[index].mark_done(path);
                }
                Err(e) => {
                    let error = e.to_string();
                    tracing::debug!(task_id = %task.id, index, error = %error, "file failed");
                    self.emit_event(Event::FileFailed {
                        id: task.id.clone(),
                        index,
                        error: error.clone(),
                    });
                    task.files[index].mark_failed(error);
                }
            }
            self.persist_progress(&task).await;
        }

        task.refresh_status();
        self.persist_progress(&task).await;

        tracing::info!(task_id = %task.id, status = ?task.status, "task processed");
        self.emit_event(Event::TaskFinished {
            id: task.id.clone(),
            status: task.status,
        });
    }

    async fn persist_progress(&self, task: &Task) {
        if let Err(e) = self.store.update(task).await {
            tracing::warn!(task_id = %task.id, error = %e, "failed to persist task progress");
        }
    }
}
