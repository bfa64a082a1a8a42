//! Task orchestration split into focused submodules.
//!
//! The `TaskService` struct and its methods are organized by concern:
//! - [`tasks`] - Task creation and lookup
//! - [`worker`] - Worker loop and per-task processing
//! - [`recovery`] - Re-enqueueing unfinished tasks on startup
//! - [`lifecycle`] - Shutdown coordination

mod lifecycle;
mod recovery;
mod tasks;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::{Config, DownloadConfig};
use crate::error::{Error, Result};
use crate::fetcher::{FileFetcher, HttpFetcher};
use crate::store::{JsonTaskStore, TaskStore};
use crate::types::{Event, Task};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Buffer size of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Sizing of the worker pool and work queue
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskServiceOptions {
    /// Number of workers draining the queue
    pub workers: usize,
    /// Capacity of the bounded work queue
    pub queue_capacity: usize,
}

impl Default for TaskServiceOptions {
    fn default() -> Self {
        Self::from(&DownloadConfig::default())
    }
}

impl From<&DownloadConfig> for TaskServiceOptions {
    fn from(config: &DownloadConfig) -> Self {
        Self {
            workers: config.workers_count,
            queue_capacity: config.queue_capacity,
        }
    }
}

/// Bounded FIFO queue shared by all workers
#[derive(Clone)]
pub(crate) struct WorkQueue {
    /// Producer side, used by task creation and recovery
    pub(crate) tx: mpsc::Sender<Task>,
    /// Consumer side; workers take turns holding the lock while waiting for a task
    pub(crate) rx: Arc<Mutex<mpsc::Receiver<Task>>>,
    pub(crate) capacity: usize,
}

/// Task lifecycle engine (cloneable - all fields are Arc-wrapped or handles)
#[derive(Clone)]
pub struct TaskService {
    /// Durable task storage
    pub(crate) store: Arc<dyn TaskStore>,
    /// Per-URL downloader used by workers
    pub(crate) fetcher: Arc<dyn FileFetcher>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Work queue between producers and workers
    pub(crate) queue: WorkQueue,
    /// Process-wide shutdown signal, observed by workers, fetches and deferred enqueues
    pub(crate) cancel: CancellationToken,
    /// Tracks worker loops and deferred enqueue units so shutdown can wait for them
    pub(crate) tracker: TaskTracker,
    pub(crate) worker_count: usize,
    /// Set once the shutdown event has been emitted
    pub(crate) shutdown_emitted: Arc<AtomicBool>,
}

impl TaskService {
    /// Create the service, start its workers and re-enqueue unfinished tasks.
    ///
    /// Workers are running before recovery starts, so recovered tasks begin processing
    /// immediately. Recovery never blocks on a full queue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either size in `options` is zero, or a store error if
    /// the stored tasks cannot be listed.
    pub async fn new(
        store: Arc<dyn TaskStore>,
        fetcher: Arc<dyn FileFetcher>,
        options: TaskServiceOptions,
    ) -> Result<Self> {
        if options.workers == 0 {
            return Err(Error::Config {
                message: "worker count must be at least 1".into(),
                key: Some("workers_count".into()),
            });
        }
        if options.queue_capacity == 0 {
            return Err(Error::Config {
                message: "queue capacity must be at least 1".into(),
                key: Some("queue_capacity".into()),
            });
        }

        let (tx, rx) = mpsc::channel(options.queue_capacity);
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let service = Self {
            store,
            fetcher,
            event_tx,
            queue: WorkQueue {
                tx,
                rx: Arc::new(Mutex::new(rx)),
                capacity: options.queue_capacity,
            },
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
            worker_count: options.workers,
            shutdown_emitted: Arc::new(AtomicBool::new(false)),
        };

        service.start_workers();
        if let Err(e) = service.resume_pending_tasks().await {
            service.shutdown().await;
            return Err(e);
        }

        tracing::info!(
            workers = options.workers,
            queue_capacity = options.queue_capacity,
            "Task service started"
        );

        Ok(service)
    }

    /// Build the production service from configuration.
    ///
    /// Creates the download directory, opens the snapshot store and wires an
    /// [`HttpFetcher`] rooted at the download directory.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let download_dir = &config.download.download_dir;
        tokio::fs::create_dir_all(download_dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create download directory '{}': {}",
                    download_dir.display(),
                    e
                ),
            ))
        })?;

        let store = JsonTaskStore::open(&config.persistence.storage_path).await?;
        let fetcher = HttpFetcher::new(download_dir);

        Self::new(
            Arc::new(store),
            Arc::new(fetcher),
            TaskServiceOptions::from(&config.download),
        )
        .await
    }

    /// Subscribe to task events
    ///
    /// Each subscriber receives all events independently. A subscriber that falls more
    /// than 1000 events behind receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Capacity of the work queue
    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity
    }

    /// Number of workers in the pool
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Emit an event to all subscribers; dropped if nobody is listening
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
