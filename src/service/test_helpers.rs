//! Shared test doubles for exercising TaskService without disk or network.

use crate::error::{FetchError, StoreError};
use crate::fetcher::FileFetcher;
use crate::service::{TaskService, TaskServiceOptions};
use crate::store::TaskStore;
use crate::types::{Task, TaskId, TaskStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// In-memory [`TaskStore`] that records every persisted version of each task
#[derive(Default)]
pub(crate) struct MemoryStore {
    tasks: std::sync::Mutex<HashMap<TaskId, Task>>,
    history: std::sync::Mutex<Vec<Task>>,
    fail_saves: AtomicBool,
    fail_updates: AtomicBool,
}

impl MemoryStore {
    pub(crate) fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let store = Self::default();
        {
            let mut map = store.tasks.lock().unwrap();
            for task in tasks {
                map.insert(task.id.clone(), task);
            }
        }
        store
    }

    pub(crate) fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    pub(crate) fn snapshot(&self, id: &TaskId) -> Option<Task> {
        self.tasks.lock().unwrap().get(id).cloned()
    }

    pub(crate) fn all(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().values().cloned().collect()
    }

    /// Every version of `id` written through `update`, oldest first
    pub(crate) fn updates_for(&self, id: &TaskId) -> Vec<Task> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|t| &t.id == id)
            .cloned()
            .collect()
    }
}

fn injected_failure() -> StoreError {
    StoreError::Persist(std::io::Error::other("injected write failure"))
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn save(&self, task: &Task) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }
        self.tasks
            .lock()
            .unwrap()
            .insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn get(&self, id: &TaskId) -> Result<Task, StoreError> {
        self.snapshot(id).ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.all())
    }

    async fn update(&self, task: &Task) -> Result<(), StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.get_mut(&task.id) {
            Some(slot) => *slot = task.clone(),
            None => return Err(StoreError::NotFound { id: task.id.to_string() }),
        }
        self.history.lock().unwrap().push(task.clone());
        Ok(())
    }
}

/// What the scripted fetcher does for a URL
#[derive(Clone, Debug)]
pub(crate) enum Outcome {
    /// Succeed immediately
    Ok,
    /// Fail with this HTTP status
    Status(u16),
    /// Hang until the cancellation token fires
    Hang,
}

/// [`FileFetcher`] whose behavior is scripted per URL; unknown URLs succeed.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    outcomes: HashMap<String, Outcome>,
    calls: std::sync::Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(mut self, url: &str, outcome: Outcome) -> Self {
        self.outcomes.insert(url.to_string(), outcome);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        url: &str,
        task_id: &TaskId,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled { url: url.to_string() });
        }

        match self.outcomes.get(url).cloned().unwrap_or(Outcome::Ok) {
            Outcome::Ok => {
                let name = url.rsplit('/').next().unwrap_or("file");
                Ok(PathBuf::from("downloads").join(task_id.as_str()).join(name))
            }
            Outcome::Status(status) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
            Outcome::Hang => {
                cancel.cancelled().await;
                Err(FetchError::Cancelled { url: url.to_string() })
            }
        }
    }
}

/// Build a service over the given doubles
pub(crate) async fn create_test_service(
    store: Arc<MemoryStore>,
    fetcher: Arc<ScriptedFetcher>,
    workers: usize,
    queue_capacity: usize,
) -> TaskService {
    TaskService::new(
        store,
        fetcher,
        TaskServiceOptions {
            workers,
            queue_capacity,
        },
    )
    .await
    .unwrap()
}

/// Poll `store` until task `id` reaches `status`, panicking after five seconds
pub(crate) async fn wait_for_status(store: &dyn TaskStore, id: &TaskId, status: TaskStatus) -> Task {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(task) = store.get(id).await
            && task.status == status
        {
            return task;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("task {id} did not reach {status:?}: {:?}", store.get(id).await);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll until `check` holds, panicking after five seconds
pub(crate) async fn wait_until(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
