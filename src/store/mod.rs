//! Task persistence layer
//!
//! [`TaskStore`] is the contract the orchestrator consumes; [`JsonTaskStore`] is the
//! production implementation, keeping every task in memory and rewriting one JSON
//! snapshot file on each mutation.
//!
//! The snapshot write is not crash-atomic: a crash in the middle of `persist` can leave
//! a truncated file, which the next start treats as undecodable and resets to empty.

use crate::error::StoreError;
use crate::types::{Task, TaskId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Durable key-value storage of tasks
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert or overwrite a task, then persist
    async fn save(&self, task: &Task) -> Result<(), StoreError>;

    /// Look up a task by ID
    async fn get(&self, id: &TaskId) -> Result<Task, StoreError>;

    /// All tasks, in no particular order
    async fn list(&self) -> Result<Vec<Task>, StoreError>;

    /// Overwrite an existing task, then persist. Fails with `NotFound` for unknown IDs.
    async fn update(&self, task: &Task) -> Result<(), StoreError>;
}

/// Snapshot-file backed [`TaskStore`]
///
/// All access goes through one reader/writer lock. Writers hold it across the
/// snapshot write, so snapshot I/O is serialized too. A mutation whose snapshot write
/// fails is rolled back in memory, so readers only ever see persisted state.
pub struct JsonTaskStore {
    path: PathBuf,
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl JsonTaskStore {
    /// Open the store at `path`, creating its directory and an empty snapshot if needed.
    ///
    /// An existing snapshot that cannot be decoded is discarded with a warning and the
    /// store starts empty. Failing to create the directory, read an existing file, or
    /// write the initial empty snapshot is fatal.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| StoreError::CreateDir {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        let tasks = match tokio::fs::try_exists(&path).await {
            Ok(true) => load(&path).await?,
            Ok(false) => {
                tracing::info!(path = %path.display(), "Storage file not found, creating new");
                let empty = HashMap::new();
                persist(&path, &empty).await?;
                empty
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        tracing::info!(path = %path.display(), tasks = tasks.len(), "Task store opened");

        Ok(Self {
            path,
            tasks: RwLock::new(tasks),
        })
    }

    /// Location of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TaskStore for JsonTaskStore {
    async fn save(&self, task: &Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        let previous = tasks.insert(task.id.clone(), task.clone());
        if let Err(e) = persist(&self.path, &tasks).await {
            match previous {
                Some(previous) => tasks.insert(task.id.clone(), previous),
                None => tasks.remove(&task.id),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn get(&self, id: &TaskId) -> Result<Task, StoreError> {
        let tasks = self.tasks.read().await;
        tasks.get(id).cloned().ok_or_else(|| StoreError::NotFound {
            id: id.to_string(),
        })
    }

    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.values().cloned().collect())
    }

    async fn update(&self, task: &Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        let previous = match tasks.get_mut(&task.id) {
            Some(slot) => std::mem::replace(slot, task.clone()),
            None => {
                return Err(StoreError::NotFound {
                    id: task.id.to_string(),
                });
            }
        };
        if let Err(e) = persist(&self.path, &tasks).await {
            tasks.insert(task.id.clone(), previous);
            return Err(e);
        }
        Ok(())
    }
}

/// Write the whole map as pretty JSON (two-space indent), truncating the file first.
async fn persist(path: &Path, tasks: &HashMap<TaskId, Task>) -> Result<(), StoreError> {
    let mut bytes = serde_json::to_vec_pretty(tasks)?;
    bytes.push(b'\n');
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

async fn load(path: &Path) -> Result<HashMap<TaskId, Task>, StoreError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    match serde_json::from_slice::<HashMap<TaskId, Task>>(&bytes) {
        Ok(tasks) => Ok(tasks),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Error decoding storage file, starting with empty storage"
            );
            Ok(HashMap::new())
        }
    }
}
