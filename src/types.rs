//! Core types for task-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// Unique identifier for a task
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a fresh random identifier (UUID v4)
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task status
///
/// `Failed` exists in the wire format but the orchestrator never assigns it:
/// a task whose files failed stays `Running`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet picked up by a worker
    Pending,
    /// Picked up by a worker (or stuck with failed files)
    #[serde(rename = "in_progress")]
    Running,
    /// Every file downloaded
    Done,
    /// Reserved, never assigned
    Failed,
}

impl TaskStatus {
    /// Whether a task in this status should be re-enqueued on startup
    pub fn is_resumable(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }
}

/// Per-file download status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Not attempted yet
    Pending,
    /// Download in flight
    #[serde(rename = "in_progress")]
    Running,
    /// Downloaded to `path`
    Done,
    /// Download failed, see `error`
    Failed,
}

/// One URL of a task and its download progress
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct File {
    /// Source URL
    pub url: String,
    /// Current status
    pub status: FileStatus,
    /// Local path, set once the file is done
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub path: Option<PathBuf>,
    /// Last failure message, set only when failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl File {
    /// A new pending file for `url`
    pub fn pending(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: FileStatus::Pending,
            path: None,
            error: None,
        }
    }

    pub(crate) fn mark_running(&mut self) {
        self.status = FileStatus::Running;
    }

    pub(crate) fn mark_done(&mut self, path: PathBuf) {
        self.status = FileStatus::Done;
        self.path = Some(path);
        self.error = None;
    }

    pub(crate) fn mark_failed(&mut self, error: String) {
        self.status = FileStatus::Failed;
        self.error = Some(error);
    }
}

/// A group of URLs submitted together for download
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,
    /// Creation time
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<Utc>,
    /// Current status
    pub status: TaskStatus,
    /// One entry per submitted URL, in submission order
    pub files: Vec<File>,
}

impl Task {
    /// Build a new pending task with one pending file per URL
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: TaskId::generate(),
            created_at: Utc::now(),
            status: TaskStatus::Pending,
            files: urls.into_iter().map(File::pending).collect(),
        }
    }

    /// Whether every file is done
    pub fn all_files_done(&self) -> bool {
        self.files.iter().all(|f| f.status == FileStatus::Done)
    }

    /// Recompute the task status from its files after processing.
    ///
    /// Done iff every file is done, otherwise Running. Never Failed.
    pub fn refresh_status(&mut self) {
        self.status = if self.all_files_done() {
            TaskStatus::Done
        } else {
            TaskStatus::Running
        };
    }
}

/// Events emitted by the task service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task persisted
    TaskCreated {
        /// Task ID
        id: TaskId,
    },
    /// Task placed on the work queue
    TaskQueued {
        /// Task ID
        id: TaskId,
    },
    /// A worker started processing the task
    TaskStarted {
        /// Task ID
        id: TaskId,
    },
    /// A file download started
    FileStarted {
        /// Task ID
        id: TaskId,
        /// Position of the file in the task
        index: usize,
        /// Source URL
        url: String,
    },
    /// A file finished downloading
    FileCompleted {
        /// Task ID
        id: TaskId,
        /// Position of the file in the task
        index: usize,
        /// Final location on disk
        path: PathBuf,
    },
    /// A file download failed
    FileFailed {
        /// Task ID
        id: TaskId,
        /// Position of the file in the task
        index: usize,
        /// Failure message
        error: String,
    },
    /// A worker finished visiting every file of the task
    TaskFinished {
        /// Task ID
        id: TaskId,
        /// Status after processing
        status: TaskStatus,
    },
    /// Service shut down
    Shutdown,
}

impl Event {
    /// The serialized `type` tag of this event
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TaskCreated { .. } => "task_created",
            Event::TaskQueued { .. } => "task_queued",
            Event::TaskStarted { .. } => "task_started",
            Event::FileStarted { .. } => "file_started",
            Event::FileCompleted { .. } => "file_completed",
            Event::FileFailed { .. } => "file_failed",
            Event::TaskFinished { .. } => "task_finished",
            Event::Shutdown => "shutdown",
        }
    }
}
