//! Error types for task-dl
//!
//! This module provides the error taxonomy for the library:
//! - [`Error`] - the crate-wide error returned by public operations
//! - [`StoreError`] - task store lookup and persistence failures
//! - [`FetchError`] - per-file download failures (absorbed into file state)
//! - [`ApiError`] / [`ToHttpStatus`] - HTTP mapping for the REST layer

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for task-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for task-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "workers_count")
        key: Option<String>,
    },

    /// Task not found in the store
    #[error("task not found: {0}")]
    NotFound(String),

    /// A newly created task could not be persisted; it was not created
    #[error("cannot save task: {0}")]
    CannotSaveTask(#[source] StoreError),

    /// Task store failure outside of task creation
    #[error("storage error: {0}")]
    Store(StoreError),

    /// Request failed validation
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<StoreError> for Error {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { id } => Error::NotFound(id),
            other => Error::Store(other),
        }
    }
}

/// Task store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// No task with this ID
    #[error("task {id} not found")]
    NotFound {
        /// The task ID that was not found
        id: String,
    },

    /// Writing the snapshot file failed
    #[error("failed to write snapshot: {0}")]
    Persist(#[from] std::io::Error),

    /// Encoding the snapshot failed
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    /// The storage directory could not be created
    #[error("cannot create storage directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// An existing snapshot file could not be read
    #[error("cannot read snapshot {path}: {source}")]
    Read {
        /// Snapshot path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// Per-file download errors
///
/// The `Display` text of these errors is what ends up in a file's `error` field.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be turned into a request
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// The HTTP request failed (connection, protocol or body read)
    #[error("request to '{url}' failed: {source}")]
    Request {
        /// Requested URL
        url: String,
        /// Underlying client error
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("unexpected HTTP status {status} for '{url}'")]
    Status {
        /// Requested URL
        url: String,
        /// Status code received
        status: u16,
    },

    /// Local filesystem failure while writing the file
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being written
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The download was aborted by shutdown
    #[error("download of '{url}' cancelled")]
    Cancelled {
        /// Requested URL
        url: String,
    },
}

/// API error response format
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "task not found: 6f0c...",
///     "details": { "task_id": "6f0c..." }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,

            Error::NotFound(_) => 404,
            Error::Store(StoreError::NotFound { .. }) => 404,

            Error::CannotSaveTask(_) => 500,
            Error::Store(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::NotFound(_) => "not_found",
            Error::Store(StoreError::NotFound { .. }) => "not_found",
            Error::CannotSaveTask(_) => "cannot_save_task",
            Error::Store(_) => "storage_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::NotFound(id) => Some(serde_json::json!({ "task_id": id })),
            Error::Store(StoreError::NotFound { id }) => Some(serde_json::json!({ "task_id": id })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
