//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`tasks`] - Task creation and status
//! - [`system`] - Health, events, OpenAPI

use serde::{Deserialize, Serialize};

mod system;
mod tasks;

pub use system::*;
pub use tasks::*;

/// Request body for POST /tasks
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateTaskRequest {
    /// Absolute http(s) URLs to download, in order
    #[serde(rename = "URLs")]
    pub urls: Vec<String>,
}
