//! Application state for the API server

use crate::{Config, TaskService};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
#[derive(Clone)]
pub struct AppState {
    /// The task service backing every endpoint
    pub service: Arc<TaskService>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(service: Arc<TaskService>, config: Arc<Config>) -> Self {
        Self { service, config }
    }
}
