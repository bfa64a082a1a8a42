//! Test configuration helpers for creating isolated services

use std::path::Path;
use std::sync::Arc;
use task_dl::{Config, TaskService};
use tempfile::TempDir;

/// Configuration rooted in `dir`: downloads and snapshot never touch the working tree
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.download.download_dir = dir.join("downloads");
    config.persistence.storage_path = dir.join("data").join("tasks.json");
    config.download.workers_count = 2;
    config.download.queue_capacity = 10;
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    config
}

/// Build a production service (JSON store + HTTP fetcher) in a fresh temp directory
///
/// Returns the service and temp directory (keep temp_dir alive for test duration)
pub async fn create_test_service() -> (Arc<TaskService>, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let service = start_service(temp_dir.path()).await;
    (service, temp_dir)
}

/// Start a service over the state already present in `dir`
pub async fn start_service(dir: &Path) -> Arc<TaskService> {
    let config = test_config(dir);
    Arc::new(TaskService::from_config(&config).await.unwrap())
}
