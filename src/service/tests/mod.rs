use super::test_helpers::{
    MemoryStore, Outcome, ScriptedFetcher, create_test_service, wait_for_status, wait_until,
};
use super::*;
use crate::types::{FileStatus, TaskId, TaskStatus};
use std::time::Duration;


/// Wait for the next event matching `pred`, panicking after five seconds
async fn next_event(
    events: &mut broadcast::Receiver<Event>,
    mut pred: impl FnMut(&Event) -> bool,
) -> Event {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(e) => panic!("event channel error: {e}"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// True once every file of the stored task has reached Done or Failed
fn files_settled(store: &MemoryStore, id: &TaskId) -> bool {
    store.snapshot(id).is_some_and(|task| {
        task.files
            .iter()
            .all(|f| matches!(f.status, FileStatus::Done | FileStatus::Failed))
    })
}

#[tokio::test]
async fn test_zero_workers_is_rejected() {
    let result = TaskService::new(
        Arc::new(MemoryStore::default()),
        Arc::new(ScriptedFetcher::new()),
        TaskServiceOptions {
            workers: 0,
            queue_capacity: 10,
        },
    )
    .await;

    assert!(matches!(result, Err(Error::Config { .. })));
}

#[tokio::test]
async fn test_zero_queue_capacity_is_rejected() {
    let result = TaskService::new(
        Arc::new(MemoryStore::default()),
        Arc::new(ScriptedFetcher::new()),
        TaskServiceOptions {
            workers: 1,
            queue_capacity: 0,
        },
    )
    .await;

    assert!(matches!(
        result,
        Err(Error::Config { key: Some(ref k), .. }) if k == "queue_capacity"
    ));
}

#[tokio::test]
async fn test_accessors_report_options() {
    let service = create_test_service(
        Arc::new(MemoryStore::default()),
        Arc::new(ScriptedFetcher::new()),
        3,
        7,
    )
    .await;

    assert_eq!(service.worker_count(), 3);
    assert_eq!(service.queue_capacity(), 7);
    service.shutdown().await;
}

#[tokio::test]
async fn test_default_options_follow_download_config() {
    let options = TaskServiceOptions::default();
    assert_eq!(options.workers, 4);
    assert_eq!(options.queue_capacity, 100);
}

#[tokio::test]
async fn test_from_config_creates_directories_and_snapshot() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.persistence.storage_path = temp_dir.path().join("data").join("tasks.json");
    config.download.workers_count = 2;

    let service = TaskService::from_config(&config).await.unwrap();

    assert!(config.download.download_dir.is_dir());
    assert!(config.persistence.storage_path.is_file());
    assert_eq!(service.worker_count(), 2);
    service.shutdown().await;
}
