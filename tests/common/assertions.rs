//! Custom test assertions for integration tests

use std::path::Path;
use std::time::Duration;
use task_dl::{Event, FileStatus, Task, TaskId, TaskService, TaskStatus};

/// Wait for a `TaskFinished` event for `id`, returning the reported status
///
/// Subscribe before the work starts, or the event may already be gone.
pub async fn wait_for_finished(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    id: &TaskId,
    timeout: Duration,
) -> TaskStatus {
    tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::TaskFinished { id: event_id, status }) if &event_id == id => {
                    return status;
                }
                Ok(_) => continue,
                Err(e) => panic!("event channel closed: {e}"),
            }
        }
    })
    .await
    .expect("timed out waiting for task to finish")
}

/// Poll the service until task `id` is Done
pub async fn wait_for_done(service: &TaskService, id: &TaskId, timeout: Duration) -> Task {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let task = service.get_task(id).await.unwrap();
        if task.status == TaskStatus::Done {
            return task;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {id} not done in time: {task:?}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Assert a file finished with content `expected` at its recorded path
pub fn assert_file_done(task: &Task, index: usize, expected: &str) {
    let file = &task.files[index];
    assert_eq!(file.status, FileStatus::Done, "file {index}: {file:?}");
    let path = file.path.as_ref().expect("done file has a path");
    assert_eq!(std::fs::read_to_string(path).unwrap(), expected);
}

/// Assert no `.tmp` file is left anywhere under `dir`
pub fn assert_no_temp_files(dir: &Path) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            assert_no_temp_files(&path);
        } else {
            assert!(
                !path.to_string_lossy().ends_with(".tmp"),
                "leftover temporary file {}",
                path.display()
            );
        }
    }
}
