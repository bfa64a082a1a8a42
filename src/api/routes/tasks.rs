//! Task handlers.

use super::CreateTaskRequest;
use crate::api::AppState;
use crate::error::Error;
use crate::types::{Task, TaskId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

/// POST /tasks - Create a download task
#[utoipa::path(
    post,
    path = "/tasks",
    tag = "tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created and queued", body = Task),
        (status = 400, description = "A URL is not an absolute http(s) URL", body = crate::error::ApiError),
        (status = 500, description = "Task could not be saved", body = crate::error::ApiError)
    )
)]
pub async fn create_task(
    State(state): State<AppState>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), Error> {
    validate_urls(&request.urls)?;

    let task = state.service.create_task(request.urls).await?;
    tracing::info!(task_id = %task.id, files = task.files.len(), "task created");

    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /tasks - List all tasks
#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    responses(
        (status = 200, description = "All tasks, in no particular order", body = Vec<Task>),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, Error> {
    Ok(Json(state.service.list_tasks().await?))
}

/// GET /tasks/:id - Get a single task
#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task with per-file status", body = Task),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, Error> {
    Ok(Json(state.service.get_task(&TaskId::from(id)).await?))
}

/// Every URL must be absolute with an http or https scheme
fn validate_urls(urls: &[String]) -> Result<(), Error> {
    for raw in urls {
        let parsed = url::Url::parse(raw)
            .map_err(|e| Error::Validation(format!("invalid URL '{raw}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Validation(format!(
                "invalid URL '{raw}': scheme must be http or https"
            )));
        }
    }
    Ok(())
}
