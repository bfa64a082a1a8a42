//! OpenAPI documentation and schema generation

use utoipa::OpenApi;

/// OpenAPI documentation for the task-dl REST API
///
/// Served as JSON at `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "task-dl REST API",
        description = "Submit URL download tasks and poll their progress",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Tasks
        crate::api::routes::create_task,
        crate::api::routes::list_tasks,
        crate::api::routes::get_task,

        // System
        crate::api::routes::health_check,
        crate::api::routes::event_stream,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::TaskId,
        crate::types::Task,
        crate::types::File,
        crate::types::TaskStatus,
        crate::types::FileStatus,

        // Config types from config.rs
        crate::config::Config,
        crate::config::AppConfig,
        crate::config::DownloadConfig,
        crate::config::PersistenceConfig,
        crate::config::LogConfig,
        crate::config::ApiConfig,

        // API request types
        crate::api::routes::CreateTaskRequest,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "tasks", description = "Download tasks - Submit URLs and poll task and file status"),
        (name = "system", description = "System endpoints - Health check, events, OpenAPI spec"),
    )
)]
pub struct ApiDoc;
