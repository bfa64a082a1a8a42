//! REST API server module
//!
//! Exposes task creation and status polling over HTTP, plus health, event stream and
//! OpenAPI endpoints.

use crate::{Config, Result, TaskService};
use axum::{Router, http::HeaderValue, routing::get, routing::post};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Tasks
/// - `POST /tasks` - Create a task from a list of URLs
/// - `GET /tasks` - List all tasks
/// - `GET /tasks/:id` - Get a single task
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /events` - Server-sent events stream
/// - `GET /openapi.json` - OpenAPI specification
pub fn create_router(service: Arc<TaskService>, config: Arc<Config>) -> Router {
    let state = AppState::new(service, config.clone());

    let router = Router::new()
        // Tasks
        .route("/tasks", post(routes::create_task))
        .route("/tasks", get(routes::list_tasks))
        .route("/tasks/:id", get(routes::get_task))
        // System
        .route("/health", get(routes::health_check))
        .route("/events", get(routes::event_stream))
        .route("/openapi.json", get(routes::openapi_spec))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        router.layer(build_cors_layer(&config.api.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer for the configured origins ("*" or an empty list allows any)
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Serve the API on `listener` until the service starts shutting down.
///
/// In-flight requests are allowed to finish once shutdown begins.
pub async fn serve(
    listener: TcpListener,
    service: Arc<TaskService>,
    config: Arc<Config>,
) -> Result<()> {
    let shutdown = service.shutdown_requested();
    let app = create_router(service, config);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

/// Bind the configured address and serve the API until shutdown.
///
/// # Example
///
/// ```no_run
/// use task_dl::{Config, TaskService};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let service = Arc::new(TaskService::from_config(&config).await?);
///
/// // Blocks until service.shutdown() is called
/// task_dl::api::start_api_server(service, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(service: Arc<TaskService>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    serve(listener, service, config).await
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
