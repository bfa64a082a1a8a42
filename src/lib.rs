//! # task-dl
//!
//! Durable asynchronous URL download tasks.
//!
//! A caller submits a list of URLs as a task. The task is persisted, downloaded in the
//! background by a fixed pool of workers, and can be polled until every file is done.
//! Tasks left unfinished by a crash or shutdown are picked up again on the next start.
//!
//! ## Quick Start
//!
//! ```no_run
//! use task_dl::{Config, TaskService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let service = TaskService::from_config(&config).await?;
//!
//!     // Subscribe to events
//!     let mut events = service.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let task = service
//!         .create_task(["https://example.com/file.iso"])
//!         .await?;
//!     println!("created {}", task.id);
//!
//!     service.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Single-URL downloads to disk
pub mod fetcher;
/// Task orchestration: queue, workers, recovery, shutdown
pub mod service;
/// Durable task storage
pub mod store;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{ApiError, Error, ErrorDetail, FetchError, Result, StoreError, ToHttpStatus};
pub use fetcher::{FileFetcher, HttpFetcher};
pub use service::{TaskService, TaskServiceOptions};
pub use store::{JsonTaskStore, TaskStore};
pub use types::{Event, File, FileStatus, Task, TaskId, TaskStatus};

/// Helper function to run the service with graceful signal handling.
///
/// Waits for a termination signal and then calls the service's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use task_dl::{Config, TaskService, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = TaskService::from_config(&Config::default()).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(&service).await;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(service: &TaskService) {
    wait_for_signal().await;
    service.shutdown().await;
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
