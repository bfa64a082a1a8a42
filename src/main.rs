//! task-dl server entry point.
//!
//! Startup order:
//! 1. Parse command line arguments and load configuration.
//! 2. Initialise tracing.
//! 3. Build the task service (opens the snapshot, starts workers, recovers tasks).
//! 4. Serve the HTTP API until SIGINT/SIGTERM, then shut down gracefully.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use task_dl::{Config, TaskService};
use tracing_subscriber::EnvFilter;

/// Durable asynchronous URL download service
#[derive(Debug, Parser)]
#[command(name = "task-dl", version, about)]
struct Args {
    /// Path to the TOML configuration file (missing file means defaults)
    #[arg(short, long, default_value = "config/config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = Config::load(&args.config)?;

    init_tracing(&config.log.level);
    tracing::info!(
        name = %config.app.name,
        version = %config.app.version,
        config = %args.config.display(),
        "task-dl starting"
    );

    let service = Arc::new(TaskService::from_config(&config).await?);
    let config = Arc::new(config);

    let mut api = tokio::spawn(task_dl::api::start_api_server(
        service.clone(),
        config.clone(),
    ));

    tokio::select! {
        _ = task_dl::run_with_shutdown(&service) => {
            // The server drains on its own once shutdown has been requested
            match api.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "API server failed"),
                Err(e) => tracing::error!(error = %e, "API server task panicked"),
            }
        }
        result = &mut api => {
            // Only reached if the server failed to start or crashed
            service.shutdown().await;
            result??;
        }
    }

    tracing::info!("task-dl stopped");
    Ok(())
}

/// Install the fmt subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(level: &str) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => match level.parse::<EnvFilter>() {
            Ok(filter) => filter,
            Err(e) => {
                eprintln!("WARN: log level '{level}' is not a valid filter ({e}); falling back to 'info'");
                EnvFilter::new("info")
            }
        },
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
