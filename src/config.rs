//! Configuration types for task-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf};
use utoipa::ToSchema;

/// Application identity, reported by the health endpoint and logs
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AppConfig {
    /// Application name (default: "task-dl")
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Application version (default: crate version)
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

/// Download behavior configuration (destination, worker pool, queue)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Root directory for downloaded files, one subdirectory per task (default: "downloads")
    #[serde(default = "default_download_dir")]
    #[schema(value_type = String)]
    pub download_dir: PathBuf,

    /// Number of workers processing tasks in parallel (default: 4)
    #[serde(default = "default_workers_count")]
    pub workers_count: usize,

    /// Capacity of the bounded work queue, in tasks (default: 100)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            workers_count: default_workers_count(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Task snapshot storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Snapshot file path (default: "data/tasks.json")
    #[serde(default = "default_storage_path")]
    #[schema(value_type = String)]
    pub storage_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LogConfig {
    /// Log level or filter directive (default: "info"); `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8080)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Main configuration for the task service
///
/// Read once at startup; there is no runtime reconfiguration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Application identity
    #[serde(default)]
    pub app: AppConfig,

    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Snapshot storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Logging
    #[serde(default)]
    pub log: LogConfig,

    /// REST API
    #[serde(default)]
    pub api: ApiConfig,
}

/// Environment variables that override file values
pub const ENV_APP_NAME: &str = "APP_NAME";
/// See [`ENV_APP_NAME`]
pub const ENV_APP_VERSION: &str = "APP_VERSION";
/// Port only; the bind host comes from the file
pub const ENV_SERVER_PORT: &str = "SERVER_PORT";
/// See [`ENV_APP_NAME`]
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
/// Download root directory
pub const ENV_DOWNLOAD_PATH: &str = "DOWNLOAD_PATH";
/// Snapshot file path
pub const ENV_STORAGE_PATH: &str = "STORAGE_PATH";
/// See [`ENV_APP_NAME`]
pub const ENV_WORKERS_COUNT: &str = "WORKERS_COUNT";

impl Config {
    /// Load configuration from a TOML file, apply environment overrides and validate.
    ///
    /// A missing file is not an error: defaults are used and overrides still apply.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            Err(e) => {
                return Err(Error::Config {
                    message: format!("cannot read {}: {}", path.display(), e),
                    key: None,
                });
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text (no overrides, no validation)
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config {
            message: e.to_string(),
            key: None,
        })
    }

    /// Apply overrides using `lookup` to resolve variable names
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup(ENV_APP_NAME) {
            self.app.name = name;
        }
        if let Some(version) = lookup(ENV_APP_VERSION) {
            self.app.version = version;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log.level = level;
        }
        if let Some(dir) = lookup(ENV_DOWNLOAD_PATH) {
            self.download.download_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup(ENV_STORAGE_PATH) {
            self.persistence.storage_path = PathBuf::from(path);
        }
        if let Some(port) = lookup(ENV_SERVER_PORT) {
            let port: u16 = port.trim().parse().map_err(|_| Error::Config {
                message: format!("invalid port '{}'", port),
                key: Some(ENV_SERVER_PORT.to_string()),
            })?;
            self.api.bind_address.set_port(port);
        }
        if let Some(workers) = lookup(ENV_WORKERS_COUNT) {
            self.download.workers_count = workers.trim().parse().map_err(|_| Error::Config {
                message: format!("invalid worker count '{}'", workers),
                key: Some(ENV_WORKERS_COUNT.to_string()),
            })?;
        }
        Ok(())
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.download.workers_count == 0 {
            return Err(Error::Config {
                message: "workers_count must be at least 1".into(),
                key: Some("workers_count".into()),
            });
        }
        if self.download.queue_capacity == 0 {
            return Err(Error::Config {
                message: "queue_capacity must be at least 1".into(),
                key: Some("queue_capacity".into()),
            });
        }
        if self.persistence.storage_path.as_os_str().is_empty() {
            return Err(Error::Config {
                message: "storage_path must not be empty".into(),
                key: Some("storage_path".into()),
            });
        }
        Ok(())
    }
}

// Default value functions
fn default_app_name() -> String {
    "task-dl".to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_workers_count() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    100
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("data/tasks.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}
