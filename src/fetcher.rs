//! Single-URL downloads to local disk.
//!
//! Each file is streamed into `<name>.tmp` inside the task's directory and renamed to
//! `<name>` only after the whole body has been written and synced. Every failure path
//! removes the temporary file, so a final name never holds a partial download.

use crate::error::FetchError;
use crate::types::TaskId;
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Suffix appended to the final file name while the body is being written
pub const TEMP_SUFFIX: &str = ".tmp";

/// Longest URL-derived name kept as is, leaving room for the collision and temp
/// suffixes under the usual 255-byte file name limit
const MAX_FILE_NAME_LEN: usize = 240;

/// Maximum number of `name (N).ext` candidates tried when resolving collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Abstraction over fetching one URL to disk, enabling testability.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Download `url` for `task_id` and return the final path.
    ///
    /// `cancel` is the only abort mechanism; there is no timeout.
    async fn fetch(
        &self,
        url: &str,
        task_id: &TaskId,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, FetchError>;
}

/// Production [`FileFetcher`] using an HTTP client
pub struct HttpFetcher {
    client: reqwest::Client,
    download_dir: PathBuf,
}

impl HttpFetcher {
    /// Create a fetcher writing below `download_dir` (one subdirectory per task)
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self::with_client(reqwest::Client::new(), download_dir)
    }

    /// Create a fetcher with a preconfigured client
    pub fn with_client(client: reqwest::Client, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            download_dir: download_dir.into(),
        }
    }
}

#[async_trait]
impl FileFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        task_id: &TaskId,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, FetchError> {
        let parsed = parse_url(url).inspect_err(|e| {
            tracing::error!(task_id = %task_id, url, error = %e, "failed to create http request");
        })?;

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(FetchError::Cancelled { url: url.to_string() });
            }
            response = self.client.get(parsed.clone()).send() => {
                response.map_err(|source| {
                    tracing::error!(task_id = %task_id, url, error = %source, "http request failed");
                    FetchError::Request { url: url.to_string(), source }
                })?
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::error!(task_id = %task_id, url, status = %status, "non-success response");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let file_name = file_name_from_url(&parsed);
        let dir = self.download_dir.join(task_id.as_str());
        tokio::fs::create_dir_all(&dir).await.map_err(|source| {
            tracing::error!(dir = %dir.display(), error = %source, "mkdir failed");
            FetchError::Io {
                path: dir.clone(),
                source,
            }
        })?;

        let final_path = unique_path(&dir, &file_name).await.inspect_err(|e| {
            tracing::error!(task_id = %task_id, url, error = %e, "no free file name");
        })?;
        let tmp_path = temp_path_for(&final_path);

        if let Err(e) = write_body(response, &tmp_path, url, cancel).await {
            remove_temp(&tmp_path).await;
            tracing::error!(task_id = %task_id, tmp = %tmp_path.display(), error = %e, "copy failed");
            return Err(e);
        }

        if let Err(source) = tokio::fs::rename(&tmp_path, &final_path).await {
            remove_temp(&tmp_path).await;
            tracing::error!(
                tmp = %tmp_path.display(),
                final_path = %final_path.display(),
                error = %source,
                "rename tmp to final failed"
            );
            return Err(FetchError::Io {
                path: final_path,
                source,
            });
        }

        tracing::debug!(task_id = %task_id, url, path = %final_path.display(), "file downloaded");
        Ok(final_path)
    }
}

fn parse_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// First free path for `file_name` in `dir`: the name itself, then `stem (1).ext`,
/// `stem (2).ext` and so on.
///
/// Files of one task are fetched one after another, so a name checked here is not
/// taken by a sibling file before the rename.
async fn unique_path(dir: &Path, file_name: &str) -> Result<PathBuf, FetchError> {
    let path = dir.join(file_name);
    if !path_exists(&path).await? {
        return Ok(path);
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let extension = name.extension().map(|e| e.to_string_lossy().into_owned());

    for i in 1..=MAX_RENAME_ATTEMPTS {
        let candidate = match &extension {
            Some(ext) => dir.join(format!("{stem} ({i}).{ext}")),
            None => dir.join(format!("{stem} ({i})")),
        };
        if !path_exists(&candidate).await? {
            return Ok(candidate);
        }
    }

    Err(FetchError::Io {
        path,
        source: std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("no free file name after {MAX_RENAME_ATTEMPTS} attempts"),
        ),
    })
}

async fn path_exists(path: &Path) -> Result<bool, FetchError> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn temp_path_for(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_os_string();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Stream the response body into `tmp_path`, checking for cancellation between chunks.
async fn write_body(
    response: reqwest::Response,
    tmp_path: &Path,
    url: &str,
    cancel: &CancellationToken,
) -> Result<(), FetchError> {
    let io_err = |source| FetchError::Io {
        path: tmp_path.to_path_buf(),
        source,
    };

    let mut file = tokio::fs::File::create(tmp_path).await.map_err(io_err)?;
    let mut body = response.bytes_stream();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(FetchError::Cancelled { url: url.to_string() });
            }
            next = body.next() => next,
        };
        let Some(chunk) = next else { break };
        let chunk = chunk.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        file.write_all(&chunk).await.map_err(io_err)?;
    }

    file.flush().await.map_err(io_err)?;
    file.sync_all().await.map_err(io_err)?;
    Ok(())
}

async fn remove_temp(tmp_path: &Path) {
    match tokio::fs::remove_file(tmp_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(tmp = %tmp_path.display(), error = %e, "failed to remove temporary file");
        }
    }
}

/// Destination file name for `url`: the last non-empty path segment, percent-decoded.
///
/// Falls back to a random UUID when the path yields nothing usable as a single file
/// name inside the task directory.
pub(crate) fn file_name_from_url(url: &Url) -> String {
    let path = url.path().trim_end_matches('/');
    let last = path.rsplit('/').next().unwrap_or("");
    let decoded = urlencoding::decode(last)
        .map(|name| name.into_owned())
        .unwrap_or_else(|_| last.to_string());

    let unusable = decoded.is_empty()
        || decoded == "."
        || decoded == ".."
        || decoded.len() > MAX_FILE_NAME_LEN
        || decoded.contains(['/', '\\', '\0']);

    if unusable {
        uuid::Uuid::new_v4().to_string()
    } else {
        decoded
    }
}
