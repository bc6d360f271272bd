//! Heap profile retrieval over a process's local pprof endpoint.

use crate::core::{CleanupError, FetchError, Pid, ProfileFetcher};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Cap on a single profile request so one unresponsive target cannot stall
/// the whole watch loop.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches `http://localhost:<port>/debug/pprof/heap` and writes the body to
/// a uniquely named artifact in the output directory.
pub struct HttpProfileFetcher {
    client: reqwest::Client,
    output_dir: PathBuf,
}

impl HttpProfileFetcher {
    /// Fetcher writing artifacts to the current working directory.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_output_dir(".")
    }

    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            client,
            output_dir: output_dir.into(),
        })
    }
}

/// Artifact filename: `<hostname>-<pid>-<port>-<YYYY-MM-DD-HH-mm>.heap`.
/// Minute granularity keeps the name collision-resistant across concurrent
/// ports and processes on the same host while staying reproducible.
pub fn artifact_name(hostname: &str, pid: Pid, port: u16, at: DateTime<Local>) -> String {
    format!("{hostname}-{pid}-{port}-{}.heap", at.format("%Y-%m-%d-%H-%M"))
}

#[async_trait]
impl ProfileFetcher for HttpProfileFetcher {
    async fn fetch_and_save(&self, pid: Pid, port: u16) -> Result<PathBuf, FetchError> {
        let url = format!("http://localhost:{port}/debug/pprof/heap");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Request { url, source })?;

        let hostname = hostname::get()
            .map_err(FetchError::Hostname)?
            .to_string_lossy()
            .into_owned();
        let path = self
            .output_dir
            .join(artifact_name(&hostname, pid, port, Local::now()));

        if let Err(source) = tokio::fs::write(&path, &body).await {
            // Don't leave a partial artifact behind on a failed write.
            let _ = tokio::fs::remove_file(&path).await;
            return Err(FetchError::Write { path, source });
        }

        Ok(path)
    }

    async fn remove_artifact(&self, path: &Path) -> Result<(), CleanupError> {
        tokio::fs::remove_file(path)
            .await
            .map_err(|source| CleanupError {
                path: path.to_path_buf(),
                source,
            })
    }
}
