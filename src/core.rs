//! Core domain types and service traits for heapwatch
//!
//! This module defines the data types and trait contracts that govern
//! component interactions: the process metrics provider, the heap profile
//! fetcher, and the blob store the captured profiles are shipped to.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Identifier of a monitored process. Stable for the process's lifetime,
/// but reused by the kernel after exit, so trackers keyed on it must be
/// evicted once the pid disappears from a poll.
pub type Pid = i32;

/// Errors surfaced by a [`MetricsProvider`].
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The process table itself could not be queried. Aborts the whole tick.
    #[error("failed to enumerate processes: {0}")]
    Enumeration(#[source] std::io::Error),

    /// Memory accounting for one process is missing, typically because the
    /// process exited between enumeration and the cgroup read. Callers skip
    /// the process without logging.
    #[error("memory accounting unavailable for pid {0}")]
    Unavailable(Pid),

    /// The kernel socket tables for one process could not be read.
    #[error("port discovery failed for pid {pid}: {source}")]
    PortDiscovery {
        pid: Pid,
        #[source]
        source: std::io::Error,
    },
}

/// Errors surfaced by a [`ProfileFetcher`] while retrieving a heap profile.
///
/// On any fetch failure no local artifact remains pending, so callers must
/// not attempt cleanup afterwards.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned non-success status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to write profile to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to resolve local hostname: {0}")]
    Hostname(#[source] std::io::Error),
}

/// Errors surfaced by a [`BlobStore`] upload. The local artifact is left in
/// place when an upload fails.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("artifact path {0} has no usable file name")]
    InvalidKey(PathBuf),

    #[error("failed to read artifact {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to upload {key} to bucket {bucket}: {source}")]
    Transport {
        bucket: String,
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Failure to delete a local artifact. Reported but never escalated; a
/// leftover file is an acceptable degraded state.
#[derive(Debug, Error)]
#[error("failed to delete artifact {path}: {source}")]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

// =============================================================================
// Service Traits
// =============================================================================

/// Supplies the current process set and per-process memory/port observations.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Lists every live process except the watchdog's own.
    async fn list_processes(&self) -> Result<Vec<Pid>, MetricsError>;

    /// Memory usage as a percentage of the process's cgroup limit.
    ///
    /// A cgroup with no limit configured resolves to 0 rather than dividing
    /// by zero.
    async fn memory_usage_percent(&self, pid: Pid) -> Result<u64, MetricsError>;

    /// TCP ports (v4 and v6) the process is listening on.
    async fn listening_ports(&self, pid: Pid) -> Result<Vec<u16>, MetricsError>;
}

/// Retrieves a heap profile from a process's local profiling endpoint and
/// persists it as a uniquely named local artifact.
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    /// Fetches the heap profile exposed on `port` and writes it to a local
    /// artifact, returning the artifact's path.
    async fn fetch_and_save(&self, pid: Pid, port: u16) -> Result<PathBuf, FetchError>;

    /// Deletes a previously saved artifact.
    async fn remove_artifact(&self, path: &Path) -> Result<(), CleanupError>;
}

/// Durable storage for captured artifacts.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads the artifact under its base filename as the object key,
    /// returning the resulting object URL.
    async fn upload(&self, bucket: &str, path: &Path) -> Result<String, UploadError>;
}
