#![allow(dead_code)]
//! Shared mock implementations of the heapwatch service traits.

use async_trait::async_trait;
use heapwatch::core::{
    BlobStore, CleanupError, FetchError, MetricsError, MetricsProvider, Pid, ProfileFetcher,
    UploadError,
};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

fn induced(msg: &str) -> io::Error {
    io::Error::other(msg.to_string())
}

/// A scripted metrics provider. Tests mutate the process table between
/// ticks to simulate processes appearing, spiking and exiting.
#[derive(Default)]
pub struct FakeMetricsProvider {
    state: Mutex<ProviderState>,
}

#[derive(Default)]
struct ProviderState {
    fail_enumeration: bool,
    processes: Vec<Pid>,
    /// None means the cgroup accounting is unavailable for the pid.
    percents: HashMap<Pid, Option<u64>>,
    /// None means port discovery fails for the pid.
    ports: HashMap<Pid, Option<Vec<u16>>>,
    port_queries: Vec<Pid>,
}

impl FakeMetricsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_process(&self, pid: Pid, percent: u64) {
        let mut state = self.state.lock().unwrap();
        if !state.processes.contains(&pid) {
            state.processes.push(pid);
        }
        state.percents.insert(pid, Some(percent));
    }

    pub fn set_unavailable(&self, pid: Pid) {
        let mut state = self.state.lock().unwrap();
        if !state.processes.contains(&pid) {
            state.processes.push(pid);
        }
        state.percents.insert(pid, None);
    }

    pub fn remove_process(&self, pid: Pid) {
        let mut state = self.state.lock().unwrap();
        state.processes.retain(|&p| p != pid);
    }

    pub fn set_ports(&self, pid: Pid, ports: Vec<u16>) {
        self.state.lock().unwrap().ports.insert(pid, Some(ports));
    }

    pub fn fail_ports(&self, pid: Pid) {
        self.state.lock().unwrap().ports.insert(pid, None);
    }

    pub fn fail_enumeration(&self, fail: bool) {
        self.state.lock().unwrap().fail_enumeration = fail;
    }

    /// Number of times listening ports were queried, across all pids.
    pub fn port_queries(&self) -> usize {
        self.state.lock().unwrap().port_queries.len()
    }
}

#[async_trait]
impl MetricsProvider for FakeMetricsProvider {
    async fn list_processes(&self) -> Result<Vec<Pid>, MetricsError> {
        let state = self.state.lock().unwrap();
        if state.fail_enumeration {
            return Err(MetricsError::Enumeration(induced("process table down")));
        }
        Ok(state.processes.clone())
    }

    async fn memory_usage_percent(&self, pid: Pid) -> Result<u64, MetricsError> {
        match self.state.lock().unwrap().percents.get(&pid) {
            Some(Some(percent)) => Ok(*percent),
            _ => Err(MetricsError::Unavailable(pid)),
        }
    }

    async fn listening_ports(&self, pid: Pid) -> Result<Vec<u16>, MetricsError> {
        let mut state = self.state.lock().unwrap();
        state.port_queries.push(pid);
        match state.ports.get(&pid) {
            Some(Some(ports)) => Ok(ports.clone()),
            Some(None) => Err(MetricsError::PortDiscovery {
                pid,
                source: induced("socket table unreadable"),
            }),
            None => Ok(Vec::new()),
        }
    }
}

/// A profile fetcher that records attempts and hands out synthetic artifact
/// paths without touching the filesystem.
#[derive(Default)]
pub struct RecordingFetcher {
    pub attempts: Mutex<Vec<(Pid, u16)>>,
    pub removed: Mutex<Vec<PathBuf>>,
    fail_ports: Mutex<HashSet<u16>>,
    fail_remove: AtomicBool,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_fetch_on(&self, port: u16) {
        self.fail_ports.lock().unwrap().insert(port);
    }

    pub fn fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl ProfileFetcher for RecordingFetcher {
    async fn fetch_and_save(&self, pid: Pid, port: u16) -> Result<PathBuf, FetchError> {
        self.attempts.lock().unwrap().push((pid, port));
        if self.fail_ports.lock().unwrap().contains(&port) {
            return Err(FetchError::Status {
                url: format!("http://localhost:{port}/debug/pprof/heap"),
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            });
        }
        Ok(PathBuf::from(format!("host-{pid}-{port}.heap")))
    }

    async fn remove_artifact(&self, path: &Path) -> Result<(), CleanupError> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(CleanupError {
                path: path.to_path_buf(),
                source: induced("permission denied"),
            });
        }
        self.removed.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// A blob store that records uploads as `(bucket, key)` pairs.
#[derive(Default)]
pub struct RecordingStore {
    pub uploads: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl BlobStore for RecordingStore {
    async fn upload(&self, bucket: &str, path: &Path) -> Result<String, UploadError> {
        let key = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| UploadError::InvalidKey(path.to_path_buf()))?
            .to_string();

        if self.fail.load(Ordering::SeqCst) {
            return Err(UploadError::Transport {
                bucket: bucket.to_string(),
                key,
                source: Box::new(induced("credentials rejected")),
            });
        }

        let url = format!("https://{bucket}.s3.amazonaws.com/{key}");
        self.uploads
            .lock()
            .unwrap()
            .push((bucket.to_string(), key));
        Ok(url)
    }
}
