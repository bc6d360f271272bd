//! Procfs-backed process metrics provider.
//!
//! Enumerates `/proc`, reads cgroup memory accounting through each process's
//! own mount namespace (`/proc/<pid>/root/sys/fs/cgroup`) and discovers
//! listening TCP ports from the kernel socket tables. Supports both cgroup
//! v2 (`memory.max`/`memory.current`) and the legacy v1 layout
//! (`memory/memory.limit_in_bytes`/`memory/memory.usage_in_bytes`), trying
//! the current scheme first.

use crate::core::{MetricsError, MetricsProvider, Pid};
use async_trait::async_trait;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub struct ProcfsMetricsProvider {
    proc_root: PathBuf,
    own_pid: Pid,
}

impl ProcfsMetricsProvider {
    pub fn new() -> Self {
        Self::with_root("/proc", std::process::id() as Pid)
    }

    /// Provider rooted at an arbitrary directory instead of `/proc`, so
    /// tests can run against a synthetic process tree.
    pub fn with_root(proc_root: impl Into<PathBuf>, own_pid: Pid) -> Self {
        Self {
            proc_root: proc_root.into(),
            own_pid,
        }
    }

    fn pid_dir(&self, pid: Pid) -> PathBuf {
        self.proc_root.join(pid.to_string())
    }

    fn memory_limit(&self, pid: Pid) -> Option<u64> {
        let cgroup = self.pid_dir(pid).join("root/sys/fs/cgroup");
        read_bytes_value(&cgroup.join("memory.max"))
            .or_else(|_| read_bytes_value(&cgroup.join("memory/memory.limit_in_bytes")))
            .ok()
    }

    fn memory_usage(&self, pid: Pid) -> Option<u64> {
        let cgroup = self.pid_dir(pid).join("root/sys/fs/cgroup");
        read_bytes_value(&cgroup.join("memory.current"))
            .or_else(|_| read_bytes_value(&cgroup.join("memory/memory.usage_in_bytes")))
            .ok()
    }
}

impl Default for ProcfsMetricsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsProvider for ProcfsMetricsProvider {
    async fn list_processes(&self) -> Result<Vec<Pid>, MetricsError> {
        let entries = fs::read_dir(&self.proc_root).map_err(MetricsError::Enumeration)?;

        let mut pids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(MetricsError::Enumeration)?;
            if !entry.file_type().map_err(MetricsError::Enumeration)?.is_dir() {
                continue;
            }
            let Ok(pid) = entry.file_name().to_string_lossy().parse::<Pid>() else {
                continue;
            };
            if pid != self.own_pid {
                pids.push(pid);
            }
        }

        if pids.is_empty() {
            return Err(MetricsError::Enumeration(io::Error::new(
                io::ErrorKind::NotFound,
                "no other processes visible",
            )));
        }
        Ok(pids)
    }

    async fn memory_usage_percent(&self, pid: Pid) -> Result<u64, MetricsError> {
        let limit = self.memory_limit(pid).ok_or(MetricsError::Unavailable(pid))?;
        let usage = self.memory_usage(pid).ok_or(MetricsError::Unavailable(pid))?;
        // A cgroup without a configured limit reads as 0 ("max"); report 0%
        // instead of dividing by zero.
        if limit == 0 {
            return Ok(0);
        }
        Ok(usage * 100 / limit)
    }

    async fn listening_ports(&self, pid: Pid) -> Result<Vec<u16>, MetricsError> {
        let net = self.pid_dir(pid).join("net");
        let mut ports = Vec::new();
        for table in ["tcp", "tcp6"] {
            let content = fs::read_to_string(net.join(table))
                .map_err(|source| MetricsError::PortDiscovery { pid, source })?;
            ports.extend(parse_listening_ports(&content));
        }
        Ok(ports)
    }
}

/// Reads a cgroup byte-count file. The literal `max` means "no limit" and
/// reads as 0.
fn read_bytes_value(path: &Path) -> io::Result<u64> {
    let content = fs::read_to_string(path)?;
    let content = content.trim();
    if content == "max" {
        return Ok(0);
    }
    content
        .parse::<u64>()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

/// Extracts the local ports of sockets in LISTEN state (`0A`) from a
/// `/proc/<pid>/net/tcp` style table. The local port is the hex field after
/// the last colon of the local address column.
fn parse_listening_ports(content: &str) -> Vec<u16> {
    let mut ports = Vec::new();
    for line in content.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 || fields[3] != "0A" {
            continue;
        }
        let Some(port_hex) = fields[1].rsplit(':').next() else {
            continue;
        };
        if let Ok(port) = u16::from_str_radix(port_hex, 16) {
            ports.push(port);
        }
    }
    ports
}
