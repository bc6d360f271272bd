//! heapwatch — an OOM heap-profile watchdog
//!
//! Polls every process on the host, tracks cgroup memory usage against a
//! critical threshold, and captures a pprof heap profile from each of a
//! critical process's listening ports before the kernel OOM-killer gets to
//! it. Captured profiles are uploaded to S3; the whole exercise is
//! best-effort and intentionally racy with the kernel OOM path.

pub mod blob;
pub mod config;
pub mod core;
pub mod fetch;
pub mod pipeline;
pub mod proc;
pub mod tracker;
pub mod watcher;

// Re-export the trait layer and domain types for convenience.
pub use crate::core::*;
pub use crate::tracker::{Evaluation, HealthState, ProcessTracker};
