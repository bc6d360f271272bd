//! Fixed-interval poll scheduler.
//!
//! Owns the tracker registry and, on every tick, sequences metrics
//! retrieval, per-process evaluation and pipeline invocation. All
//! evaluation within a tick is sequential, which keeps the cooldown
//! bookkeeping race-free without locking; a slow tick delays but never
//! overlaps the next one.

use crate::config::Config;
use crate::core::{MetricsProvider, Pid};
use crate::pipeline::CapturePipeline;
use crate::tracker::{HealthState, ProcessTracker};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::MissedTickBehavior;
use tracing::warn;

pub struct Watcher {
    config: Config,
    provider: Arc<dyn MetricsProvider>,
    pipeline: CapturePipeline,
    trackers: HashMap<Pid, ProcessTracker>,
}

impl Watcher {
    pub fn new(config: Config, provider: Arc<dyn MetricsProvider>, pipeline: CapturePipeline) -> Self {
        Self {
            config,
            provider,
            pipeline,
            trackers: HashMap::new(),
        }
    }

    /// Runs the watch loop forever.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.config.watch_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.tick(Instant::now()).await;
        }
    }

    /// Runs a single poll cycle with `now` as the tick's timestamp.
    pub async fn tick(&mut self, now: Instant) {
        let pids = match self.provider.list_processes().await {
            Ok(pids) => pids,
            Err(err) => {
                warn!(error = %err, "failed to list processes, skipping tick");
                return;
            }
        };

        for &pid in &pids {
            let percent = match self.provider.memory_usage_percent(pid).await {
                Ok(percent) => percent,
                // Expected for short-lived processes that exited between
                // enumeration and the cgroup read; deliberately not logged.
                Err(_) => continue,
            };

            let tracker = self
                .trackers
                .entry(pid)
                .or_insert_with(|| ProcessTracker::new(pid));
            let evaluation =
                tracker.evaluate(percent, self.config.critical_percent, self.config.cooldown, now);
            if !evaluation.should_act {
                continue;
            }

            // The cooldown was stamped above, so any failure from here on
            // still consumes this window's single attempt.
            let ports = match self.provider.listening_ports(pid).await {
                Ok(ports) => ports,
                Err(err) => {
                    warn!(pid, error = %err, "port discovery failed, skipping capture");
                    continue;
                }
            };

            if let Err(err) = self.pipeline.capture_all(pid, &ports).await {
                warn!(pid, error = %err, "heap capture failed");
            }
        }

        // Evict trackers whose pid vanished: bounds registry growth and
        // keeps a reused pid from inheriting a stranger's cooldown history.
        let live: HashSet<Pid> = pids.into_iter().collect();
        self.trackers.retain(|pid, _| live.contains(pid));
    }

    /// Current health state of a tracked process, if it is tracked.
    pub fn state_of(&self, pid: Pid) -> Option<HealthState> {
        self.trackers.get(&pid).map(|tracker| tracker.state())
    }

    /// Pids with a live tracker in the registry.
    pub fn tracked_pids(&self) -> Vec<Pid> {
        self.trackers.keys().copied().collect()
    }
}
