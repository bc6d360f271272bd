//! Per-process health state machine with cooldown-gated action triggering.

use crate::core::Pid;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::info;

/// Health classification of a monitored process.
///
/// `Warning` is reserved for a future intermediate tier; the current
/// transition logic only ever produces `Ok` and `Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthState {
    Ok,
    Warning,
    Critical,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Ok => write!(f, "Ok"),
            HealthState::Warning => write!(f, "Warning"),
            HealthState::Critical => write!(f, "Critical"),
        }
    }
}

/// Outcome of evaluating one memory observation for one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub state: HealthState,
    /// True when a capture should be attempted for this observation.
    pub should_act: bool,
}

/// State machine for a single observed process.
///
/// Cooldowns are keyed per-state rather than globally, so a future state
/// tier can carry an independent cooldown without interference. The only
/// key populated by the current logic is [`HealthState::Critical`].
#[derive(Debug)]
pub struct ProcessTracker {
    pid: Pid,
    state: HealthState,
    last_actions: HashMap<HealthState, Instant>,
}

impl ProcessTracker {
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            state: HealthState::Ok,
            last_actions: HashMap::new(),
        }
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    /// Applies one memory observation taken at `now`.
    ///
    /// The observed percentage maps to a target state (`Critical` at or above
    /// the threshold, `Ok` below it); a change of state is logged. An action
    /// fires when the target is `Critical` and no action was attempted within
    /// the last `cooldown`. The cooldown timestamp is stamped here, before
    /// the action runs, so a failed capture still consumes the window.
    pub fn evaluate(
        &mut self,
        percent: u64,
        critical_percent: u8,
        cooldown: Duration,
        now: Instant,
    ) -> Evaluation {
        let target = if percent < u64::from(critical_percent) {
            HealthState::Ok
        } else {
            HealthState::Critical
        };

        if target != self.state {
            info!(
                pid = self.pid,
                from = %self.state,
                to = %target,
                "process state transition"
            );
            self.state = target;
        }

        let should_act = target == HealthState::Critical && !self.on_cooldown(cooldown, now);
        if should_act {
            self.last_actions.insert(self.state, now);
        }

        Evaluation {
            state: target,
            should_act,
        }
    }

    /// A tracker is on cooldown while less than `cooldown` has elapsed since
    /// the last action attempted in its current state. A state that was never
    /// actioned is not on cooldown.
    fn on_cooldown(&self, cooldown: Duration, now: Instant) -> bool {
        match self.last_actions.get(&self.state) {
            Some(&then) => now.duration_since(then) < cooldown,
            None => false,
        }
    }
}
