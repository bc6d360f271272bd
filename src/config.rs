//! Environment-derived configuration.
//!
//! The variable names are part of the operational contract and are read
//! verbatim, with no prefix. Every invalid value is rejected with a warning
//! and the default is kept; configuration problems never abort startup.

use std::env;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_CRITICAL_PERCENT: u8 = 80;
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_BUCKET: &str = "heapDumpBucket";

/// Immutable run-wide settings, resolved once before the first tick.
#[derive(Debug, Clone)]
pub struct Config {
    /// Memory usage percentage at or above which a process is Critical.
    pub critical_percent: u8,
    /// Minimum time between two capture attempts for the same process state.
    pub cooldown: Duration,
    /// Poll interval of the scheduler.
    pub watch_interval: Duration,
    /// Bucket the captured profiles are uploaded to.
    pub bucket: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            critical_percent: DEFAULT_CRITICAL_PERCENT,
            cooldown: DEFAULT_COOLDOWN,
            watch_interval: DEFAULT_WATCH_INTERVAL,
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }
}

impl Config {
    /// Resolves the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolves the configuration from an arbitrary variable lookup.
    /// `from_env` delegates here; tests supply a map instead of mutating the
    /// process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(raw) = get("MEMORY_CRITICAL_PERCENTAGE") {
            match parse_percent(&raw) {
                Some(percent) => config.critical_percent = percent,
                None => warn!(
                    value = %raw,
                    "MEMORY_CRITICAL_PERCENTAGE must be an integer between 0 and 100, keeping default"
                ),
            }
        }

        if let Some(raw) = get("COOLDOWN") {
            match parse_cooldown(&raw) {
                Some(Cooldown::Duration(cooldown)) => config.cooldown = cooldown,
                Some(Cooldown::LegacySeconds(cooldown)) => {
                    warn!(
                        value = %raw,
                        "bare-integer COOLDOWN is deprecated, use a duration string such as 30s"
                    );
                    config.cooldown = cooldown;
                }
                None => warn!(
                    value = %raw,
                    "COOLDOWN must be a non-negative duration, keeping default"
                ),
            }
        }

        if let Some(raw) = get("WATCH_TIME") {
            match parse_duration(&raw) {
                Some(interval) if !interval.is_zero() => config.watch_interval = interval,
                _ => warn!(
                    value = %raw,
                    "WATCH_TIME must be a positive duration, keeping default"
                ),
            }
        }

        if let Some(raw) = get("BUCKET") {
            if raw.is_empty() {
                warn!("BUCKET is set but empty, keeping default");
            } else {
                config.bucket = raw;
            }
        }

        config
    }
}

enum Cooldown {
    Duration(Duration),
    /// Accepted for backwards compatibility: a bare integer of whole seconds.
    LegacySeconds(Duration),
}

fn parse_percent(raw: &str) -> Option<u8> {
    match raw.trim().parse::<u8>() {
        Ok(value) if value <= 100 => Some(value),
        _ => None,
    }
}

fn parse_cooldown(raw: &str) -> Option<Cooldown> {
    if let Some(duration) = parse_duration(raw) {
        return Some(Cooldown::Duration(duration));
    }
    // Legacy format: a bare integer of seconds. Parsed as signed so that a
    // negative value is rejected rather than read as a huge unsigned one.
    match raw.trim().parse::<i64>() {
        Ok(seconds) if seconds >= 0 => Some(Cooldown::LegacySeconds(Duration::from_secs(
            seconds as u64,
        ))),
        _ => None,
    }
}

/// Parses a duration string of the form `100ms`, `30s`, `2m` or `1h`.
/// Fractional values are accepted; negative ones are not.
fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    for (suffix, scale) in [("ms", 0.001), ("s", 1.0), ("m", 60.0), ("h", 3600.0)] {
        if let Some(number) = raw.strip_suffix(suffix) {
            let value: f64 = number.trim().parse().ok()?;
            if !value.is_finite() || value < 0.0 {
                return None;
            }
            return Some(Duration::from_secs_f64(value * scale));
        }
    }
    None
}
