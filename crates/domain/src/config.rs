//! Runtime configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use crate::repository::RetryPolicy;

/// Output format of the fmt layer installed by [`crate::telemetry::init_tracing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// Parses `json` or `pretty`, ignoring case. Anything else is `Pretty`.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Food cart engine configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `FOOD_CART_MAX_RETRIES`: retries after a concurrency conflict (default: `3`)
/// - `FOOD_CART_RETRY_BACKOFF_MS`: base pause between retries (default: `10`)
/// - `FOOD_CART_SNAPSHOT_INTERVAL`: events between snapshots, `0` disables (default: `5`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `json` or `pretty` (default: `pretty`)
///
/// Values that fail to parse fall back to their default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub snapshot_interval: usize,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            max_retries: parsed(&lookup, "FOOD_CART_MAX_RETRIES").unwrap_or(defaults.max_retries),
            retry_backoff: parsed(&lookup, "FOOD_CART_RETRY_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),
            snapshot_interval: parsed(&lookup, "FOOD_CART_SNAPSHOT_INTERVAL")
                .unwrap_or(defaults.snapshot_interval),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
        }
    }

    /// Retry policy for conflicting command dispatches.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: self.retry_backoff,
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff: Duration::from_millis(10),
            snapshot_interval: 5,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
