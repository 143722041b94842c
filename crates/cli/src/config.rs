//! Audit configuration loaded from environment variables.

use domain::config::DEFAULT_SNAPSHOT_INTERVAL;

/// How log lines are written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Audit run configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `SNAPSHOT_INTERVAL`: events between snapshots (default: `10`)
/// - `AUDIT_ORDERS`: number of sample orders to replay (default: `3`)
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    pub snapshot_interval: u64,
    pub orders: usize,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
            snapshot_interval: lookup("SNAPSHOT_INTERVAL")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.snapshot_interval),
            orders: lookup("AUDIT_ORDERS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.orders),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            orders: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.snapshot_interval, 10);
        assert_eq!(config.orders, 3);
    }

    #[test]
    fn test_values_from_environment() {
        let config = Config::from_lookup(lookup(&[
            ("RUST_LOG", "debug"),
            ("LOG_FORMAT", "JSON"),
            ("SNAPSHOT_INTERVAL", "0"),
            ("AUDIT_ORDERS", "7"),
        ]));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.snapshot_interval, 0);
        assert_eq!(config.orders, 7);
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("SNAPSHOT_INTERVAL", "often"),
            ("AUDIT_ORDERS", "-1"),
        ]));
        assert_eq!(config.snapshot_interval, 10);
        assert_eq!(config.orders, 3);
    }
}
