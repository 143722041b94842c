//! Repository configuration loaded from environment variables.

/// Default number of events between automatic snapshots.
pub const DEFAULT_SNAPSHOT_INTERVAL: u64 = 10;

/// Tuning for [`EventSourcedRepository`](crate::EventSourcedRepository).
///
/// Reads from environment variables:
/// - `SNAPSHOT_INTERVAL`: events between snapshots, `0` disables them (default: `10`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub snapshot_interval: u64,
}

impl RepositoryConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            snapshot_interval: std::env::var("SNAPSHOT_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SNAPSHOT_INTERVAL),
        }
    }

    pub fn with_snapshot_interval(snapshot_interval: u64) -> Self {
        Self { snapshot_interval }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshots_every_ten_events() {
        assert_eq!(RepositoryConfig::default().snapshot_interval, 10);
    }

    #[test]
    fn explicit_interval() {
        let config = RepositoryConfig::with_snapshot_interval(0);
        assert_eq!(config.snapshot_interval, 0);
    }
}
