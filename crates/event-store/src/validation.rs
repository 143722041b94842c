//! Consistency checks over a single aggregate stream.

use chrono::{DateTime, Utc};

use crate::{EventEnvelope, EventStoreError, Version};

/// First problem found while walking a stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamInconsistency {
    /// Versions must run 1, 2, ..., N without holes or repeats.
    #[error("version gap: expected {expected}, found {found}")]
    VersionGap { expected: Version, found: Version },

    /// Timestamps must never go backwards.
    #[error("timestamp regression at version {version}: {found} is before {previous}")]
    TimestampRegression {
        version: Version,
        previous: DateTime<Utc>,
        found: DateTime<Utc>,
    },
}

/// Checks that `events` form a well-ordered stream starting at version 1.
pub fn validate_stream(events: &[EventEnvelope]) -> Result<(), StreamInconsistency> {
    let mut expected = Version::first();
    let mut previous: Option<DateTime<Utc>> = None;

    for event in events {
        if event.version != expected {
            return Err(StreamInconsistency::VersionGap {
                expected,
                found: event.version,
            });
        }
        if let Some(previous) = previous
            && event.timestamp < previous
        {
            return Err(StreamInconsistency::TimestampRegression {
                version: event.version,
                previous,
                found: event.timestamp,
            });
        }
        previous = Some(event.timestamp);
        expected = expected.next();
    }

    Ok(())
}

/// Checks a batch handed to `append`: non-empty, one aggregate, sequential versions.
pub fn validate_events_for_append(events: &[EventEnvelope]) -> Result<(), EventStoreError> {
    let Some(first) = events.first() else {
        return Err(EventStoreError::InvalidAppend(
            "cannot append an empty batch".to_string(),
        ));
    };

    let mut expected_version = first.version;
    for event in &events[1..] {
        if event.aggregate_id != first.aggregate_id {
            return Err(EventStoreError::InvalidAppend(
                "all events in a batch must belong to the same aggregate".to_string(),
            ));
        }
        expected_version = expected_version.next();
        if event.version != expected_version {
            return Err(EventStoreError::InvalidAppend(format!(
                "batch versions must be sequential: expected {expected_version}, got {}",
                event.version
            )));
        }
    }

    Ok(())
}
