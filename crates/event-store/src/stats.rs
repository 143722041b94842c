//! Read-only aggregation across all streams.

use std::collections::BTreeMap;

use serde::Serialize;

/// Counts of recorded events keyed by event type.
pub type EventTypeStats = BTreeMap<String, usize>;

/// Store-wide totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventStoreStats {
    /// Aggregates with at least one event.
    pub aggregate_count: usize,
    pub total_events: usize,
    /// Aggregates that currently hold a snapshot.
    pub snapshot_count: usize,
    pub average_events_per_aggregate: f64,
}

impl EventStoreStats {
    pub fn new(aggregate_count: usize, total_events: usize, snapshot_count: usize) -> Self {
        let average_events_per_aggregate = if aggregate_count == 0 {
            0.0
        } else {
            total_events as f64 / aggregate_count as f64
        };

        Self {
            aggregate_count,
            total_events,
            snapshot_count,
            average_events_per_aggregate,
        }
    }
}
