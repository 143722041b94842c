use chrono::{DateTime, Utc};

use crate::{AggregateId, EventEnvelope, Version};

/// Filter over recorded events, used by audit tooling.
///
/// All bounds are inclusive. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub aggregate_id: Option<AggregateId>,

    pub aggregate_type: Option<String>,

    /// Match any of these event types.
    pub event_types: Option<Vec<String>>,

    pub from_version: Option<Version>,

    pub to_version: Option<Version>,

    pub from_timestamp: Option<DateTime<Utc>>,

    pub to_timestamp: Option<DateTime<Utc>>,

    pub limit: Option<usize>,

    pub offset: Option<usize>,
}

impl EventQuery {
    /// Creates a query that matches every event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for a specific aggregate.
    pub fn for_aggregate(aggregate_id: AggregateId) -> Self {
        Self {
            aggregate_id: Some(aggregate_id),
            ..Default::default()
        }
    }

    /// Filters by aggregate ID.
    pub fn aggregate_id(mut self, id: AggregateId) -> Self {
        self.aggregate_id = Some(id);
        self
    }

    /// Filters by aggregate type.
    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    /// Adds an event type to match. Repeated calls match any of them.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types
            .get_or_insert_with(Vec::new)
            .push(event_type.into());
        self
    }

    /// Filters to events at or after `version`.
    pub fn from_version(mut self, version: Version) -> Self {
        self.from_version = Some(version);
        self
    }

    /// Filters to events at or before `version`.
    pub fn to_version(mut self, version: Version) -> Self {
        self.to_version = Some(version);
        self
    }

    /// Events recorded at or after `timestamp`.
    pub fn from_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.from_timestamp = Some(timestamp);
        self
    }

    /// Events recorded at or before `timestamp`.
    pub fn until(mut self, timestamp: DateTime<Utc>) -> Self {
        self.to_timestamp = Some(timestamp);
        self
    }

    /// Caps the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` matches.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if `event` passes every filter set on this query.
    ///
    /// Paging (`limit`/`offset`) is applied by the store after filtering.
    pub fn matches(&self, event: &EventEnvelope) -> bool {
        if let Some(ref id) = self.aggregate_id
            && &event.aggregate_id != id
        {
            return false;
        }
        if let Some(ref aggregate_type) = self.aggregate_type
            && &event.aggregate_type != aggregate_type
        {
            return false;
        }
        if let Some(ref types) = self.event_types
            && !types.contains(&event.event_type)
        {
            return false;
        }
        if self.from_version.is_some_and(|from| event.version < from) {
            return false;
        }
        if self.to_version.is_some_and(|to| event.version > to) {
            return false;
        }
        if self.from_timestamp.is_some_and(|from| event.timestamp < from) {
            return false;
        }
        if self.to_timestamp.is_some_and(|to| event.timestamp > to) {
            return false;
        }
        true
    }
}
