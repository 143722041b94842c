use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_core::Stream;

use crate::{
    AggregateId, EventEnvelope, EventQuery, EventStoreStats, EventTypeStats, Result, Snapshot,
    Version, validation::validate_stream,
};

/// Options for appending events to the store.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Stream head the caller based its decision on. The store always
    /// requires the batch to start at head + 1; this adds an explicit check
    /// of the head itself.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects the aggregate to be at exactly `version`.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Expects the aggregate to have no events yet.
    pub fn expect_new() -> Self {
        Self::expect_version(Version::initial())
    }
}

/// Every event in the store, as an async stream.
pub type EventFeed = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// Storage for per-aggregate event streams and their latest snapshots.
///
/// Implementations must serialize writers of the same aggregate so that the
/// head check and the append happen as one step.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a batch to one aggregate's stream.
    ///
    /// Fails with `OptimisticConcurrencyConflict` unless the batch starts at
    /// the current head + 1 (and matches `options.expected_version`, if set).
    /// Returns the new head version.
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version>;

    /// All events of an aggregate, oldest first. Empty for an unknown id.
    async fn get_events_for_aggregate(&self, aggregate_id: &AggregateId)
    -> Result<Vec<EventEnvelope>>;

    /// Events with version >= `from_version`.
    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: &AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>>;

    /// Events recorded at or before `until`.
    async fn get_events_until(
        &self,
        aggregate_id: &AggregateId,
        until: DateTime<Utc>,
    ) -> Result<Vec<EventEnvelope>>;

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>>;

    async fn get_events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>>;

    /// Streams every stored event ordered by timestamp, then aggregate id and version.
    async fn stream_all_events(&self) -> Result<EventFeed>;

    /// Current head of the stream, or None if the aggregate has no events.
    async fn get_aggregate_version(&self, aggregate_id: &AggregateId) -> Result<Option<Version>>;

    /// Stores a snapshot, replacing an older one. An older snapshot never
    /// replaces a newer one.
    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()>;

    async fn get_snapshot(&self, aggregate_id: &AggregateId) -> Result<Option<Snapshot>>;

    async fn stats(&self) -> Result<EventStoreStats>;

    async fn event_type_stats(&self) -> Result<EventTypeStats>;
}

/// Convenience methods available on every event store.
#[async_trait]
pub trait EventStoreExt: EventStore {
    async fn append_event(&self, event: EventEnvelope, options: AppendOptions) -> Result<Version> {
        self.append(vec![event], options).await
    }

    async fn aggregate_exists(&self, aggregate_id: &AggregateId) -> Result<bool> {
        Ok(self.get_aggregate_version(aggregate_id).await?.is_some())
    }

    /// Loads the latest snapshot (if any) and the events recorded after it.
    async fn load_aggregate(
        &self,
        aggregate_id: &AggregateId,
    ) -> Result<(Option<Snapshot>, Vec<EventEnvelope>)> {
        match self.get_snapshot(aggregate_id).await? {
            Some(snapshot) => {
                let events = self
                    .get_events_for_aggregate_from_version(aggregate_id, snapshot.version.next())
                    .await?;
                Ok((Some(snapshot), events))
            }
            None => Ok((None, self.get_events_for_aggregate(aggregate_id).await?)),
        }
    }

    /// Returns false, and logs the first problem, if the stream has a version
    /// gap or a timestamp going backwards. Never repairs anything.
    async fn validate_event_stream(&self, aggregate_id: &AggregateId) -> Result<bool> {
        let events = self.get_events_for_aggregate(aggregate_id).await?;
        match validate_stream(&events) {
            Ok(()) => Ok(true),
            Err(inconsistency) => {
                tracing::warn!(%aggregate_id, %inconsistency, "event stream failed validation");
                Ok(false)
            }
        }
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}
