use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::{
    AggregateId, EventEnvelope, EventQuery, EventStoreError, EventStoreStats, EventTypeStats,
    Result, Snapshot, Version,
    store::{AppendOptions, EventFeed, EventStore},
    validation::validate_events_for_append,
};

/// One aggregate's events, guarded by its own lock.
type StreamHandle = Arc<Mutex<Vec<EventEnvelope>>>;

/// In-process event store.
///
/// The id -> stream map is only locked long enough to find or insert a
/// stream; appends then hold that stream's mutex for the head check and the
/// push, so writers of different aggregates never wait on each other.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<HashMap<AggregateId, StreamHandle>>>,
    snapshots: Arc<RwLock<HashMap<AggregateId, Snapshot>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        let mut count = 0;
        for handle in self.handles().await {
            count += handle.lock().await.len();
        }
        count
    }

    /// Drops every stream and snapshot.
    pub async fn clear(&self) {
        self.streams.write().await.clear();
        self.snapshots.write().await.clear();
    }

    async fn stream(&self, aggregate_id: &AggregateId) -> Option<StreamHandle> {
        self.streams.read().await.get(aggregate_id).cloned()
    }

    async fn stream_or_insert(&self, aggregate_id: &AggregateId) -> StreamHandle {
        if let Some(handle) = self.stream(aggregate_id).await {
            return handle;
        }
        self.streams
            .write()
            .await
            .entry(aggregate_id.clone())
            .or_default()
            .clone()
    }

    async fn handles(&self) -> Vec<StreamHandle> {
        self.streams.read().await.values().cloned().collect()
    }

    async fn read_stream(&self, aggregate_id: &AggregateId) -> Vec<EventEnvelope> {
        match self.stream(aggregate_id).await {
            Some(handle) => {
                let stream = handle.lock().await;
                stream.clone()
            }
            None => Vec::new(),
        }
    }

    async fn all_events(&self) -> Vec<EventEnvelope> {
        let mut events = Vec::new();
        for handle in self.handles().await {
            events.extend(handle.lock().await.iter().cloned());
        }
        events
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;

        let aggregate_id = events[0].aggregate_id.clone();
        let first_version = events[0].version;

        let handle = self.stream_or_insert(&aggregate_id).await;
        let mut stream = handle.lock().await;

        let current_version = stream
            .last()
            .map(|e| e.version)
            .unwrap_or(Version::initial());

        let expected = match options.expected_version {
            Some(expected) if expected != current_version => Some(expected),
            _ if first_version != current_version.next() => {
                Some(Version::new(first_version.as_i64() - 1))
            }
            _ => None,
        };
        if let Some(expected) = expected {
            metrics::counter!("event_store_concurrency_conflicts").increment(1);
            tracing::warn!(
                %aggregate_id,
                %expected,
                actual = %current_version,
                "rejected append on stale stream head"
            );
            return Err(EventStoreError::OptimisticConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current_version,
            });
        }

        let appended = events.len();
        let last_version = events
            .last()
            .map(|e| e.version)
            .unwrap_or(current_version);
        stream.extend(events);

        metrics::counter!("event_store_events_appended").increment(appended as u64);
        tracing::debug!(%aggregate_id, version = %last_version, appended, "events appended");

        Ok(last_version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: &AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        Ok(self.read_stream(aggregate_id).await)
    }

    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: &AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let mut events = self.read_stream(aggregate_id).await;
        events.retain(|e| e.version >= from_version);
        Ok(events)
    }

    async fn get_events_until(
        &self,
        aggregate_id: &AggregateId,
        until: DateTime<Utc>,
    ) -> Result<Vec<EventEnvelope>> {
        let mut events = self.read_stream(aggregate_id).await;
        events.retain(|e| e.timestamp <= until);
        Ok(events)
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>> {
        let mut events = match query.aggregate_id {
            Some(ref id) => self.read_stream(id).await,
            None => self.all_events().await,
        };
        events.retain(|e| query.matches(e));
        events.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.aggregate_id.cmp(&b.aggregate_id))
                .then(a.version.cmp(&b.version))
        });

        let events = events
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(events)
    }

    async fn get_events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>> {
        self.query_events(EventQuery::new().event_type(event_type))
            .await
    }

    async fn stream_all_events(&self) -> Result<EventFeed> {
        use futures_util::stream;

        let events = self.query_events(EventQuery::new()).await?;
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn get_aggregate_version(&self, aggregate_id: &AggregateId) -> Result<Option<Version>> {
        let version = match self.stream(aggregate_id).await {
            Some(handle) => {
                let stream = handle.lock().await;
                stream.last().map(|e| e.version)
            }
            None => None,
        };
        Ok(version)
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        if let Some(existing) = snapshots.get(&snapshot.aggregate_id)
            && !snapshot.supersedes(existing)
        {
            tracing::debug!(
                aggregate_id = %snapshot.aggregate_id,
                kept = %existing.version,
                offered = %snapshot.version,
                "ignoring stale snapshot"
            );
            return Ok(());
        }
        snapshots.insert(snapshot.aggregate_id.clone(), snapshot);
        Ok(())
    }

    async fn get_snapshot(&self, aggregate_id: &AggregateId) -> Result<Option<Snapshot>> {
        Ok(self.snapshots.read().await.get(aggregate_id).cloned())
    }

    async fn stats(&self) -> Result<EventStoreStats> {
        let mut aggregate_count = 0;
        let mut total_events = 0;
        for handle in self.handles().await {
            let len = handle.lock().await.len();
            if len > 0 {
                aggregate_count += 1;
                total_events += len;
            }
        }
        let snapshot_count = self.snapshots.read().await.len();

        Ok(EventStoreStats::new(
            aggregate_count,
            total_events,
            snapshot_count,
        ))
    }

    async fn event_type_stats(&self) -> Result<EventTypeStats> {
        let mut counts = EventTypeStats::new();
        for event in self.all_events().await {
            *counts.entry(event.event_type).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
