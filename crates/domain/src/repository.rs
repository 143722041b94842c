//! Aggregate-aware access to an event store.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{AggregateId, Clock, SystemClock};
use event_store::{AppendOptions, EventEnvelope, EventStore, EventStoreExt, Snapshot, Version};

use crate::aggregate::{Aggregate, DomainEvent, decode_event, replay};
use crate::config::RepositoryConfig;
use crate::error::DomainError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the recorded event.
    pub aggregate: A,

    /// The event as it was persisted.
    pub event: EventEnvelope,

    /// The new version of the aggregate after the command.
    pub new_version: Version,
}

/// Loads, reconstructs and snapshots aggregates of type `A` stored in `S`.
///
/// The store only knows about envelopes and opaque snapshot blobs; this type
/// adds everything that needs to understand the aggregate:
/// 1. Saving an event and taking a snapshot every `snapshot_interval` events
/// 2. Rebuilding current state from the latest snapshot plus newer events
/// 3. Rebuilding state as of a past instant, ignoring snapshots
/// 4. Running a command: decide, persist, then apply
pub struct EventSourcedRepository<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    clock: Arc<dyn Clock>,
    config: RepositoryConfig,
    _phantom: PhantomData<fn() -> A>,
}

impl<S, A> EventSourcedRepository<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    pub fn new(store: S) -> Self {
        Self::with_config(store, RepositoryConfig::default())
    }

    pub fn with_config(store: S, config: RepositoryConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            config,
            _phantom: PhantomData,
        }
    }

    /// Replaces the clock used to stamp events produced by `execute`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Appends a single, already built event.
    ///
    /// When the new head lands on a snapshot boundary a snapshot is taken at
    /// exactly that version. A failed snapshot is logged and does not fail
    /// the save: the event is already durable.
    ///
    /// An event whose type this aggregate knows must decode to that same
    /// variant, otherwise it is refused with `EventTypeMismatch` (or a
    /// serialization error). Unknown types are stored as-is.
    #[tracing::instrument(
        skip(self, event),
        fields(aggregate_id = %event.aggregate_id, event_type = %event.event_type, version = %event.version)
    )]
    pub async fn save(&self, event: EventEnvelope) -> Result<Version, DomainError> {
        if <A::Event as DomainEvent>::EVENT_TYPES.contains(&event.event_type.as_str()) {
            decode_event::<A::Event>(&event)?;
        }

        let aggregate_id = event.aggregate_id.clone();
        let version = self
            .store
            .append_event(event, AppendOptions::new())
            .await?;

        if version.is_checkpoint(self.config.snapshot_interval)
            && let Err(error) = self.create_snapshot(&aggregate_id, version).await
        {
            metrics::counter!("event_store_snapshot_failures").increment(1);
            tracing::warn!(%aggregate_id, %version, %error, "failed to snapshot after save");
        }

        Ok(version)
    }

    /// Rebuilds the current state of an aggregate.
    ///
    /// Starts from the latest snapshot when there is one and replays only the
    /// events recorded after it. An unknown id yields the default aggregate.
    #[tracing::instrument(skip(self), fields(aggregate_type = A::aggregate_type()))]
    pub async fn reconstruct(&self, aggregate_id: &AggregateId) -> Result<A, DomainError> {
        let (snapshot, events) = self.store.load_aggregate(aggregate_id).await?;

        let mut aggregate = match snapshot {
            Some(snapshot) => Self::restore(snapshot)?,
            None => A::default(),
        };

        let replayed = events.len();
        replay(&mut aggregate, events)?;

        metrics::histogram!("aggregate_replayed_events").record(replayed as f64);
        tracing::debug!(replayed, version = %aggregate.version(), "aggregate reconstructed");

        Ok(aggregate)
    }

    /// Rebuilds an aggregate as it was at `at`, inclusive.
    ///
    /// Always replays from the first event; snapshots are never consulted.
    /// An instant before the first event yields the default aggregate.
    #[tracing::instrument(skip(self), fields(aggregate_type = A::aggregate_type()))]
    pub async fn reconstruct_at(
        &self,
        aggregate_id: &AggregateId,
        at: DateTime<Utc>,
    ) -> Result<A, DomainError> {
        let events = self.store.get_events_until(aggregate_id, at).await?;
        let mut aggregate = A::default();
        replay(&mut aggregate, events)?;
        Ok(aggregate)
    }

    /// Like `reconstruct`, but None for an aggregate without events.
    pub async fn find(&self, aggregate_id: &AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.reconstruct(aggregate_id).await?;
        if aggregate.version() == Version::initial() {
            Ok(None)
        } else {
            Ok(Some(aggregate))
        }
    }

    /// Like `reconstruct`, but fails with `AggregateNotFound` for an aggregate without events.
    pub async fn load_existing(&self, aggregate_id: &AggregateId) -> Result<A, DomainError> {
        self.find(aggregate_id)
            .await?
            .ok_or_else(|| DomainError::AggregateNotFound {
                aggregate_type: A::aggregate_type(),
                aggregate_id: aggregate_id.clone(),
            })
    }

    /// Builds and stores a snapshot of the aggregate at exactly `version`.
    ///
    /// Events newer than `version` are left out even if they were appended
    /// in the meantime. An existing snapshot at or below `version` is used as
    /// the starting point.
    #[tracing::instrument(skip(self), fields(aggregate_type = A::aggregate_type()))]
    pub async fn create_snapshot(
        &self,
        aggregate_id: &AggregateId,
        version: Version,
    ) -> Result<Snapshot, DomainError> {
        let head = self
            .store
            .get_aggregate_version(aggregate_id)
            .await?
            .unwrap_or_default();
        if version < Version::first() || version > head {
            return Err(DomainError::VersionNotFound {
                aggregate_id: aggregate_id.clone(),
                version,
                head,
            });
        }

        let (mut aggregate, mut timestamp, from) = match self.store.get_snapshot(aggregate_id).await? {
            Some(snapshot) if snapshot.version <= version => {
                let from = snapshot.version.next();
                let timestamp = snapshot.timestamp;
                (Self::restore(snapshot)?, Some(timestamp), from)
            }
            _ => (A::default(), None, Version::first()),
        };

        let events = self
            .store
            .get_events_for_aggregate_from_version(aggregate_id, from)
            .await?
            .into_iter()
            .take_while(|event| event.version <= version);
        if let Some(last) = replay(&mut aggregate, events)? {
            timestamp = Some(last);
        }

        let snapshot = Snapshot::from_state(
            aggregate_id.clone(),
            A::aggregate_type(),
            aggregate.version(),
            timestamp.unwrap_or_else(|| self.clock.now()),
            aggregate.state(),
        )?;
        self.store.save_snapshot(snapshot.clone()).await?;

        metrics::counter!("event_store_snapshots_created").increment(1);
        tracing::debug!(%aggregate_id, version = %snapshot.version, "snapshot created");

        Ok(snapshot)
    }

    /// Executes a command against the current state and persists its event.
    ///
    /// `decide` sees the reconstructed aggregate and either rejects the
    /// command or returns the event to record. The event is appended with the
    /// version the decision was based on, so a concurrent writer makes this
    /// fail with a concurrency conflict instead of interleaving. The event is
    /// applied to the returned aggregate only after the append succeeded.
    #[tracing::instrument(skip(self, decide), fields(aggregate_type = A::aggregate_type()))]
    pub async fn execute<F>(
        &self,
        aggregate_id: &AggregateId,
        decide: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<A::Event, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut aggregate = self.reconstruct(aggregate_id).await?;
        let current_version = aggregate.version();

        let event = match decide(&aggregate) {
            Ok(event) => event,
            Err(error) => {
                metrics::counter!("commands_rejected", "aggregate" => A::aggregate_type())
                    .increment(1);
                tracing::debug!(%aggregate_id, %error, "command rejected");
                return Err(error.into());
            }
        };

        let new_version = current_version.next();
        let timestamp = self.clock.now();
        let envelope = EventEnvelope::builder()
            .aggregate_id(aggregate_id.clone())
            .aggregate_type(A::aggregate_type())
            .event_type(event.event_type())
            .version(new_version)
            .timestamp(timestamp)
            .payload(&event)?
            .build()?;

        self.store
            .append_event(envelope.clone(), AppendOptions::expect_version(current_version))
            .await?;

        aggregate.apply(event, timestamp);
        aggregate.set_version(new_version);

        if new_version.is_checkpoint(self.config.snapshot_interval)
            && let Err(error) = self.snapshot_current(aggregate_id, &aggregate, timestamp).await
        {
            metrics::counter!("event_store_snapshot_failures").increment(1);
            tracing::warn!(%aggregate_id, version = %new_version, %error, "failed to snapshot after command");
        }

        Ok(CommandResult {
            aggregate,
            event: envelope,
            new_version,
        })
    }

    /// Snapshots an aggregate that is already in hand, skipping the replay.
    async fn snapshot_current(
        &self,
        aggregate_id: &AggregateId,
        aggregate: &A,
        timestamp: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let snapshot = Snapshot::from_state(
            aggregate_id.clone(),
            A::aggregate_type(),
            aggregate.version(),
            timestamp,
            aggregate.state(),
        )?;
        self.store.save_snapshot(snapshot).await?;

        metrics::counter!("event_store_snapshots_created").increment(1);
        tracing::debug!(%aggregate_id, version = %aggregate.version(), "snapshot created");
        Ok(())
    }

    fn restore(snapshot: Snapshot) -> Result<A, DomainError> {
        let version = snapshot.version;
        let state: A::State = snapshot.into_state()?;
        Ok(A::restore(state, version))
    }
}
