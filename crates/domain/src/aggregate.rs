//! Core aggregate and domain event traits.

use chrono::{DateTime, Utc};
use event_store::{EventEnvelope, Version};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::DomainError;

/// A closed family of events produced by one aggregate type.
///
/// Implemented by an enum whose serialized form carries the same tag that
/// `event_type` returns.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Every tag this family can produce.
    const EVENT_TYPES: &'static [&'static str];

    /// Returns the tag of this event, e.g. "OrderCreated".
    fn event_type(&self) -> &'static str;
}

/// Something whose state is derived solely by replaying its events.
///
/// - `apply` is a pure projection: same state and event, same result, no side effects, no failure.
/// - `state` exposes what gets written into snapshots.
/// - `restore` rebuilds an instance from a snapshot state.
pub trait Aggregate: Default + Send + Sync + Sized {
    type Event: DomainEvent;

    /// Serializable materialization stored in snapshots.
    type State: Serialize + DeserializeOwned + Send + Sync;

    /// Why a command was rejected.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name, e.g. "Order".
    fn aggregate_type() -> &'static str;

    /// Version of the last applied event, 0 for a fresh instance.
    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    /// Folds one event into the state. `recorded_at` is the event's timestamp.
    fn apply(&mut self, event: Self::Event, recorded_at: DateTime<Utc>);

    fn state(&self) -> &Self::State;

    /// Rebuilds an aggregate from a snapshot taken at `version`.
    fn restore(state: Self::State, version: Version) -> Self;
}

/// Decodes a stored envelope into the aggregate's event type.
///
/// A tag outside `E::EVENT_TYPES` is reported as `UnknownEventType`, never
/// skipped. The decoded variant must match the envelope's `event_type`.
pub fn decode_event<E: DomainEvent>(envelope: &EventEnvelope) -> Result<E, DomainError> {
    if !E::EVENT_TYPES.contains(&envelope.event_type.as_str()) {
        return Err(DomainError::UnknownEventType {
            aggregate_id: envelope.aggregate_id.clone(),
            event_type: envelope.event_type.clone(),
            version: envelope.version,
        });
    }
    let event: E = envelope.decode()?;
    if event.event_type() != envelope.event_type {
        return Err(DomainError::EventTypeMismatch {
            aggregate_id: envelope.aggregate_id.clone(),
            event_type: envelope.event_type.clone(),
            payload_type: event.event_type(),
            version: envelope.version,
        });
    }
    Ok(event)
}

/// Applies `events` in order, returning the timestamp of the last one applied.
///
/// Stops at the first event that cannot be decoded.
pub fn replay<A: Aggregate>(
    aggregate: &mut A,
    events: impl IntoIterator<Item = EventEnvelope>,
) -> Result<Option<DateTime<Utc>>, DomainError> {
    let mut last_applied = None;
    for envelope in events {
        let event: A::Event = decode_event(&envelope)?;
        aggregate.apply(event, envelope.timestamp);
        aggregate.set_version(envelope.version);
        last_applied = Some(envelope.timestamp);
    }
    Ok(last_applied)
}
