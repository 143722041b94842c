use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{AggregateId, EventStoreError};

/// Globally unique identifier for a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of an event within its aggregate's stream.
///
/// Version 0 means "no events yet"; the first event is version 1 and every
/// later event is exactly one higher than its predecessor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// The version of an aggregate with an empty stream.
    pub fn initial() -> Self {
        Self(0)
    }

    /// The version carried by the first event of a stream.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the version that follows this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version number.
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// True when this version lands on a checkpoint boundary of `interval`.
    ///
    /// An interval of zero never checkpoints.
    pub fn is_checkpoint(&self, interval: u64) -> bool {
        interval > 0 && self.0 > 0 && (self.0 as u64).is_multiple_of(interval)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// One recorded state change of one aggregate.
///
/// Envelopes are immutable once appended. The payload is opaque to the store;
/// the aggregate that produced it owns its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,

    /// Discriminant of the payload, e.g. "OrderCreated".
    pub event_type: String,

    pub aggregate_id: AggregateId,

    /// Kind of aggregate the stream belongs to, e.g. "Order".
    pub aggregate_type: String,

    /// Version of the aggregate after this event.
    pub version: Version,

    /// Serialized as RFC 3339 / ISO-8601.
    pub timestamp: DateTime<Utc>,

    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Creates a builder for constructing an event envelope.
    pub fn builder() -> EventEnvelopeBuilder {
        EventEnvelopeBuilder::default()
    }

    /// Deserializes the payload into the aggregate's event type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

/// Builder for constructing event envelopes.
#[derive(Debug, Default)]
pub struct EventEnvelopeBuilder {
    event_id: Option<EventId>,
    event_type: Option<String>,
    aggregate_id: Option<AggregateId>,
    aggregate_type: Option<String>,
    version: Option<Version>,
    timestamp: Option<DateTime<Utc>>,
    payload: Option<serde_json::Value>,
}

impl EventEnvelopeBuilder {
    /// Sets the event ID. If not set, a new ID will be generated.
    pub fn event_id(mut self, id: EventId) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Sets the event type.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the aggregate ID.
    pub fn aggregate_id(mut self, id: AggregateId) -> Self {
        self.aggregate_id = Some(id);
        self
    }

    /// Sets the aggregate type.
    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    /// Sets the version.
    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Sets the timestamp. If not set, the current time will be used.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets the payload from a raw JSON value.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Builds the envelope, failing if a required field was never set.
    pub fn build(self) -> Result<EventEnvelope, EventStoreError> {
        fn required<T>(value: Option<T>, field: &str) -> Result<T, EventStoreError> {
            value.ok_or_else(|| EventStoreError::InvalidAppend(format!("{field} is required")))
        }

        Ok(EventEnvelope {
            event_id: self.event_id.unwrap_or_default(),
            event_type: required(self.event_type, "event_type")?,
            aggregate_id: required(self.aggregate_id, "aggregate_id")?,
            aggregate_type: required(self.aggregate_type, "aggregate_type")?,
            version: required(self.version, "version")?,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            payload: required(self.payload, "payload")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ordering_and_successor() {
        let v1 = Version::new(1);
        let v2 = Version::new(2);
        assert!(v1 < v2);
        assert_eq!(v1.next(), v2);
        assert_eq!(Version::initial().next(), Version::first());
    }

    #[test]
    fn version_checkpoints_on_interval_multiples() {
        assert!(!Version::initial().is_checkpoint(10));
        assert!(!Version::new(9).is_checkpoint(10));
        assert!(Version::new(10).is_checkpoint(10));
        assert!(!Version::new(19).is_checkpoint(10));
        assert!(Version::new(20).is_checkpoint(10));
        assert!(!Version::new(10).is_checkpoint(0));
    }

    #[test]
    fn builder_fills_defaults() {
        let aggregate_id = AggregateId::from("o1");
        let envelope = EventEnvelope::builder()
            .event_type("OrderCreated")
            .aggregate_id(aggregate_id.clone())
            .aggregate_type("Order")
            .version(Version::first())
            .payload_raw(serde_json::json!({"order_id": "o1"}))
            .build()
            .unwrap();

        assert_eq!(envelope.event_type, "OrderCreated");
        assert_eq!(envelope.aggregate_id, aggregate_id);
        assert_eq!(envelope.version, Version::first());
    }

    #[test]
    fn builder_keeps_an_explicit_event_id() {
        let id = EventId::new();
        let envelope = EventEnvelope::builder()
            .event_id(id)
            .event_type("OrderCreated")
            .aggregate_id(AggregateId::from("o1"))
            .aggregate_type("Order")
            .version(Version::first())
            .payload_raw(serde_json::json!({}))
            .build()
            .unwrap();

        assert_eq!(envelope.event_id, id);
        assert_eq!(envelope.event_id.as_uuid().get_version_num(), 4);
        assert_eq!(envelope.event_id.to_string(), id.as_uuid().to_string());
        assert_ne!(EventId::new(), id);
    }

    #[test]
    fn builder_rejects_missing_fields() {
        let result = EventEnvelope::builder().event_type("OrderCreated").build();
        assert!(matches!(result, Err(EventStoreError::InvalidAppend(msg)) if msg.contains("aggregate_id")));
    }

    #[test]
    fn wire_form_has_integer_version_and_iso_timestamp() {
        let envelope = EventEnvelope::builder()
            .event_type("OrderConfirmed")
            .aggregate_id(AggregateId::from("o1"))
            .aggregate_type("Order")
            .version(Version::new(3))
            .timestamp("2024-05-01T10:00:00Z".parse().unwrap())
            .payload_raw(serde_json::json!({"type": "OrderConfirmed"}))
            .build()
            .unwrap();

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["event_type"], "OrderConfirmed");
        assert_eq!(json["version"], 3);
        assert_eq!(json["timestamp"], "2024-05-01T10:00:00Z");
        assert_eq!(json["aggregate_id"], "o1");
    }
}
