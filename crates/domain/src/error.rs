//! Domain error types.

use common::AggregateId;
use event_store::{EventStoreError, Version};
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// A command was rejected by the order's guards.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// The stream holds an event this aggregate cannot dispatch. Replay stops
    /// here: the stream is corrupt or was written by a newer version.
    #[error("Unknown event type {event_type:?} at version {version} of aggregate {aggregate_id}")]
    UnknownEventType {
        aggregate_id: AggregateId,
        event_type: String,
        version: Version,
    },

    /// The envelope's `event_type` disagrees with the tag inside its payload.
    #[error(
        "Event at version {version} of aggregate {aggregate_id} is recorded as {event_type:?} but its payload is {payload_type:?}"
    )]
    EventTypeMismatch {
        aggregate_id: AggregateId,
        event_type: String,
        payload_type: &'static str,
        version: Version,
    },

    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: AggregateId,
    },

    /// A snapshot was requested at a version the stream has not reached.
    #[error("Aggregate {aggregate_id} has no version {version} (head is {head})")]
    VersionNotFound {
        aggregate_id: AggregateId,
        version: Version,
        head: Version,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// True when the command lost a race against another writer of the same aggregate.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(
            self,
            DomainError::EventStore(EventStoreError::OptimisticConcurrencyConflict { .. })
        )
    }
}
