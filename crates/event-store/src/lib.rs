//! Append-only, per-aggregate event storage.
//!
//! The store knows nothing about what events mean: payloads and snapshot
//! states are JSON blobs owned by the aggregate implementations.

pub mod error;
pub mod event;
pub mod memory;
pub mod query;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod validation;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use query::EventQuery;
pub use snapshot::Snapshot;
pub use stats::{EventStoreStats, EventTypeStats};
pub use store::{AppendOptions, EventFeed, EventStore, EventStoreExt};
pub use validation::{StreamInconsistency, validate_stream};
