use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{AggregateId, Version};

/// A checkpoint of an aggregate's state after a given version.
///
/// The store keeps only the latest snapshot per aggregate. The state blob
/// belongs to the aggregate implementation, which both produces and reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub aggregate_id: AggregateId,

    pub aggregate_type: String,

    /// Version of the last event folded into `state`.
    pub version: Version,

    /// Timestamp of the last event folded into `state`.
    pub timestamp: DateTime<Utc>,

    pub state: serde_json::Value,
}

impl Snapshot {
    /// Creates a snapshot from a serializable state.
    pub fn from_state<T: Serialize>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        version: Version,
        timestamp: DateTime<Utc>,
        state: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            version,
            timestamp,
            state: serde_json::to_value(state)?,
        })
    }

    /// Deserializes the snapshot state into a concrete type.
    pub fn into_state<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.state)
    }

    /// True when `self` is at least as recent as `other`.
    pub fn supersedes(&self, other: &Snapshot) -> bool {
        self.version >= other.version
    }
}
