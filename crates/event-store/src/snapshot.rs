use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{AggregateId, Result, Version};

/// Serialized aggregate state captured after the event at `version`.
///
/// Loading starts from the latest snapshot and replays only the events
/// appended after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    /// Version of the last event folded into `state`.
    pub version: Version,

    pub timestamp: DateTime<Utc>,
    pub state: serde_json::Value,
}

impl Snapshot {
    /// Creates a snapshot from a serializable state.
    pub fn from_state<T: Serialize>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        version: Version,
        state: &T,
    ) -> Result<Self> {
        Ok(Self {
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            version,
            timestamp: Utc::now(),
            state: serde_json::to_value(state)?,
        })
    }

    /// Deserializes the captured state.
    pub fn into_state<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.state)?)
    }
}
