//! Command trait and dispatch metadata.

use std::collections::HashMap;

use common::AggregateId;
use event_store::{COMMAND_TYPE_KEY, CORRELATION_ID_KEY};
use uuid::Uuid;

use crate::aggregate::Aggregate;

/// A request to change one aggregate.
///
/// Commands are validated against the aggregate's current state and may be
/// rejected; only accepted commands produce events.
pub trait Command: Send + Sync {
    type Aggregate: Aggregate;

    /// The aggregate this command targets.
    fn aggregate_id(&self) -> AggregateId;

    /// Command name used in logs and event metadata.
    fn command_type(&self) -> &'static str;
}

/// Context attached to a single command dispatch.
///
/// The correlation id ties together the log lines of a dispatch and the
/// events it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMetadata {
    pub correlation_id: Uuid,
    pub command_type: &'static str,
}

impl CommandMetadata {
    /// Starts a new dispatch for `command` with a fresh correlation id.
    pub fn for_command<C: Command>(command: &C) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            command_type: command.command_type(),
        }
    }

    /// Reuses the correlation id of an upstream request.
    pub fn correlated<C: Command>(command: &C, correlation_id: Uuid) -> Self {
        Self {
            correlation_id,
            command_type: command.command_type(),
        }
    }

    /// Entries stamped onto every envelope written by this dispatch.
    pub fn to_envelope_metadata(&self) -> HashMap<String, serde_json::Value> {
        HashMap::from([
            (
                CORRELATION_ID_KEY.to_string(),
                serde_json::Value::String(self.correlation_id.to_string()),
            ),
            (
                COMMAND_TYPE_KEY.to_string(),
                serde_json::Value::String(self.command_type.to_string()),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::food_cart::CreateFoodCart;

    #[test]
    fn metadata_carries_command_name() {
        let cmd = CreateFoodCart::new(AggregateId::new());
        let metadata = CommandMetadata::for_command(&cmd);
        assert_eq!(metadata.command_type, "CreateFoodCart");

        let entries = metadata.to_envelope_metadata();
        assert_eq!(
            entries.get(CORRELATION_ID_KEY),
            Some(&serde_json::json!(metadata.correlation_id.to_string()))
        );
        assert_eq!(
            entries.get(COMMAND_TYPE_KEY),
            Some(&serde_json::json!("CreateFoodCart"))
        );
    }

    #[test]
    fn correlated_keeps_upstream_id() {
        let upstream = Uuid::new_v4();
        let cmd = CreateFoodCart::new(AggregateId::new());
        let metadata = CommandMetadata::correlated(&cmd, upstream);
        assert_eq!(metadata.correlation_id, upstream);
    }

    #[test]
    fn fresh_dispatches_get_distinct_ids() {
        let cmd = CreateFoodCart::new(AggregateId::new());
        let a = CommandMetadata::for_command(&cmd);
        let b = CommandMetadata::for_command(&cmd);
        assert_ne!(a.correlation_id, b.correlation_id);
    }
}
