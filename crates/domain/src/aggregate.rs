//! Core aggregate and domain event traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// A fact that happened to an aggregate.
///
/// Events are immutable values named in the past tense. They are stored as
/// a tagged union, so `event_type` must match the serialized tag.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Name of the event variant, used as the envelope's `event_type`.
    fn event_type(&self) -> &'static str;
}

/// An event-sourced consistency boundary.
///
/// State is never stored directly; it is rebuilt by folding the aggregate's
/// event stream through [`Aggregate::apply`], starting from `Default`.
pub trait Aggregate: Default + Send + Sync + Sized {
    type Event: DomainEvent;

    /// Rejection returned when a command is invalid for the current state.
    type Error: std::error::Error + Send + Sync;

    /// Aggregate kind recorded on every envelope.
    fn aggregate_type() -> &'static str;

    /// Identity, or `None` while no creation event has been applied.
    fn id(&self) -> Option<AggregateId>;

    /// Number of events folded into this state.
    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    /// Folds one event into the state.
    ///
    /// Must be total, pure and deterministic. Illegal transitions are
    /// rejected before events are produced, never here.
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

/// Aggregates whose state can be captured in a snapshot.
pub trait SnapshotCapable: Aggregate + Serialize + DeserializeOwned {
    /// Number of events between snapshots.
    fn snapshot_interval() -> usize {
        100
    }
}

/// Returns true when moving from `previous` to `current` passes a multiple of
/// `interval`. An interval of zero never triggers.
pub fn crosses_snapshot_boundary(previous: Version, current: Version, interval: usize) -> bool {
    if interval == 0 || current <= previous {
        return false;
    }
    let interval = interval as i64;
    current.as_i64() / interval > previous.as_i64() / interval
}
