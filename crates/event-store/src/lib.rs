//! Append-only, per-stream event log used by the food cart repository.
//!
//! The [`EventStore`] trait is the port the domain depends on; the
//! [`InMemoryEventStore`] adapter implements it with a compare-and-append
//! under a single write lock.

pub mod error;
pub mod event;
pub mod memory;
pub mod snapshot;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{
    COMMAND_TYPE_KEY, CORRELATION_ID_KEY, EventEnvelope, EventEnvelopeBuilder, EventId, Version,
};
pub use memory::InMemoryEventStore;
pub use snapshot::Snapshot;
pub use store::{EventStore, EventStoreExt, validate_events_for_append};
