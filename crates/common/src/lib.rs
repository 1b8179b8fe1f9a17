//! Identity types shared by the event store and the domain crates.

mod types;

pub use types::{AggregateId, ParseAggregateIdError};
