//! Domain error types.

use event_store::EventStoreError;
use thiserror::Error;

use crate::food_cart::FoodCartError;

/// Errors returned by the repository and the food cart service.
///
/// Rejections (`FoodCart`) leave the stream untouched. A concurrency
/// conflict means the load-decide-save cycle ran on stale state and may be
/// retried; everything else is an infrastructure failure.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Food cart rejected command: {0}")]
    FoodCart(#[from] FoodCartError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true when the failure was a lost optimistic-concurrency race.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, DomainError::EventStore(e) if e.is_concurrency_conflict())
    }

    /// Returns the domain rejection, if this error is one.
    pub fn as_rejection(&self) -> Option<&FoodCartError> {
        match self {
            DomainError::FoodCart(e) => Some(e),
            _ => None,
        }
    }
}
