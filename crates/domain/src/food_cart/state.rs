//! Food cart lifecycle.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a food cart.
///
/// ```text
/// NotCreated ──► Open ──► Confirmed ──┐
///                  │                  ├──► Deleted
///                  └──────────────────┘
/// ```
///
/// `Confirmed` and `Deleted` accept no product changes. A confirmed cart
/// can still be deleted; a deleted cart accepts nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FoodCartStatus {
    /// No creation event has been recorded for this id.
    #[default]
    NotCreated,

    /// Products can be selected and deselected.
    Open,

    /// The order was placed.
    Confirmed,

    /// The cart was discarded.
    Deleted,
}

impl FoodCartStatus {
    /// Returns true if a cart may be created from this status.
    pub fn can_create(&self) -> bool {
        matches!(self, FoodCartStatus::NotCreated)
    }

    /// Returns true if products can be selected or deselected.
    pub fn can_modify_products(&self) -> bool {
        matches!(self, FoodCartStatus::Open)
    }

    /// Returns true if the order can be confirmed.
    pub fn can_confirm(&self) -> bool {
        matches!(self, FoodCartStatus::Open)
    }

    /// Returns true if the cart exists and is not yet deleted.
    pub fn can_delete(&self) -> bool {
        matches!(self, FoodCartStatus::Open | FoodCartStatus::Confirmed)
    }

    /// Returns true once no further product changes are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FoodCartStatus::Confirmed | FoodCartStatus::Deleted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FoodCartStatus::NotCreated => "NotCreated",
            FoodCartStatus::Open => "Open",
            FoodCartStatus::Confirmed => "Confirmed",
            FoodCartStatus::Deleted => "Deleted",
        }
    }
}

impl std::fmt::Display for FoodCartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
