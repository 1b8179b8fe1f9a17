//! Food cart aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;
mod value_objects;

pub use aggregate::FoodCart;
pub use commands::*;
pub use events::{
    FoodCartCreatedData, FoodCartDeletedData, FoodCartEvent, OrderConfirmedData,
    ProductDeselectedData, ProductSelectedData,
};
pub use service::FoodCartService;
pub use state::FoodCartStatus;
pub use value_objects::{FoodCartId, ProductId};

use thiserror::Error;

/// Reasons a food cart command is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FoodCartError {
    /// A cart with this id was already created.
    #[error("Food cart already exists")]
    AlreadyExists,

    /// Products can only change, and orders only be confirmed, while open.
    #[error("Food cart is not open (status: {status})")]
    NotOpen { status: FoodCartStatus },

    /// Zero, or more units than are currently selected.
    #[error("Invalid quantity: {quantity} (currently selected: {selected})")]
    InvalidQuantity { quantity: u32, selected: u32 },

    #[error("Cannot confirm an empty food cart")]
    EmptyCart,

    #[error("Food cart already deleted")]
    AlreadyDeleted,

    /// No cart was ever created under this id.
    #[error("Food cart not found")]
    NotFound,
}
