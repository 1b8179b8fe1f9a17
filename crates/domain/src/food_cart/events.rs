//! Food cart domain events.

use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{FoodCartId, ProductId};

/// Everything that can happen to a food cart.
///
/// Stored as `{"type": "<variant>", "data": {...}}`. Every variant is an
/// immutable value compared by content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FoodCartEvent {
    FoodCartCreated(FoodCartCreatedData),
    ProductSelected(ProductSelectedData),
    ProductDeselected(ProductDeselectedData),
    OrderConfirmed(OrderConfirmedData),
    FoodCartDeleted(FoodCartDeletedData),
}

impl DomainEvent for FoodCartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            FoodCartEvent::FoodCartCreated(_) => "FoodCartCreated",
            FoodCartEvent::ProductSelected(_) => "ProductSelected",
            FoodCartEvent::ProductDeselected(_) => "ProductDeselected",
            FoodCartEvent::OrderConfirmed(_) => "OrderConfirmed",
            FoodCartEvent::FoodCartDeleted(_) => "FoodCartDeleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodCartCreatedData {
    pub food_cart_id: FoodCartId,
}

/// `quantity` units of a product were added to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSelectedData {
    pub food_cart_id: FoodCartId,
    pub product_id: ProductId,

    /// Always positive.
    pub quantity: u32,
}

/// `quantity` units of a product were taken out of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDeselectedData {
    pub food_cart_id: FoodCartId,
    pub product_id: ProductId,

    /// Positive and never more than was selected when the event was produced.
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmedData {
    pub food_cart_id: FoodCartId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodCartDeletedData {
    pub food_cart_id: FoodCartId,
}

impl FoodCartEvent {
    pub fn food_cart_created(food_cart_id: FoodCartId) -> Self {
        FoodCartEvent::FoodCartCreated(FoodCartCreatedData { food_cart_id })
    }

    pub fn product_selected(food_cart_id: FoodCartId, product_id: ProductId, quantity: u32) -> Self {
        FoodCartEvent::ProductSelected(ProductSelectedData {
            food_cart_id,
            product_id,
            quantity,
        })
    }

    pub fn product_deselected(
        food_cart_id: FoodCartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Self {
        FoodCartEvent::ProductDeselected(ProductDeselectedData {
            food_cart_id,
            product_id,
            quantity,
        })
    }

    pub fn order_confirmed(food_cart_id: FoodCartId) -> Self {
        FoodCartEvent::OrderConfirmed(OrderConfirmedData { food_cart_id })
    }

    pub fn food_cart_deleted(food_cart_id: FoodCartId) -> Self {
        FoodCartEvent::FoodCartDeleted(FoodCartDeletedData { food_cart_id })
    }

    /// The cart every event refers to.
    pub fn food_cart_id(&self) -> FoodCartId {
        match self {
            FoodCartEvent::FoodCartCreated(d) => d.food_cart_id,
            FoodCartEvent::ProductSelected(d) => d.food_cart_id,
            FoodCartEvent::ProductDeselected(d) => d.food_cart_id,
            FoodCartEvent::OrderConfirmed(d) => d.food_cart_id,
            FoodCartEvent::FoodCartDeleted(d) => d.food_cart_id,
        }
    }
}
