//! Food cart commands.

use common::AggregateId;

use crate::command::Command;

use super::{FoodCart, FoodCartId, ProductId};

/// Command to open a new food cart.
#[derive(Debug, Clone)]
pub struct CreateFoodCart {
    pub food_cart_id: FoodCartId,
}

impl CreateFoodCart {
    pub fn new(food_cart_id: FoodCartId) -> Self {
        Self { food_cart_id }
    }

    /// Creates the command with a freshly generated cart id.
    pub fn generate() -> Self {
        Self {
            food_cart_id: FoodCartId::new(),
        }
    }
}

impl Command for CreateFoodCart {
    type Aggregate = FoodCart;

    fn aggregate_id(&self) -> AggregateId {
        self.food_cart_id
    }

    fn command_type(&self) -> &'static str {
        "CreateFoodCart"
    }
}

/// Command to add units of a product to a cart.
#[derive(Debug, Clone)]
pub struct SelectProduct {
    pub food_cart_id: FoodCartId,
    pub product_id: ProductId,
    pub quantity: u32,
}

impl SelectProduct {
    pub fn new(food_cart_id: FoodCartId, product_id: ProductId, quantity: u32) -> Self {
        Self {
            food_cart_id,
            product_id,
            quantity,
        }
    }
}

impl Command for SelectProduct {
    type Aggregate = FoodCart;

    fn aggregate_id(&self) -> AggregateId {
        self.food_cart_id
    }

    fn command_type(&self) -> &'static str {
        "SelectProduct"
    }
}

/// Command to take units of a product out of a cart.
#[derive(Debug, Clone)]
pub struct DeselectProduct {
    pub food_cart_id: FoodCartId,
    pub product_id: ProductId,
    pub quantity: u32,
}

impl DeselectProduct {
    pub fn new(food_cart_id: FoodCartId, product_id: ProductId, quantity: u32) -> Self {
        Self {
            food_cart_id,
            product_id,
            quantity,
        }
    }
}

impl Command for DeselectProduct {
    type Aggregate = FoodCart;

    fn aggregate_id(&self) -> AggregateId {
        self.food_cart_id
    }

    fn command_type(&self) -> &'static str {
        "DeselectProduct"
    }
}

/// Command to place the order for everything in the cart.
#[derive(Debug, Clone)]
pub struct ConfirmOrder {
    pub food_cart_id: FoodCartId,
}

impl ConfirmOrder {
    pub fn new(food_cart_id: FoodCartId) -> Self {
        Self { food_cart_id }
    }
}

impl Command for ConfirmOrder {
    type Aggregate = FoodCart;

    fn aggregate_id(&self) -> AggregateId {
        self.food_cart_id
    }

    fn command_type(&self) -> &'static str {
        "ConfirmOrder"
    }
}

/// Command to discard a cart.
#[derive(Debug, Clone)]
pub struct DeleteFoodCart {
    pub food_cart_id: FoodCartId,
}

impl DeleteFoodCart {
    pub fn new(food_cart_id: FoodCartId) -> Self {
        Self { food_cart_id }
    }
}

impl Command for DeleteFoodCart {
    type Aggregate = FoodCart;

    fn aggregate_id(&self) -> AggregateId {
        self.food_cart_id
    }

    fn command_type(&self) -> &'static str {
        "DeleteFoodCart"
    }
}
