//! The food cart aggregate.

use std::collections::HashMap;

use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, SnapshotCapable};

use super::{FoodCartError, FoodCartEvent, FoodCartId, FoodCartStatus, ProductId};

/// A shopping cart of products, rebuilt from its events.
///
/// `selected_products` only holds positive quantities; a product whose
/// quantity drops to zero is removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodCart {
    id: Option<FoodCartId>,
    #[serde(default)]
    version: Version,
    status: FoodCartStatus,
    selected_products: HashMap<ProductId, u32>,
}

impl FoodCart {
    pub fn status(&self) -> FoodCartStatus {
        self.status
    }

    pub fn selected_products(&self) -> &HashMap<ProductId, u32> {
        &self.selected_products
    }

    /// Selected quantity of a product, zero when absent.
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.selected_products.get(&product_id).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.selected_products.is_empty()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    // Decisions. Each validates against the current state and returns the
    // events to append; none of them mutate `self`.

    pub fn create(&self, food_cart_id: FoodCartId) -> Result<Vec<FoodCartEvent>, FoodCartError> {
        if !self.status.can_create() {
            return Err(FoodCartError::AlreadyExists);
        }
        Ok(vec![FoodCartEvent::food_cart_created(food_cart_id)])
    }

    pub fn select_product(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Vec<FoodCartEvent>, FoodCartError> {
        let id = self.require(FoodCartStatus::can_modify_products)?;
        let selected = self.quantity_of(product_id);
        if quantity == 0 || selected.checked_add(quantity).is_none() {
            return Err(FoodCartError::InvalidQuantity { quantity, selected });
        }
        Ok(vec![FoodCartEvent::product_selected(id, product_id, quantity)])
    }

    pub fn deselect_product(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Vec<FoodCartEvent>, FoodCartError> {
        let id = self.require(FoodCartStatus::can_modify_products)?;
        let selected = self.quantity_of(product_id);
        if quantity == 0 || quantity > selected {
            return Err(FoodCartError::InvalidQuantity { quantity, selected });
        }
        Ok(vec![FoodCartEvent::product_deselected(id, product_id, quantity)])
    }

    pub fn confirm_order(&self) -> Result<Vec<FoodCartEvent>, FoodCartError> {
        let id = self.require(FoodCartStatus::can_confirm)?;
        if self.is_empty() {
            return Err(FoodCartError::EmptyCart);
        }
        Ok(vec![FoodCartEvent::order_confirmed(id)])
    }

    /// Open and confirmed carts can both be deleted.
    pub fn delete(&self) -> Result<Vec<FoodCartEvent>, FoodCartError> {
        match (self.status, self.id) {
            (FoodCartStatus::Deleted, _) => Err(FoodCartError::AlreadyDeleted),
            (status, Some(id)) if status.can_delete() => {
                Ok(vec![FoodCartEvent::food_cart_deleted(id)])
            }
            _ => Err(FoodCartError::NotFound),
        }
    }

    fn require(&self, allowed: fn(&FoodCartStatus) -> bool) -> Result<FoodCartId, FoodCartError> {
        match self.id {
            Some(id) if allowed(&self.status) => Ok(id),
            _ => Err(FoodCartError::NotOpen {
                status: self.status,
            }),
        }
    }
}

impl Aggregate for FoodCart {
    type Event = FoodCartEvent;
    type Error = FoodCartError;

    fn aggregate_type() -> &'static str {
        "FoodCart"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: FoodCartEvent) {
        match event {
            FoodCartEvent::FoodCartCreated(data) => {
                self.id = Some(data.food_cart_id);
                self.status = FoodCartStatus::Open;
                self.selected_products.clear();
            }
            FoodCartEvent::ProductSelected(data) => {
                let qty = self.selected_products.entry(data.product_id).or_insert(0);
                *qty = qty.saturating_add(data.quantity);
            }
            FoodCartEvent::ProductDeselected(data) => {
                if let Some(qty) = self.selected_products.get_mut(&data.product_id) {
                    *qty = qty.saturating_sub(data.quantity);
                    if *qty == 0 {
                        self.selected_products.remove(&data.product_id);
                    }
                }
            }
            FoodCartEvent::OrderConfirmed(_) => {
                self.status = FoodCartStatus::Confirmed;
            }
            FoodCartEvent::FoodCartDeleted(_) => {
                self.status = FoodCartStatus::Deleted;
            }
        }
    }
}

impl SnapshotCapable for FoodCart {
    fn snapshot_interval() -> usize {
        5
    }
}
