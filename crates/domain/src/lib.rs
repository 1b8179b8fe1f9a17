//! Domain layer for the food cart engine.
//!
//! This crate provides:
//! - Aggregate and DomainEvent traits for event-sourced entities
//! - An aggregate repository with optimistic concurrency, retries and snapshots
//! - The FoodCart aggregate, its commands and a command service
//! - Environment configuration and tracing setup

pub mod aggregate;
pub mod command;
pub mod config;
pub mod error;
pub mod food_cart;
pub mod repository;
pub mod telemetry;

pub use aggregate::{Aggregate, DomainEvent, SnapshotCapable};
pub use command::{Command, CommandMetadata};
pub use config::{Config, LogFormat};
pub use error::DomainError;
pub use food_cart::{
    ConfirmOrder, CreateFoodCart, DeleteFoodCart, DeselectProduct, FoodCart, FoodCartError,
    FoodCartEvent, FoodCartId, FoodCartService, FoodCartStatus, ProductId, SelectProduct,
};
pub use repository::{AggregateRepository, CommandResult, RetryPolicy};
pub use telemetry::init_tracing;
