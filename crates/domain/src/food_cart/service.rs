//! Food cart service providing a simplified API for cart operations.

use common::AggregateId;
use event_store::EventStore;
use tracing::Instrument;

use crate::command::{Command, CommandMetadata};
use crate::config::Config;
use crate::error::DomainError;
use crate::repository::{AggregateRepository, CommandResult, RetryPolicy};

use super::{
    ConfirmOrder, CreateFoodCart, DeleteFoodCart, DeselectProduct, FoodCart, FoodCartError,
    FoodCartEvent, SelectProduct,
};

/// Service for managing food carts.
///
/// Every command runs as its own load-decide-save cycle under a fresh
/// correlation id, retried on concurrency conflicts.
pub struct FoodCartService<S: EventStore> {
    repository: AggregateRepository<S, FoodCart>,
    retry_policy: RetryPolicy,
}

impl<S: EventStore> FoodCartService<S> {
    /// Creates a service with the default retry policy and snapshot interval.
    pub fn new(store: S) -> Self {
        Self {
            repository: AggregateRepository::with_default_snapshots(store),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn from_config(store: S, config: &Config) -> Self {
        Self {
            repository: AggregateRepository::new(store)
                .with_snapshot_interval(config.snapshot_interval),
            retry_policy: config.retry_policy(),
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repository(&self) -> &AggregateRepository<S, FoodCart> {
        &self.repository
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_food_cart(
        &self,
        cmd: CreateFoodCart,
    ) -> Result<CommandResult<FoodCart>, DomainError> {
        let food_cart_id = cmd.food_cart_id;
        self.dispatch(&cmd, move |cart| cart.create(food_cart_id))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn select_product(
        &self,
        cmd: SelectProduct,
    ) -> Result<CommandResult<FoodCart>, DomainError> {
        let (product_id, quantity) = (cmd.product_id, cmd.quantity);
        self.dispatch(&cmd, move |cart| cart.select_product(product_id, quantity))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn deselect_product(
        &self,
        cmd: DeselectProduct,
    ) -> Result<CommandResult<FoodCart>, DomainError> {
        let (product_id, quantity) = (cmd.product_id, cmd.quantity);
        self.dispatch(&cmd, move |cart| cart.deselect_product(product_id, quantity))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn confirm_order(
        &self,
        cmd: ConfirmOrder,
    ) -> Result<CommandResult<FoodCart>, DomainError> {
        self.dispatch(&cmd, FoodCart::confirm_order).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_food_cart(
        &self,
        cmd: DeleteFoodCart,
    ) -> Result<CommandResult<FoodCart>, DomainError> {
        self.dispatch(&cmd, FoodCart::delete).await
    }

    /// Loads a food cart by ID.
    ///
    /// Returns None if the cart was never created.
    #[tracing::instrument(skip(self))]
    pub async fn get_food_cart(
        &self,
        food_cart_id: AggregateId,
    ) -> Result<Option<FoodCart>, DomainError> {
        self.repository.load_existing(food_cart_id).await
    }

    async fn dispatch<C, F>(
        &self,
        command: &C,
        decide: F,
    ) -> Result<CommandResult<FoodCart>, DomainError>
    where
        C: Command<Aggregate = FoodCart>,
        F: Fn(&FoodCart) -> Result<Vec<FoodCartEvent>, FoodCartError>,
    {
        let metadata = CommandMetadata::for_command(command);
        let food_cart_id = command.aggregate_id();
        let span = tracing::info_span!(
            "command",
            command_type = metadata.command_type,
            correlation_id = %metadata.correlation_id,
            %food_cart_id
        );

        async {
            tracing::debug!("dispatching command");
            metrics::counter!("food_cart_commands_total", "command" => metadata.command_type)
                .increment(1);

            let result = self
                .repository
                .execute_with_retry(food_cart_id, &metadata, self.retry_policy, decide)
                .await;

            match &result {
                Ok(outcome) => tracing::info!(
                    version = %outcome.new_version,
                    events = outcome.events.len(),
                    "command handled"
                ),
                Err(DomainError::FoodCart(rejection)) => {
                    metrics::counter!(
                        "food_cart_commands_rejected_total",
                        "command" => metadata.command_type
                    )
                    .increment(1);
                    tracing::warn!(reason = %rejection, "command rejected");
                }
                Err(e) => tracing::error!(error = %e, "command failed"),
            }

            result
        }
        .instrument(span)
        .await
    }
}
