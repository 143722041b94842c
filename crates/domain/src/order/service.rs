//! Order service providing a simplified API for order operations.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::EventStore;

use crate::error::DomainError;
use crate::repository::{CommandResult, EventSourcedRepository};

use super::{Money, Order, OrderItem, ProductId, UserId};

/// Service for managing orders.
///
/// Each method reconstructs the order, runs one command against it and
/// persists the resulting event through the repository.
pub struct OrderService<S: EventStore> {
    repository: EventSourcedRepository<S, Order>,
}

impl<S: EventStore> OrderService<S> {
    /// Creates a new order service with the given event store and default settings.
    pub fn new(store: S) -> Self {
        Self::from_repository(EventSourcedRepository::new(store))
    }

    pub fn from_repository(repository: EventSourcedRepository<S, Order>) -> Self {
        Self { repository }
    }

    /// Returns a reference to the underlying repository.
    pub fn repository(&self) -> &EventSourcedRepository<S, Order> {
        &self.repository
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_order(
        &self,
        order_id: AggregateId,
        user_id: UserId,
    ) -> Result<CommandResult<Order>, DomainError> {
        let id = order_id.clone();
        self.repository
            .execute(&id, |order| order.create_order(order_id, user_id))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_order_item(
        &self,
        order_id: &AggregateId,
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.repository
            .execute(order_id, |order| {
                order.add_order_item(product_id, quantity, unit_price)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn confirm_order(
        &self,
        order_id: &AggregateId,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.repository
            .execute(order_id, |order| order.confirm_order())
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn ship_order(
        &self,
        order_id: &AggregateId,
        tracking_number: String,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.repository
            .execute(order_id, |order| order.ship_order(tracking_number))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn deliver_order(
        &self,
        order_id: &AggregateId,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.repository
            .execute(order_id, |order| order.deliver_order())
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        order_id: &AggregateId,
        reason: String,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.repository
            .execute(order_id, |order| order.cancel_order(reason))
            .await
    }

    /// Loads an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: &AggregateId) -> Result<Option<Order>, DomainError> {
        self.repository.find(order_id).await
    }

    /// The order as it was at `at`. Before its first event this is an empty,
    /// uncreated order.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_at(
        &self,
        order_id: &AggregateId,
        at: DateTime<Utc>,
    ) -> Result<Order, DomainError> {
        self.repository.reconstruct_at(order_id, at).await
    }

    /// Creates an order and adds items in sequence, one event per item.
    pub async fn create_order_with_items(
        &self,
        order_id: AggregateId,
        user_id: UserId,
        items: Vec<OrderItem>,
    ) -> Result<CommandResult<Order>, DomainError> {
        let mut result = self.create_order(order_id.clone(), user_id).await?;
        for item in items {
            result = self
                .add_order_item(&order_id, item.product_id, item.quantity, item.unit_price)
                .await?;
        }
        Ok(result)
    }
}
