//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;

use crate::aggregate::Aggregate;

use super::{Money, OrderError, OrderEvent, OrderItem, OrderState, OrderStatus, ProductId, UserId};

/// Order aggregate root.
///
/// Command methods only decide: they check a guard against the current state
/// and return the event to record. State changes happen in `apply`, once the
/// event has been persisted.
#[derive(Debug, Clone, Default)]
pub struct Order {
    version: Version,
    state: OrderState,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type State = OrderState;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event, recorded_at: DateTime<Utc>) {
        let state = &mut self.state;
        match event {
            OrderEvent::OrderCreated { order_id, user_id } => {
                state.order_id = Some(order_id);
                state.user_id = Some(user_id);
                state.status = OrderStatus::Pending;
                state.items.clear();
                state.total_amount = Money::zero();
                state.created_at = Some(recorded_at);
            }
            OrderEvent::OrderItemAdded {
                product_id,
                quantity,
                unit_price,
            } => {
                let item = OrderItem::new(product_id, quantity, unit_price);
                state.total_amount += item.subtotal();
                state.items.push(item);
            }
            OrderEvent::OrderConfirmed => {
                state.status = OrderStatus::Confirmed;
                state.confirmed_at = Some(recorded_at);
            }
            OrderEvent::OrderShipped { tracking_number } => {
                state.status = OrderStatus::Shipped;
                state.tracking_number = Some(tracking_number);
                state.shipped_at = Some(recorded_at);
            }
            OrderEvent::OrderDelivered => {
                state.status = OrderStatus::Delivered;
                state.delivered_at = Some(recorded_at);
            }
            OrderEvent::OrderCancelled { reason } => {
                state.status = OrderStatus::Cancelled;
                state.cancel_reason = Some(reason);
                state.cancelled_at = Some(recorded_at);
            }
        }
    }

    fn state(&self) -> &OrderState {
        &self.state
    }

    fn restore(state: OrderState, version: Version) -> Self {
        Self { version, state }
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> Option<&AggregateId> {
        self.state.order_id.as_ref()
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.state.user_id.as_ref()
    }

    pub fn status(&self) -> OrderStatus {
        self.state.status
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.state.items
    }

    pub fn item_count(&self) -> usize {
        self.state.items.len()
    }

    pub fn total_quantity(&self) -> u32 {
        self.state.items.iter().map(|item| item.quantity).sum()
    }

    pub fn total_amount(&self) -> Money {
        self.state.total_amount
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.state.tracking_number.as_deref()
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.state.cancel_reason.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.status.is_terminal()
    }
}

// Command methods (return events)
impl Order {
    /// Opens the order. Only valid on an aggregate with no history.
    pub fn create_order(
        &self,
        order_id: AggregateId,
        user_id: UserId,
    ) -> Result<OrderEvent, OrderError> {
        if self.state.is_created() || self.version != Version::initial() {
            return Err(OrderError::AlreadyCreated);
        }

        Ok(OrderEvent::OrderCreated { order_id, user_id })
    }

    /// Adds an item line.
    ///
    /// There is deliberately no status guard: lines can still be added after
    /// the order has shipped, delivered or been cancelled.
    pub fn add_order_item(
        &self,
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
    ) -> Result<OrderEvent, OrderError> {
        self.ensure_created()?;

        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { quantity });
        }
        if unit_price.is_negative() {
            return Err(OrderError::InvalidPrice { price: unit_price });
        }
        let overflow = || OrderError::AmountOverflow {
            quantity,
            unit_price,
            total: self.state.total_amount,
        };
        let subtotal = unit_price.checked_times(quantity).ok_or_else(overflow)?;
        self.state
            .total_amount
            .checked_add(subtotal)
            .ok_or_else(overflow)?;

        Ok(OrderEvent::OrderItemAdded {
            product_id,
            quantity,
            unit_price,
        })
    }

    pub fn confirm_order(&self) -> Result<OrderEvent, OrderError> {
        self.ensure_transition(self.state.status.can_confirm(), "confirm")?;
        Ok(OrderEvent::OrderConfirmed)
    }

    pub fn ship_order(&self, tracking_number: impl Into<String>) -> Result<OrderEvent, OrderError> {
        self.ensure_transition(self.state.status.can_ship(), "ship")?;
        Ok(OrderEvent::OrderShipped {
            tracking_number: tracking_number.into(),
        })
    }

    pub fn deliver_order(&self) -> Result<OrderEvent, OrderError> {
        self.ensure_transition(self.state.status.can_deliver(), "deliver")?;
        Ok(OrderEvent::OrderDelivered)
    }

    pub fn cancel_order(&self, reason: impl Into<String>) -> Result<OrderEvent, OrderError> {
        self.ensure_transition(self.state.status.can_cancel(), "cancel")?;
        Ok(OrderEvent::OrderCancelled {
            reason: reason.into(),
        })
    }

    fn ensure_created(&self) -> Result<(), OrderError> {
        if self.state.is_created() {
            Ok(())
        } else {
            Err(OrderError::NotCreated)
        }
    }

    fn ensure_transition(&self, allowed: bool, action: &'static str) -> Result<(), OrderError> {
        self.ensure_created()?;
        if allowed {
            Ok(())
        } else {
            Err(OrderError::InvalidTransition {
                current_state: self.state.status,
                action,
            })
        }
    }
}
