//! Order domain events.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{Money, ProductId, UserId};

/// Everything that can happen to an order.
///
/// Serialized with a `type` discriminant next to primitive fields, e.g.
/// `{"type":"OrderShipped","tracking_number":"TRK1"}`. When and in which
/// order it happened lives on the envelope, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OrderEvent {
    OrderCreated {
        order_id: AggregateId,
        user_id: UserId,
    },

    OrderItemAdded {
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
    },

    OrderConfirmed,

    OrderShipped {
        tracking_number: String,
    },

    OrderDelivered,

    OrderCancelled {
        reason: String,
    },
}

impl DomainEvent for OrderEvent {
    const EVENT_TYPES: &'static [&'static str] = &[
        "OrderCreated",
        "OrderItemAdded",
        "OrderConfirmed",
        "OrderShipped",
        "OrderDelivered",
        "OrderCancelled",
    ];

    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated { .. } => "OrderCreated",
            OrderEvent::OrderItemAdded { .. } => "OrderItemAdded",
            OrderEvent::OrderConfirmed => "OrderConfirmed",
            OrderEvent::OrderShipped { .. } => "OrderShipped",
            OrderEvent::OrderDelivered => "OrderDelivered",
            OrderEvent::OrderCancelled { .. } => "OrderCancelled",
        }
    }
}
