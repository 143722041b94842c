//! Order aggregate and related types.

mod aggregate;
mod events;
mod service;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use events::OrderEvent;
pub use service::OrderService;
pub use state::{OrderState, OrderStatus};
pub use value_objects::{Money, OrderItem, ProductId, UserId};

use thiserror::Error;

/// Reasons an order command is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// The command is not allowed from the order's current status.
    #[error("Invalid transition: cannot {action} a {current_state} order")]
    InvalidTransition {
        current_state: OrderStatus,
        action: &'static str,
    },

    #[error("Order already created")]
    AlreadyCreated,

    #[error("Order has not been created")]
    NotCreated,

    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    #[error("Invalid price: {price} (must not be negative)")]
    InvalidPrice { price: Money },

    /// The line subtotal or the new order total does not fit in `Money`.
    #[error("Amount overflow: {quantity} x {unit_price} added to {total}")]
    AmountOverflow {
        quantity: u32,
        unit_price: Money,
        total: Money,
    },
}
