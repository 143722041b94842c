//! Order lifecycle and materialized state.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use super::{Money, OrderItem, UserId};

/// Where an order is in its lifecycle.
///
/// ```text
/// Pending ──► Confirmed ──► Shipped ──► Delivered
///    │            │            │
///    └────────────┴────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    /// Terminal.
    Delivered,
    /// Terminal.
    Cancelled,
}

impl OrderStatus {
    pub fn can_confirm(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    pub fn can_ship(&self) -> bool {
        matches!(self, OrderStatus::Confirmed)
    }

    pub fn can_deliver(&self) -> bool {
        matches!(self, OrderStatus::Shipped)
    }

    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Everything known about an order, as derived from its events.
///
/// This is also the snapshot format. The default value is the state of an
/// order that has no events yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderState {
    pub order_id: Option<AggregateId>,
    pub user_id: Option<UserId>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    pub tracking_number: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl OrderState {
    pub fn is_created(&self) -> bool {
        self.order_id.is_some()
    }
}
