//! Domain layer for the event-sourced order system.
//!
//! This crate provides:
//! - `Aggregate` and `DomainEvent` traits for event-sourced entities
//! - `EventSourcedRepository` for saving with snapshots, replay and time travel
//! - The order aggregate with its state machine, and `OrderService`

pub mod aggregate;
pub mod config;
pub mod error;
pub mod order;
pub mod repository;

pub use aggregate::{Aggregate, DomainEvent, decode_event, replay};
pub use config::RepositoryConfig;
pub use error::DomainError;
pub use order::{
    Money, Order, OrderError, OrderEvent, OrderItem, OrderService, OrderState, OrderStatus,
    ProductId, UserId,
};
pub use repository::{CommandResult, EventSourcedRepository};
