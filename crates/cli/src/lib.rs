//! Audit tooling for the order event log.
//!
//! Seeds sample order lifecycles into an in-memory store and reports stream
//! validity, statistics and point-in-time views of every order.

pub mod audit;
pub mod config;

pub use audit::{AuditReport, OrderAudit, build_report, seed_orders};
pub use config::{Config, LogFormat};
