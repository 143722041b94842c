//! Seeds sample orders and builds a report over the resulting event log.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use common::{AggregateId, ManualClock};
use domain::{Aggregate, DomainError, Money, OrderService, OrderStatus, ProductId, UserId};
use event_store::{EventStore, EventStoreExt, EventStoreStats, EventTypeStats, Version};
use futures_util::TryStreamExt;

/// The order as it looked right after one of its events.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub version: Version,
    pub event_type: String,
    pub status: OrderStatus,
    pub total: Money,
    pub items: usize,
}

#[derive(Debug, Clone)]
pub struct OrderAudit {
    pub order_id: AggregateId,
    pub status: OrderStatus,
    pub version: Version,
    pub total: Money,
    pub stream_valid: bool,
    pub snapshot_version: Option<Version>,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone)]
pub struct AuditReport {
    pub orders: Vec<OrderAudit>,
    /// Every event in the store as (timestamp, aggregate, version, type).
    pub timeline: Vec<(DateTime<Utc>, AggregateId, Version, String)>,
    pub stats: EventStoreStats,
    pub event_types: EventTypeStats,
}

/// Drives `count` orders through different lifecycles, moving `clock` one
/// minute forward before every command.
///
/// Order n gets n + 1 item lines and is confirmed; then every third order is
/// delivered, every third cancelled and the rest left confirmed.
pub async fn seed_orders<S: EventStore>(
    service: &OrderService<S>,
    clock: &ManualClock,
    count: usize,
) -> Result<Vec<AggregateId>, DomainError> {
    let tick = || clock.advance(Duration::minutes(1));
    let mut ids = Vec::with_capacity(count);

    for n in 0..count {
        let order_id = AggregateId::from(format!("order-{}", n + 1));
        tick();
        service
            .create_order(order_id.clone(), UserId::new(format!("user-{}", n % 2 + 1)))
            .await?;

        for line in 0..=n {
            tick();
            let price = Money::from_minor(100 * (line as i64 + 1));
            service
                .add_order_item(&order_id, ProductId::new(format!("sku-{line}")), 2, price)
                .await?;
        }

        tick();
        service.confirm_order(&order_id).await?;

        match n % 3 {
            0 => {
                tick();
                service
                    .ship_order(&order_id, format!("TRK-{}", n + 1))
                    .await?;
                tick();
                service.deliver_order(&order_id).await?;
            }
            1 => {
                tick();
                service
                    .cancel_order(&order_id, "customer changed mind".to_string())
                    .await?;
            }
            _ => {}
        }

        tracing::info!(%order_id, "sample order recorded");
        ids.push(order_id);
    }

    Ok(ids)
}

/// Audits one order: current state, stream validity and its state after each event.
pub async fn audit_order<S: EventStore>(
    service: &OrderService<S>,
    order_id: &AggregateId,
) -> Result<OrderAudit, DomainError> {
    let repository = service.repository();
    let store = repository.store();

    let current = repository.load_existing(order_id).await?;
    let stream_valid = store.validate_event_stream(order_id).await?;
    let snapshot_version = store.get_snapshot(order_id).await?.map(|s| s.version);

    let mut history = Vec::new();
    for event in store.get_events_for_aggregate(order_id).await? {
        let then = service.get_order_at(order_id, event.timestamp).await?;
        history.push(HistoryEntry {
            at: event.timestamp,
            version: then.version(),
            event_type: event.event_type,
            status: then.status(),
            total: then.total_amount(),
            items: then.item_count(),
        });
    }

    Ok(OrderAudit {
        order_id: order_id.clone(),
        status: current.status(),
        version: current.version(),
        total: current.total_amount(),
        stream_valid,
        snapshot_version,
        history,
    })
}

pub async fn build_report<S: EventStore>(
    service: &OrderService<S>,
    order_ids: &[AggregateId],
) -> Result<AuditReport, DomainError> {
    let mut orders = Vec::with_capacity(order_ids.len());
    for order_id in order_ids {
        orders.push(audit_order(service, order_id).await?);
    }

    let store = service.repository().store();
    let timeline: Vec<_> = store
        .stream_all_events()
        .await?
        .map_ok(|e| (e.timestamp, e.aggregate_id, e.version, e.event_type))
        .try_collect()
        .await?;

    Ok(AuditReport {
        orders,
        timeline,
        stats: store.stats().await?,
        event_types: store.event_type_stats().await?,
    })
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== Orders ==")?;
        for order in &self.orders {
            let snapshot = order
                .snapshot_version
                .map_or_else(|| "none".to_string(), |v| format!("v{v}"));
            writeln!(
                f,
                "{} {} v{} total {} stream {} snapshot {}",
                order.order_id,
                order.status,
                order.version,
                order.total,
                if order.stream_valid { "valid" } else { "INVALID" },
                snapshot,
            )?;
            for entry in &order.history {
                writeln!(
                    f,
                    "  {} v{:<3} {:<15} -> {:<9} items {:<2} total {}",
                    entry.at.to_rfc3339(),
                    entry.version,
                    entry.event_type,
                    entry.status,
                    entry.items,
                    entry.total,
                )?;
            }
        }

        writeln!(f, "\n== Timeline ==")?;
        for (at, aggregate_id, version, event_type) in &self.timeline {
            writeln!(f, "{} {aggregate_id} v{version} {event_type}", at.to_rfc3339())?;
        }

        writeln!(f, "\n== Statistics ==")?;
        writeln!(
            f,
            "aggregates {} events {} snapshots {} avg {:.2} events/aggregate",
            self.stats.aggregate_count,
            self.stats.total_events,
            self.stats.snapshot_count,
            self.stats.average_events_per_aggregate,
        )?;

        writeln!(f, "\n== Event types ==")?;
        for (event_type, count) in &self.event_types {
            writeln!(f, "{event_type:<15} {count}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use domain::{EventSourcedRepository, RepositoryConfig};
    use event_store::InMemoryEventStore;
    use std::sync::Arc;

    fn setup(snapshot_interval: u64) -> (OrderService<InMemoryEventStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        ));
        let repository = EventSourcedRepository::with_config(
            InMemoryEventStore::new(),
            RepositoryConfig::with_snapshot_interval(snapshot_interval),
        )
        .with_clock(clock.clone());
        (OrderService::from_repository(repository), clock)
    }

    #[tokio::test]
    async fn seeded_orders_end_in_expected_states() {
        let (service, clock) = setup(10);
        let ids = seed_orders(&service, &clock, 3).await.unwrap();

        let report = build_report(&service, &ids).await.unwrap();
        let statuses: Vec<_> = report.orders.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                OrderStatus::Delivered,
                OrderStatus::Cancelled,
                OrderStatus::Confirmed
            ]
        );
        assert!(report.orders.iter().all(|o| o.stream_valid));

        // 1 item line at 2 x 1.00
        assert_eq!(report.orders[0].total, Money::from_minor(200));
        // 3 item lines at 2 x (1.00 + 2.00 + 3.00)
        assert_eq!(report.orders[2].total, Money::from_minor(1200));
    }

    #[tokio::test]
    async fn history_replays_each_step() {
        let (service, clock) = setup(10);
        let ids = seed_orders(&service, &clock, 1).await.unwrap();

        let audit = audit_order(&service, &ids[0]).await.unwrap();
        let steps: Vec<_> = audit
            .history
            .iter()
            .map(|h| (h.event_type.as_str(), h.status))
            .collect();

        assert_eq!(
            steps,
            vec![
                ("OrderCreated", OrderStatus::Pending),
                ("OrderItemAdded", OrderStatus::Pending),
                ("OrderConfirmed", OrderStatus::Confirmed),
                ("OrderShipped", OrderStatus::Shipped),
                ("OrderDelivered", OrderStatus::Delivered),
            ]
        );
        assert_eq!(audit.history[4].version, Version::new(5));
    }

    #[tokio::test]
    async fn report_totals_match_the_store() {
        let (service, clock) = setup(3);
        let ids = seed_orders(&service, &clock, 4).await.unwrap();

        let report = build_report(&service, &ids).await.unwrap();

        let total: usize = report.event_types.values().sum();
        assert_eq!(total, report.stats.total_events);
        assert_eq!(report.timeline.len(), report.stats.total_events);
        assert_eq!(report.stats.aggregate_count, 4);
        assert_eq!(report.event_types.get("OrderCreated"), Some(&4));
        assert!(report.stats.snapshot_count > 0);
        assert!(report.timeline.windows(2).all(|w| w[0].0 <= w[1].0));

        let rendered = report.to_string();
        assert!(rendered.contains("order-1 Delivered"));
        assert!(rendered.contains("== Event types =="));
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let (service, _clock) = setup(10);
        let result = audit_order(&service, &AggregateId::from("nope")).await;
        assert!(matches!(result, Err(DomainError::AggregateNotFound { .. })));
    }
}
