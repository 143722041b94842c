use chrono::{Duration, TimeZone, Utc};
use common::AggregateId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    DomainEvent, EventSourcedRepository, Money, Order, OrderEvent, OrderService, ProductId,
    RepositoryConfig, UserId,
};
use event_store::{AppendOptions, EventEnvelope, InMemoryEventStore, Version, store::EventStore};

fn make_envelope(aggregate_id: &AggregateId, version: i64, event: &OrderEvent) -> EventEnvelope {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    EventEnvelope::builder()
        .aggregate_id(aggregate_id.clone())
        .aggregate_type("Order")
        .event_type(event.event_type())
        .version(Version::new(version))
        .timestamp(start + Duration::seconds(version))
        .payload(event)
        .unwrap()
        .build()
        .unwrap()
}

/// A store holding one order with `events` events: a create followed by item lines.
fn populated(rt: &tokio::runtime::Runtime, events: i64) -> (InMemoryEventStore, AggregateId) {
    let store = InMemoryEventStore::new();
    let agg_id = AggregateId::new();

    rt.block_on(async {
        let created = OrderEvent::OrderCreated {
            order_id: agg_id.clone(),
            user_id: UserId::new("bench"),
        };
        let mut batch = vec![make_envelope(&agg_id, 1, &created)];
        for v in 2..=events {
            let added = OrderEvent::OrderItemAdded {
                product_id: ProductId::new(format!("SKU-{v:03}")),
                quantity: 1,
                unit_price: Money::from_minor(100 * v),
            };
            batch.push(make_envelope(&agg_id, v, &added));
        }
        store.append(batch, AppendOptions::new()).await.unwrap();
    });

    (store, agg_id)
}

fn bench_create_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/create_order", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = OrderService::new(InMemoryEventStore::new());
                service
                    .create_order(AggregateId::new(), UserId::new("bench"))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_full_lifecycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/create_add_confirm_ship_deliver", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = OrderService::new(InMemoryEventStore::new());
                let order_id = AggregateId::new();
                service
                    .create_order(order_id.clone(), UserId::new("bench"))
                    .await
                    .unwrap();
                service
                    .add_order_item(&order_id, ProductId::new("SKU-001"), 2, Money::from_minor(1000))
                    .await
                    .unwrap();
                service.confirm_order(&order_id).await.unwrap();
                service
                    .ship_order(&order_id, "TRK-BENCH".to_string())
                    .await
                    .unwrap();
                service.deliver_order(&order_id).await.unwrap();
            });
        });
    });
}

fn bench_reconstruct(c: &mut Criterion, events: i64, snapshot_interval: u64, name: &str) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, agg_id) = populated(&rt, events);
    let repository: EventSourcedRepository<_, Order> = EventSourcedRepository::with_config(
        store,
        RepositoryConfig::with_snapshot_interval(snapshot_interval),
    );
    if snapshot_interval > 0 {
        let at = Version::new(events - events % snapshot_interval as i64);
        rt.block_on(repository.create_snapshot(&agg_id, at)).unwrap();
    }

    c.bench_function(name, |b| {
        b.iter(|| {
            rt.block_on(async {
                repository.reconstruct(&agg_id).await.unwrap();
            });
        });
    });
}

fn bench_reconstruct_100(c: &mut Criterion) {
    bench_reconstruct(c, 100, 0, "domain/reconstruct_100_events");
}

fn bench_reconstruct_100_with_snapshot(c: &mut Criterion) {
    bench_reconstruct(c, 105, 10, "domain/reconstruct_105_events_snapshot_at_100");
}

fn bench_reconstruct_at(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, agg_id) = populated(&rt, 100);
    let repository: EventSourcedRepository<_, Order> = EventSourcedRepository::new(store);
    let midpoint = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 50).unwrap();

    c.bench_function("domain/reconstruct_at_midpoint_of_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                repository.reconstruct_at(&agg_id, midpoint).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_create_order,
    bench_full_lifecycle,
    bench_reconstruct_100,
    bench_reconstruct_100_with_snapshot,
    bench_reconstruct_at,
);
criterion_main!(benches);
