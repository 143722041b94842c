//! Order audit entry point.

use std::sync::Arc;

use chrono::Utc;
use cli::{Config, LogFormat};
use common::ManualClock;
use domain::{EventSourcedRepository, OrderService, RepositoryConfig};
use event_store::InMemoryEventStore;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so the report on stdout stays clean.
    match config.log_format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Configuration and tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 3. Store, repository and a clock the seeding controls
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let repository = EventSourcedRepository::with_config(
        InMemoryEventStore::new(),
        RepositoryConfig::with_snapshot_interval(config.snapshot_interval),
    )
    .with_clock(clock.clone());
    let service = OrderService::from_repository(repository);

    // 4. Replay sample lifecycles and report
    tracing::info!(orders = config.orders, snapshot_interval = config.snapshot_interval, "seeding sample orders");
    let order_ids = cli::seed_orders(&service, &clock, config.orders).await?;
    let report = cli::build_report(&service, &order_ids).await?;

    println!("{report}");
    println!("== Metrics ==");
    println!("{}", metrics_handle.render());

    Ok(())
}
