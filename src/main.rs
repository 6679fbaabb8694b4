use actix::prelude::*;
use anyhow::Context as _;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod actors;
mod catalog;
mod config;
mod domain;
mod messaging;
mod metrics;
mod store;
mod utils;

#[cfg(test)]
mod testing;

use actors::OrdersActor;
use catalog::ProductResolver;
use config::{AppConfig, StoreBackend};
use domain::order::OrderWorkflow;
use messaging::{OrderCommandListener, RedpandaCatalogClient, RedpandaClient};
use store::{InMemoryOrderStore, OrderStore, PgOrderStore};

const PRODUCER_SEND_TIMEOUT: Duration = Duration::from_secs(5);

#[actix::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default filter, e.g. RUST_LOG=debug
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,orders_ms=debug")),
        )
        .init();

    tracing::info!("🚀 Starting orders microservice");

    let config = AppConfig::from_env().context("Invalid configuration")?;

    // === 1. Order store ===
    let store: Arc<dyn OrderStore> = match &config.store {
        StoreBackend::Postgres {
            database_url,
            max_connections,
        } => {
            tracing::info!("Connecting to Postgres...");
            let store = PgOrderStore::connect(database_url, *max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            store
                .ensure_schema()
                .await
                .context("Failed to prepare order tables")?;
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory order store, orders are lost on restart");
            Arc::new(InMemoryOrderStore::new())
        }
    };

    // === 2. Metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 3. Redpanda producer (with circuit breaker) ===
    let redpanda = Arc::new(RedpandaClient::new(
        &config.kafka_brokers,
        PRODUCER_SEND_TIMEOUT,
        metrics.clone(),
    )?);

    // === 4. Product catalog over request/reply ===
    let catalog = RedpandaCatalogClient::new(
        redpanda.clone(),
        config.catalog_request_topic.clone(),
        config.catalog_reply_topic.clone(),
        config.catalog_timeout,
    );
    let _reply_listener = catalog.start_reply_listener(&config.kafka_brokers, &config.kafka_group_id)?;

    let resolver = ProductResolver::new(Arc::new(catalog), metrics.clone());
    let workflow = Arc::new(OrderWorkflow::new(store, resolver, metrics.clone()));

    // === 5. Orders actor + inbound command listener ===
    let orders = OrdersActor::new(workflow).start();

    let listener = OrderCommandListener::new(
        &config.kafka_brokers,
        &config.kafka_group_id,
        &config.orders_command_topic,
        redpanda.clone(),
        orders,
    )?;
    actix::spawn(listener.run());

    // === 6. Metrics + health endpoint ===
    let metrics_port = config.metrics_port;
    actix::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(metrics, redpanda, metrics_port).await {
            tracing::error!("Metrics server error: {}", e);
        }
    });

    tracing::info!(
        topic = %config.orders_command_topic,
        "✅ Orders microservice ready"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("👋 Shutting down");

    Ok(())
}
