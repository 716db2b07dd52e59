use actix::prelude::*;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod db;
mod domain;
mod counters;
mod actors;
mod metrics;
mod utils;

use actors::{CoordinatorActor, EdgeDispatcher, Shutdown};
use config::Config;
use counters::ScyllaCounterStore;
use domain::follow::FollowEdgeHandlers;

#[actix::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=follow_counters=trace cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,follow_counters=debug"))
        )
        .init();

    tracing::info!("🚀 Starting follow counter service");

    let config = Config::from_env()?;

    // === 1. Connect to ScyllaDB and apply schema ===
    tracing::info!(nodes = ?config.scylla_nodes, keyspace = %config.keyspace, "Connecting to ScyllaDB...");
    let session = db::connect(&config).await?;
    db::run_migrations(&session).await?;

    // === 2. Initialize Prometheus metrics ===
    tracing::info!("Initializing metrics");
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // Start metrics HTTP server in background thread
    let metrics_registry = Arc::new(metrics.registry().clone());
    let metrics_port = config.metrics_port;
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("Failed to build metrics runtime: {}", e);
                return;
            }
        };
        rt.block_on(async {
            if let Err(e) = metrics::start_metrics_server(metrics_registry, metrics_port).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    });

    // === 3. Wire counter handlers to the Scylla store ===
    let store = Arc::new(ScyllaCounterStore::new(session.clone()));
    let handlers = Arc::new(FollowEdgeHandlers::new(store));
    let dispatcher = Arc::new(EdgeDispatcher::new(
        handlers,
        config.dispatch_retry.clone(),
        metrics.clone(),
    ));

    // === 4. Start Coordinator Actor ===
    // The coordinator owns the CDC stream, the DLQ and the health monitor
    tracing::info!("Starting coordinator actor");
    let coordinator = CoordinatorActor::new(
        session.clone(),
        config.keyspace.clone(),
        config.cdc_start_lookback,
        dispatcher,
    )
    .start();

    tracing::info!("👂 Listening for follow edge changes, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down");
    if let Err(e) = coordinator.send(Shutdown).await? {
        tracing::error!("Coordinator shutdown failed: {}", e);
    }

    tracing::info!("👋 Follow counter service stopped");

    Ok(())
}
