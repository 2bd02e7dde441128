//! reworkd - rework station lifecycle daemon.
//!
//! Tracks each physical rework station as an explicit state machine, gates
//! every state change through a fixed transition table, persists the
//! resulting status and publishes change notifications per station topic.

use reworkd_notify::TopicBus;
use reworkd_server::{run_http_server, Config};
use reworkd_station::ControllerFactory;
use reworkd_storage::JsonStationStore;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if REWORKD_CONFIG is set, then env overrides)
    let config = match Config::load() {
        Ok(c) => {
            if let Ok(path) = std::env::var("REWORKD_CONFIG") {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            // If a config file was explicitly specified, fail on error
            if std::env::var("REWORKD_CONFIG").is_ok() {
                tracing::error!("Failed to load config: {}", e);
                return Err(e.into());
            }
            tracing::info!("Using default configuration");
            Config::default()
        }
    };

    tracing::info!("Starting reworkd");
    tracing::info!("  Bind address: {}", config.network.bind_addr);
    tracing::info!("  Data directory: {}", config.storage.data_dir.display());
    tracing::info!("  Topic namespace: {}", config.notify.namespace);

    // Open the station store
    let stations_dir = config.storage.stations_dir();
    let store = Arc::new(JsonStationStore::open(&stations_dir)?);
    tracing::info!("  Station directory: {}", stations_dir.display());

    // Create the notification bus
    let bus = Arc::new(TopicBus::new(config.notify.channel_capacity));

    // Build the controller factory
    let factory = ControllerFactory::new(store, bus)
        .with_namespace(config.notify.namespace.clone())
        .with_kind(config.station.kind.clone());

    // Spawn shutdown signal handler
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping server...");
        let _ = shutdown_tx.send(());
    });

    // Run server (blocks until shutdown)
    run_http_server(config.network.bind_addr, factory, shutdown_rx).await?;

    tracing::info!("Server stopped");
    Ok(())
}
