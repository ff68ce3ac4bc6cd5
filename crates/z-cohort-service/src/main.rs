//! z-cohort service binary.
//!
//! Reads [`ServiceConfig`] from the environment, opens the segment store and
//! serves the HTTP API until interrupted.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use z_cohort_service::{create_router, AppState, ServiceConfig};
use z_cohort_store::RocksStore;

const DEFAULT_LOG_FILTER: &str = "info,z_cohort=debug";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = ServiceConfig::from_env();
    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        seeded = config.distribution_seed.is_some(),
        "z-cohort starting"
    );

    let store = RocksStore::open(&config.data_dir)?;
    store.check()?;

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    let app = create_router(AppState::new(Arc::new(store), config));

    tracing::info!(local_addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("z-cohort stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
