//! Slide catalog worker entry point.

use catalog_worker::config::WorkerConfig;
use catalog_worker::error::AppError;
use catalog_worker::worker;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting slide catalog worker");

    let config = WorkerConfig::from_env()?;
    tracing::info!(
        max_connections = config.max_connections,
        interval = ?config.dispatcher.interval,
        batch_size = config.dispatcher.batch_size,
        "configuration loaded"
    );

    worker::run(config, worker::shutdown_signal()).await
}
