//! Worker wiring: pool, migrations, handler registration and the dispatcher
//! lifecycle.

use std::future::Future;
use std::sync::Arc;

use catalog_core::clock::{Clock, SystemClock};
use catalog_slides::application::catalog::Catalog;
use catalog_slides::application::handlers::{EventHandler, HandlerRegistry};
use catalog_slides::domain::events::EventType;
use catalog_store::{PgCaseProjector, PgCatalogStore};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

use crate::config::WorkerConfig;
use crate::error::AppError;

/// Handlers the worker dispatches to: the case projection for every event
/// type.
#[must_use]
pub fn handler_registry(pool: &PgPool) -> HandlerRegistry {
    let projector: Arc<dyn EventHandler> = Arc::new(PgCaseProjector::new(pool.clone()));

    EventType::ALL
        .into_iter()
        .fold(HandlerRegistry::builder(), |builder, event_type| {
            builder.register(event_type, Arc::clone(&projector))
        })
        .build()
}

/// Opens the connection pool, failing fast if the database is unreachable.
///
/// # Errors
///
/// Returns `AppError::Database` if no connection can be established.
pub async fn connect(config: &WorkerConfig) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}

/// Runs the dispatcher until `shutdown` resolves, then stops it and waits
/// for the in-flight tick.
///
/// # Errors
///
/// Returns `AppError::Database` or `AppError::Migrate` if start-up fails.
pub async fn run<F>(config: WorkerConfig, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()>,
{
    let pool = connect(&config).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;
    info!("database migrations applied");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let catalog = Catalog::new(Arc::new(PgCatalogStore::new(pool.clone())), clock);
    let registry = handler_registry(&pool);
    info!(?registry, "handlers registered");

    let handle = catalog.start_dispatcher(registry, config.dispatcher);

    shutdown.await;
    info!("shutdown requested, stopping dispatcher");
    handle.shutdown().await;
    pool.close().await;

    info!("worker stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or on SIGTERM where supported.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl-C"),
        () = terminate => info!("received SIGTERM"),
    }
}
