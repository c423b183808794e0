//! Workshop retention service - scheduled and admin-triggered data retention

use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use workshop_retention::config::{Config, StoreBackend};
use workshop_retention::db::Database;
use workshop_retention::routes;
use workshop_retention::state::AppState;
use workshop_retention::store::{DocumentStore, MemoryStore};
use workshop_retention::tasks::retention;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "workshop_retention=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration
    let config = Config::from_env()?;

    // Connect to the document store
    let store: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let db = match Database::new(&config.database_url).await {
                Ok(db) => db,
                Err(e) => {
                    error!(error = %e, "Failed to connect to database");
                    std::process::exit(1);
                }
            };
            db.ensure_schema().await?;
            info!(
                "Database: {}",
                config.database_url.split('@').last().unwrap_or("***")
            );
            Arc::new(db)
        }
        StoreBackend::Memory => {
            info!("Using in-memory document store");
            Arc::new(MemoryStore::new())
        }
    };

    // Create application state
    let state = AppState::new(store, config.retention.clone());

    // Scheduled retention cleanup
    let engine = Arc::clone(&state.engine);
    tokio::spawn(async move {
        retention::retention_task(engine).await;
    });

    let app = routes::router(state);

    info!(
        "Workshop retention v{} starting on {}",
        env!("CARGO_PKG_VERSION"),
        config.listen_addr
    );
    info!(
        retention_days = config.retention.retention_days,
        batch_size = config.retention.batch_size,
        "Retention configured"
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
