//! Retention task - scheduled data retention cleanup

use crate::retention::{run_scheduled_cleanup, RetentionEngine};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Background task that runs the scheduled retention cleanup.
///
/// Waits `startup_delay`, then runs once per configured interval (24h by
/// default). Failures are logged by the cleanup itself; the task never exits.
pub async fn retention_task(engine: Arc<RetentionEngine>) {
    let config = engine.config();

    // Let the rest of the service come up before the first run
    tokio::time::sleep(config.startup_delay).await;

    let mut interval = tokio::time::interval(config.interval);

    info!(
        interval_hours = config.interval.as_secs() / 3600,
        retention_days = config.retention_days,
        batch_size = config.batch_size,
        "Retention task started"
    );

    loop {
        interval.tick().await;

        info!("Running scheduled retention cleanup...");
        run_scheduled_cleanup(&engine, Utc::now()).await;
    }
}
