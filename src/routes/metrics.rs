//! Prometheus metrics endpoint

use axum::response::IntoResponse;
use std::sync::atomic::{AtomicU64, Ordering};

/// Retention counters exposed to Prometheus
#[derive(Default)]
pub struct Metrics {
    /// Interactive cleanups that passed authorization
    manual_runs_total: AtomicU64,
    /// Scheduled cleanups started
    scheduled_runs_total: AtomicU64,
    /// Cleanups of either kind that ended in an error
    runs_failed_total: AtomicU64,
    /// Records deleted from flat collections
    records_deleted_total: AtomicU64,
    /// Activity records archived and deleted
    activities_archived_total: AtomicU64,
    /// Monthly summaries written or merged
    summaries_written_total: AtomicU64,
    /// Interactive calls rejected as unauthenticated or unauthorized
    auth_rejections_total: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_manual_runs(&self) {
        self.manual_runs_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_scheduled_runs(&self) {
        self.scheduled_runs_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed_runs(&self) {
        self.runs_failed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_deleted(&self, count: u64) {
        self.records_deleted_total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_archived(&self, count: u64) {
        self.activities_archived_total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_summaries(&self, count: u64) {
        self.summaries_written_total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_auth_rejections(&self) {
        self.auth_rejections_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            manual_runs_total: self.manual_runs_total.load(Ordering::Relaxed),
            scheduled_runs_total: self.scheduled_runs_total.load(Ordering::Relaxed),
            runs_failed_total: self.runs_failed_total.load(Ordering::Relaxed),
            records_deleted_total: self.records_deleted_total.load(Ordering::Relaxed),
            activities_archived_total: self.activities_archived_total.load(Ordering::Relaxed),
            summaries_written_total: self.summaries_written_total.load(Ordering::Relaxed),
            auth_rejections_total: self.auth_rejections_total.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
pub struct MetricsSnapshot {
    pub manual_runs_total: u64,
    pub scheduled_runs_total: u64,
    pub runs_failed_total: u64,
    pub records_deleted_total: u64,
    pub activities_archived_total: u64,
    pub summaries_written_total: u64,
    pub auth_rejections_total: u64,
}

impl MetricsSnapshot {
    /// Render in the Prometheus text exposition format
    pub fn render(&self) -> String {
        format!(
            r#"# HELP retention_manual_runs_total Total number of authorized manual cleanups
# TYPE retention_manual_runs_total counter
retention_manual_runs_total {}

# HELP retention_scheduled_runs_total Total number of scheduled cleanups
# TYPE retention_scheduled_runs_total counter
retention_scheduled_runs_total {}

# HELP retention_runs_failed_total Total number of cleanups that failed
# TYPE retention_runs_failed_total counter
retention_runs_failed_total {}

# HELP retention_records_deleted_total Total number of records purged from flat collections
# TYPE retention_records_deleted_total counter
retention_records_deleted_total {}

# HELP retention_activities_archived_total Total number of user activities archived and deleted
# TYPE retention_activities_archived_total counter
retention_activities_archived_total {}

# HELP retention_summaries_written_total Total number of monthly activity summaries written
# TYPE retention_summaries_written_total counter
retention_summaries_written_total {}

# HELP retention_auth_rejections_total Total number of rejected manual cleanup calls
# TYPE retention_auth_rejections_total counter
retention_auth_rejections_total {}

# HELP retention_info Build information
# TYPE retention_info gauge
retention_info{{version="{}"}} 1
"#,
            self.manual_runs_total,
            self.scheduled_runs_total,
            self.runs_failed_total,
            self.records_deleted_total,
            self.activities_archived_total,
            self.summaries_written_total,
            self.auth_rejections_total,
            env!("CARGO_PKG_VERSION"),
        )
    }
}

/// GET /metrics
///
/// Returns Prometheus-format metrics
pub async fn prometheus_metrics(
    axum::extract::State(state): axum::extract::State<crate::state::AppState>,
) -> impl IntoResponse {
    let output = state.metrics.get_metrics().render();

    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        output,
    )
}
