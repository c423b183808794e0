//! Interactive and scheduled entry points into the retention engine

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::RetentionEngine;
use crate::auth::{Authorizer, ADMIN_ROLE};
use crate::config::RetentionConfig;
use crate::error::{AppError, Result};
use crate::models::{
    CleanupRequest, CleanupResponse, PurgeTarget, ScheduledReport, USER_ACTIVITIES_KEY,
};

/// Admin-triggered cleanup.
///
/// `caller` is the authenticated user id, if any. Non-admin callers are
/// rejected before the store is touched. Targets run in request order and
/// are not rolled back: when one fails, earlier targets stay purged and the
/// failure comes back as `Internal` with the cause attached.
pub async fn manual_cleanup(
    engine: &RetentionEngine,
    authorizer: &dyn Authorizer,
    caller: Option<&str>,
    request: CleanupRequest,
    now: DateTime<Utc>,
) -> Result<CleanupResponse> {
    let Some(user_id) = caller else {
        engine.metrics().inc_auth_rejections();
        return Err(AppError::Unauthenticated("User must be authenticated".into()));
    };

    if !authorizer.has_role(user_id, &[ADMIN_ROLE]).await {
        engine.metrics().inc_auth_rejections();
        warn!(user_id = %user_id, "Manual cleanup denied");
        return Err(AppError::PermissionDenied(
            "User does not have admin permissions".into(),
        ));
    }

    let retention_days = request
        .custom_retention_days
        .unwrap_or(engine.config().retention_days);
    if retention_days < 0 {
        return Err(AppError::InvalidRequest(format!(
            "customRetentionDays must not be negative, got {}",
            retention_days
        )));
    }

    let cutoff = RetentionConfig::cutoff(now, retention_days)?;

    engine.metrics().inc_manual_runs();
    let run_id = Uuid::new_v4();
    info!(
        run_id = %run_id,
        user_id = %user_id,
        retention_days = retention_days,
        cutoff = %cutoff,
        "Starting manual cleanup"
    );

    match run_manual(engine, &request, cutoff, now).await {
        Ok(response) => {
            info!(
                run_id = %run_id,
                deleted = ?response.deleted_records,
                "Manual cleanup completed successfully"
            );
            Ok(response)
        }
        Err(e) => {
            engine.metrics().inc_failed_runs();
            error!(run_id = %run_id, error = %e, "Error during manual cleanup");
            Err(AppError::internal("Failed to perform manual cleanup", e))
        }
    }
}

async fn run_manual(
    engine: &RetentionEngine,
    request: &CleanupRequest,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<CleanupResponse> {
    let mut response = CleanupResponse::default();

    for name in &request.collection_names {
        let deleted = engine.purge(&PurgeTarget::timestamped(name.as_str()), cutoff).await?;
        response.deleted_records.insert(name.clone(), deleted);
    }

    if let Some(user_id) = &request.specific_user_id {
        let deleted = engine.archive_and_purge_user(user_id, cutoff, now).await?;
        response
            .deleted_records
            .insert(USER_ACTIVITIES_KEY.to_string(), deleted);
    }

    Ok(response)
}

/// One scheduled retention pass with the configured window.
///
/// Purges each scheduled flat target in order, then archives activity for
/// every user. The first error ends the pass.
pub async fn cleanup_old_records(
    engine: &RetentionEngine,
    now: DateTime<Utc>,
) -> Result<ScheduledReport> {
    let config = engine.config();
    let cutoff = RetentionConfig::cutoff(now, config.retention_days)?;
    info!(
        retention_days = config.retention_days,
        cutoff = %cutoff,
        "Starting data retention cleanup"
    );

    let mut report = ScheduledReport::default();
    for target in &config.scheduled_targets {
        let deleted = engine.purge(target, cutoff).await?;
        report.targets.insert(target.collection.clone(), deleted);
    }
    report.user_activities = engine.archive_and_purge_all_users(cutoff, now).await?;

    Ok(report)
}

/// Scheduled trigger body: runs a pass and swallows any failure.
///
/// The outcome is only logged; the next tick is the only retry.
pub async fn run_scheduled_cleanup(engine: &RetentionEngine, now: DateTime<Utc>) {
    engine.metrics().inc_scheduled_runs();
    let run_id = Uuid::new_v4();

    match cleanup_old_records(engine, now).await {
        Ok(report) if !report.has_deletions() => {
            info!(run_id = %run_id, "Data retention cleanup found nothing to delete");
        }
        Ok(report) => {
            info!(
                run_id = %run_id,
                activities = report.deleted_from("activities"),
                contributions = report.deleted_from("contributions"),
                ai_messages = report.deleted_from("aiMessages"),
                user_activities = report.user_activities,
                total = report.total(),
                "Data retention cleanup completed successfully"
            );
        }
        Err(e) => {
            engine.metrics().inc_failed_runs();
            error!(run_id = %run_id, error = %e, "Error during data retention cleanup");
        }
    }
}
