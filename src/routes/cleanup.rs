//! Interactive cleanup endpoint

use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;

use crate::auth::extract_bearer_token;
use crate::error::Result;
use crate::models::{CleanupRequest, CleanupResponse};
use crate::retention;
use crate::state::AppState;

/// POST /api/v1/retention/cleanup
///
/// Purges the named collections and, optionally, one user's activity.
/// Requires a Bearer token belonging to an admin.
///
/// Request body (all optional):
/// - collectionNames: flat collections to purge
/// - specificUserId: user whose activity is archived and purged
/// - customRetentionDays: retention window (default: 30)
pub async fn manual_cleanup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CleanupRequest>,
) -> Result<Json<CleanupResponse>> {
    let caller = match extract_bearer_token(&headers) {
        Some(token) => state.authorizer.authenticate(token).await,
        None => None,
    };

    let response = retention::manual_cleanup(
        &state.engine,
        state.authorizer.as_ref(),
        caller.as_deref(),
        request,
        Utc::now(),
    )
    .await?;

    Ok(Json(response))
}
