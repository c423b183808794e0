//! Activity archiver: monthly rollups before per-user deletion

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use super::RetentionEngine;
use crate::error::Result;
use crate::models::{period_key, ActivitySummary, TIMESTAMP_FIELD};
use crate::store::{self, USERS};

impl RetentionEngine {
    /// Summarize and delete one user's activity older than `cutoff`.
    ///
    /// All qualifying records are loaded at once, folded into the summary
    /// document for the cutoff's month (`YYYY-MM`), then deleted in batches
    /// of `batch_size`. The summary is merged into any existing document for
    /// that month; `totalActivities` reflects this call only. Records the
    /// store matched without an RFC 3339 timestamp are left in place.
    pub async fn archive_and_purge_user(
        &self,
        user_id: &str,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        self.archive_user(user_id, cutoff, now)
            .await
            .inspect_err(|e| {
                error!(error = %e, user_id = %user_id, "Error summarizing activities for user");
            })
    }

    async fn archive_user(
        &self,
        user_id: &str,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let activities = store::user_activities(user_id);
        let mut records = self
            .store
            .find_older_than(&activities, TIMESTAMP_FIELD, cutoff, None)
            .await?;
        // only records folded into the summary may be deleted
        records.retain(|doc| doc.timestamp(TIMESTAMP_FIELD).is_some_and(|ts| ts < cutoff));

        if records.is_empty() {
            return Ok(0);
        }

        let period = period_key(cutoff);
        let summary = ActivitySummary::from_records(period.as_str(), &records, now);
        self.store
            .merge_document(
                &store::user_summaries(user_id),
                &period,
                serde_json::to_value(&summary)?,
            )
            .await?;
        self.metrics.inc_summaries(1);

        let ids: Vec<String> = records.into_iter().map(|doc| doc.id).collect();
        for chunk in ids.chunks(self.config.batch_size) {
            self.store.delete_batch(&activities, chunk).await?;
        }

        let deleted = ids.len() as u64;
        self.metrics.inc_archived(deleted);
        info!(
            user_id = %user_id,
            period = %period,
            deleted = deleted,
            types = summary.activity_counts.len(),
            "Summarized and deleted activities"
        );
        Ok(deleted)
    }

    /// Archive stale activity for every user, one user at a time.
    ///
    /// When a single user yields `batch_size` or more records the sweep
    /// pauses, restarts from the first user, and the remainder of the
    /// interrupted pass is dropped. Users late in the listing are only
    /// reached by a pass that runs to completion.
    ///
    /// Returns the records deleted across every pass that ran.
    pub async fn archive_and_purge_all_users(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        self.sweep_users(cutoff, now).await.inspect_err(|e| {
            error!(error = %e, "Error cleaning up user activities");
        })
    }

    async fn sweep_users(&self, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> Result<u64> {
        let restart_threshold = self.config.batch_size as u64;
        let mut total = 0u64;
        let mut pass = 0u32;

        'sweep: loop {
            pass += 1;
            // TODO: page through users once the store exposes cursors
            let users = self.store.list_ids(USERS).await?;
            debug!(pass = pass, users = users.len(), "Sweeping user activities");

            for user_id in &users {
                let deleted = self.archive_and_purge_user(user_id, cutoff, now).await?;
                total += deleted;

                if deleted >= restart_threshold {
                    info!(
                        user_id = %user_id,
                        deleted = deleted,
                        pass = pass,
                        "Large archive for user, restarting sweep"
                    );
                    tokio::time::sleep(self.config.archive_restart_delay).await;
                    continue 'sweep;
                }
            }

            break;
        }

        Ok(total)
    }
}
