//! Core domain models for the retention engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Name of the timestamp field every purgeable record carries
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Activity records without a `type` are grouped under this key
pub const UNKNOWN_ACTIVITY_TYPE: &str = "unknown";

/// Key under which the per-user archive count is reported
pub const USER_ACTIVITIES_KEY: &str = "userActivities";

/// An opaque document read from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier, unique within its collection
    pub id: String,
    /// Schema-free document body
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Read a timestamp-typed field (RFC 3339 string)
    pub fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        self.data
            .get(field)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// Activity type, falling back to `unknown`
    pub fn activity_type(&self) -> &str {
        self.data
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_ACTIVITY_TYPE)
    }
}

/// A flat collection purged directly by timestamp comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeTarget {
    pub collection: String,
    pub timestamp_field: String,
}

impl PurgeTarget {
    pub fn new(collection: impl Into<String>, timestamp_field: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            timestamp_field: timestamp_field.into(),
        }
    }

    /// Target whose records carry the standard `timestamp` field
    pub fn timestamped(collection: impl Into<String>) -> Self {
        Self::new(collection, TIMESTAMP_FIELD)
    }
}

/// Aggregate for one activity type within a summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeStats {
    pub count: u64,
    pub first_timestamp: DateTime<Utc>,
    pub last_timestamp: DateTime<Utc>,
}

impl TypeStats {
    fn new(ts: DateTime<Utc>) -> Self {
        Self {
            count: 1,
            first_timestamp: ts,
            last_timestamp: ts,
        }
    }

    fn record(&mut self, ts: DateTime<Utc>) {
        self.count += 1;
        self.first_timestamp = self.first_timestamp.min(ts);
        self.last_timestamp = self.last_timestamp.max(ts);
    }
}

/// Monthly rollup of a user's archived activity.
///
/// Stored under `users/{uid}/activitySummaries/{YYYY-MM}` and merged into
/// any existing document for the same month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub period: String,
    pub activity_counts: BTreeMap<String, TypeStats>,
    pub total_activities: u64,
    pub summarized_at: DateTime<Utc>,
}

impl ActivitySummary {
    /// Group activity records by type.
    ///
    /// Records without a parseable `timestamp` are skipped; the caller only
    /// hands in records already matched by a timestamp range query.
    pub fn from_records(
        period: impl Into<String>,
        records: &[Document],
        summarized_at: DateTime<Utc>,
    ) -> Self {
        let mut activity_counts: BTreeMap<String, TypeStats> = BTreeMap::new();
        let mut total = 0;

        for record in records {
            let Some(ts) = record.timestamp(TIMESTAMP_FIELD) else {
                continue;
            };
            total += 1;
            activity_counts
                .entry(record.activity_type().to_string())
                .and_modify(|stats| stats.record(ts))
                .or_insert_with(|| TypeStats::new(ts));
        }

        Self {
            period: period.into(),
            activity_counts,
            total_activities: total,
            summarized_at,
        }
    }
}

/// Summary document key: the `YYYY-MM` of the given instant
pub fn period_key(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m").to_string()
}

/// Request payload for the interactive cleanup endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CleanupRequest {
    /// Flat collections to purge (field `timestamp`)
    pub collection_names: Vec<String>,
    /// Archive and purge this user's activity as well
    pub specific_user_id: Option<String>,
    /// Retention window in days; the configured default applies when absent
    pub custom_retention_days: Option<i64>,
}

/// Response payload for the interactive cleanup endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub deleted_records: BTreeMap<String, u64>,
}

/// Counts from one scheduled retention run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduledReport {
    /// Records deleted per flat target, keyed by collection
    pub targets: BTreeMap<String, u64>,
    /// Activity records archived and deleted across all users
    pub user_activities: u64,
}

impl ScheduledReport {
    /// Count deleted from one flat target
    pub fn deleted_from(&self, collection: &str) -> u64 {
        self.targets.get(collection).copied().unwrap_or(0)
    }

    /// Total number of records deleted across all targets and users.
    pub fn total(&self) -> u64 {
        self.targets.values().sum::<u64>() + self.user_activities
    }

    pub fn has_deletions(&self) -> bool {
        self.total() > 0
    }
}
