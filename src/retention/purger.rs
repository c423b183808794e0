//! Batch purger for flat collections

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use super::RetentionEngine;
use crate::error::Result;
use crate::models::PurgeTarget;

impl RetentionEngine {
    /// Delete every record in `target` older than `cutoff`.
    ///
    /// Works in batches of at most `batch_size` records, each removed in one
    /// atomic write. A full batch means more may remain, so the purger pauses
    /// for `purge_delay` and queries again; a short batch ends the run.
    /// Records stamped exactly at `cutoff` are kept.
    ///
    /// Returns the number of records deleted. Any store error aborts the run;
    /// batches committed before it stay deleted.
    pub async fn purge(&self, target: &PurgeTarget, cutoff: DateTime<Utc>) -> Result<u64> {
        self.purge_batches(target, cutoff).await.inspect_err(|e| {
            error!(
                error = %e,
                collection = %target.collection,
                "Error cleaning up collection"
            );
        })
    }

    async fn purge_batches(&self, target: &PurgeTarget, cutoff: DateTime<Utc>) -> Result<u64> {
        let batch_size = self.config.batch_size;
        let mut total = 0u64;
        let mut batches = 0u32;

        loop {
            let docs = self
                .store
                .find_older_than(
                    &target.collection,
                    &target.timestamp_field,
                    cutoff,
                    Some(batch_size),
                )
                .await?;

            if docs.is_empty() {
                if total == 0 {
                    info!(collection = %target.collection, "No old records found");
                }
                break;
            }

            let ids: Vec<String> = docs.into_iter().map(|doc| doc.id).collect();
            let matched = ids.len();
            self.store.delete_batch(&target.collection, &ids).await?;

            batches += 1;
            total += matched as u64;
            self.metrics.inc_deleted(matched as u64);
            info!(
                collection = %target.collection,
                deleted = matched,
                "Deleted old records"
            );

            if matched < batch_size {
                break;
            }

            debug!(
                collection = %target.collection,
                delay_ms = self.config.purge_delay.as_millis() as u64,
                "Full batch deleted, continuing"
            );
            tokio::time::sleep(self.config.purge_delay).await;
        }

        debug!(
            collection = %target.collection,
            batches = batches,
            total = total,
            "Purge finished"
        );
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use crate::retention::testing::*;
    use crate::models::PurgeTarget;
    use crate::store::{DocumentStore, MemoryStore};
    use chrono::Duration;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_purge_in_batches() {
        let (store, engine) = memory_engine(100);
        let cutoff = now() - Duration::days(30);
        seed(&store, "activities", "old", 250, cutoff, Duration::hours(1));
        seed(&store, "activities", "fresh", 10, now(), Duration::hours(1));

        let deleted = engine
            .purge(&PurgeTarget::timestamped("activities"), cutoff)
            .await
            .unwrap();

        assert_eq!(deleted, 250);
        assert_eq!(store.batch_commits(), 3);
        assert_eq!(store.count("activities"), 10);
        assert_eq!(engine.metrics().get_metrics().records_deleted_total, 250);
    }

    #[tokio::test]
    async fn test_exact_multiple_of_batch_size() {
        let (store, engine) = memory_engine(100);
        let cutoff = now();
        seed(&store, "contributions", "c", 200, cutoff, Duration::days(2));

        let deleted = engine
            .purge(&PurgeTarget::timestamped("contributions"), cutoff)
            .await
            .unwrap();

        assert_eq!(deleted, 200);
        assert_eq!(store.batch_commits(), 2);
        assert_eq!(store.count("contributions"), 0);
    }

    #[tokio::test]
    async fn test_cutoff_is_strict() {
        let (store, engine) = memory_engine(100);
        let cutoff = now();
        store.insert("aiMessages", "before", json!({ "timestamp": (cutoff - Duration::milliseconds(1)).to_rfc3339() }));
        store.insert("aiMessages", "at", json!({ "timestamp": cutoff.to_rfc3339() }));
        store.insert("aiMessages", "after", json!({ "timestamp": (cutoff + Duration::seconds(1)).to_rfc3339() }));

        let deleted = engine
            .purge(&PurgeTarget::timestamped("aiMessages"), cutoff)
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        assert!(!store.contains("aiMessages", "before"));
        assert!(store.contains("aiMessages", "at"));
        assert!(store.contains("aiMessages", "after"));
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let (store, engine) = memory_engine(100);

        let deleted = engine
            .purge(&PurgeTarget::timestamped("activities"), now())
            .await
            .unwrap();

        assert_eq!(deleted, 0);
        assert_eq!(store.mutations(), 0);
    }

    #[tokio::test]
    async fn test_second_purge_is_noop() {
        let (store, engine) = memory_engine(100);
        let target = PurgeTarget::timestamped("activities");
        seed(&store, "activities", "a", 120, now(), Duration::days(40));
        let cutoff = now() - Duration::days(30);

        assert_eq!(engine.purge(&target, cutoff).await.unwrap(), 120);
        let commits = store.batch_commits();
        assert_eq!(engine.purge(&target, cutoff).await.unwrap(), 0);
        assert_eq!(store.batch_commits(), commits);
    }

    #[tokio::test]
    async fn test_custom_timestamp_field() {
        let (store, engine) = memory_engine(100);
        let old = (now() - Duration::days(60)).to_rfc3339();
        store.insert("tickets", "t1", json!({ "closedAt": old, "timestamp": now().to_rfc3339() }));
        store.insert("tickets", "t2", json!({ "timestamp": old }));

        let deleted = engine
            .purge(&PurgeTarget::new("tickets", "closedAt"), now())
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        assert!(!store.contains("tickets", "t1"));
        assert!(store.contains("tickets", "t2"));
    }

    #[tokio::test]
    async fn test_error_aborts_chain() {
        let inner = MemoryStore::new();
        seed(&inner, "activities", "a", 150, now(), Duration::days(40));
        // find, delete, then the second find fails
        let store = Arc::new(FailingStore::new(inner.clone(), 2));
        let engine = engine(store.clone() as Arc<dyn DocumentStore>, 100);

        let result = engine
            .purge(&PurgeTarget::timestamped("activities"), now())
            .await;

        assert!(result.is_err());
        assert_eq!(inner.count("activities"), 50);
    }
}
