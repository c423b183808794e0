//! Data retention engine.
//!
//! Purges stale records from flat collections in bounded batches, and
//! archives per-user activity into monthly summaries before deleting it.
//! Two entry points drive the engine:
//! 1. `manual_cleanup`, an admin-only interactive call that reports counts
//! 2. `run_scheduled_cleanup`, the unattended daily run that never fails
//!
//! Every step runs sequentially. Nothing here retries; errors are logged
//! where they happen and passed up to the entry point.

mod archiver;
mod invocation;
mod purger;

pub use invocation::{cleanup_old_records, manual_cleanup, run_scheduled_cleanup};

use std::sync::Arc;

use crate::config::RetentionConfig;
use crate::routes::metrics::Metrics;
use crate::store::{DocumentStore, MAX_BATCH_WRITES};

/// Shared handle to the store plus the parameters purges run with
pub struct RetentionEngine {
    store: Arc<dyn DocumentStore>,
    config: RetentionConfig,
    metrics: Arc<Metrics>,
}

impl RetentionEngine {
    pub fn new(store: Arc<dyn DocumentStore>, mut config: RetentionConfig, metrics: Arc<Metrics>) -> Self {
        config.batch_size = config.batch_size.clamp(1, MAX_BATCH_WRITES);
        Self {
            store,
            config,
            metrics,
        }
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the engine tests

    use super::*;
    use crate::error::{AppError, Result};
    use crate::models::Document;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 5, 12, 0, 0).unwrap()
    }

    pub fn engine(store: Arc<dyn DocumentStore>, batch_size: usize) -> RetentionEngine {
        let config = RetentionConfig {
            batch_size,
            ..RetentionConfig::default()
        }
        .without_delays();
        RetentionEngine::new(store, config, Arc::new(Metrics::new()))
    }

    pub fn memory_engine(batch_size: usize) -> (MemoryStore, RetentionEngine) {
        let store = MemoryStore::new();
        let engine = engine(Arc::new(store.clone()), batch_size);
        (store, engine)
    }

    /// Seed `count` records timestamped `age` before `at`
    pub fn seed(store: &MemoryStore, collection: &str, prefix: &str, count: usize, at: DateTime<Utc>, age: Duration) {
        for i in 0..count {
            store.insert(
                collection,
                format!("{prefix}-{i}"),
                json!({ "timestamp": (at - age).to_rfc3339() }),
            );
        }
    }

    pub fn seed_activity(store: &MemoryStore, user_id: &str, id: &str, kind: &str, ts: DateTime<Utc>) {
        store.insert(
            &crate::store::user_activities(user_id),
            id,
            json!({ "type": kind, "timestamp": ts.to_rfc3339() }),
        );
    }

    /// Store wrapper that fails every call once `fail_after` calls succeeded
    pub struct FailingStore {
        pub inner: MemoryStore,
        pub fail_after: usize,
        pub calls: AtomicUsize,
    }

    impl FailingStore {
        pub fn new(inner: MemoryStore, fail_after: usize) -> Self {
            Self {
                inner,
                fail_after,
                calls: AtomicUsize::new(0),
            }
        }

        fn check(&self) -> Result<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.fail_after {
                return Err(AppError::DatabaseError("store unavailable".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn find_older_than(
            &self,
            collection: &str,
            field: &str,
            cutoff: DateTime<Utc>,
            limit: Option<usize>,
        ) -> Result<Vec<Document>> {
            self.check()?;
            self.inner.find_older_than(collection, field, cutoff, limit).await
        }

        async fn delete_batch(&self, collection: &str, ids: &[String]) -> Result<usize> {
            self.check()?;
            self.inner.delete_batch(collection, ids).await
        }

        async fn merge_document(&self, collection: &str, id: &str, data: Value) -> Result<()> {
            self.check()?;
            self.inner.merge_document(collection, id, data).await
        }

        async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
            self.check()?;
            self.inner.get_document(collection, id).await
        }

        async fn list_ids(&self, collection: &str) -> Result<Vec<String>> {
            self.check()?;
            self.inner.list_ids(collection).await
        }

        async fn ping(&self) -> Result<()> {
            self.check()
        }
    }
}
