//! Document store abstraction used by the retention engine

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;
use crate::models::Document;

pub use memory::MemoryStore;

/// Largest number of writes the store accepts in one atomic batch
pub const MAX_BATCH_WRITES: usize = 500;

/// Top-level user collection
pub const USERS: &str = "users";

/// Collection of API keys, document id is the key itself
pub const API_KEYS: &str = "apiKeys";

/// Per-user activity collection
pub fn user_activities(user_id: &str) -> String {
    format!("{USERS}/{user_id}/activities")
}

/// Per-user monthly summary collection
pub fn user_summaries(user_id: &str) -> String {
    format!("{USERS}/{user_id}/activitySummaries")
}

/// Operations the engine needs from a document datastore.
///
/// Collections are addressed by slash-separated paths, so per-user
/// sub-collections are plain collections to implementors.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents whose `field` holds a timestamp strictly before `cutoff`,
    /// in arbitrary order, at most `limit` of them when given.
    async fn find_older_than(
        &self,
        collection: &str,
        field: &str,
        cutoff: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>>;

    /// Delete the given documents in one atomic write.
    ///
    /// Missing ids are ignored. Returns the number of ids submitted.
    async fn delete_batch(&self, collection: &str, ids: &[String]) -> Result<usize>;

    /// Create the document or deep-merge `data` into it.
    async fn merge_document(&self, collection: &str, id: &str, data: Value) -> Result<()>;

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Ids of every document in a collection, unpaginated
    async fn list_ids(&self, collection: &str) -> Result<Vec<String>>;

    /// Cheap connectivity check
    async fn ping(&self) -> Result<()>;
}

/// Merge `patch` into `target`.
///
/// Objects are merged key by key, recursively; any other value in `patch`
/// replaces what was there.
pub fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
