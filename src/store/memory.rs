//! In-process document store for local runs and tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::{merge_json, DocumentStore, MAX_BATCH_WRITES};
use crate::error::{AppError, Result};
use crate::models::Document;

type Collection = BTreeMap<String, Value>;

/// A document store held entirely in memory.
///
/// Cloning yields another handle to the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<HashMap<String, Collection>>>,
    stats: Arc<StoreStats>,
}

#[derive(Default)]
struct StoreStats {
    batch_commits: AtomicU64,
    mutations: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document
    pub fn insert(&self, collection: &str, id: impl Into<String>, data: Value) {
        self.collections
            .lock()
            .entry(collection.to_string())
            .or_default()
            .insert(id.into(), data);
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    pub fn contains(&self, collection: &str, id: &str) -> bool {
        self.collections
            .lock()
            .get(collection)
            .is_some_and(|c| c.contains_key(id))
    }

    /// Atomic delete batches committed so far
    pub fn batch_commits(&self) -> u64 {
        self.stats.batch_commits.load(Ordering::Relaxed)
    }

    /// Write operations (batch deletes and merges) applied so far
    pub fn mutations(&self) -> u64 {
        self.stats.mutations.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_older_than(
        &self,
        collection: &str,
        field: &str,
        cutoff: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        let collections = self.collections.lock();
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let matched = docs
            .iter()
            .map(|(id, data)| Document::new(id.clone(), data.clone()))
            .filter(|doc| doc.timestamp(field).is_some_and(|ts| ts < cutoff))
            .take(limit.unwrap_or(usize::MAX))
            .collect();

        Ok(matched)
    }

    async fn delete_batch(&self, collection: &str, ids: &[String]) -> Result<usize> {
        if ids.len() > MAX_BATCH_WRITES {
            return Err(AppError::InvalidState(format!(
                "Batch of {} writes exceeds the limit of {}",
                ids.len(),
                MAX_BATCH_WRITES
            )));
        }

        let mut collections = self.collections.lock();
        if let Some(docs) = collections.get_mut(collection) {
            for id in ids {
                docs.remove(id);
            }
        }
        self.stats.batch_commits.fetch_add(1, Ordering::Relaxed);
        self.stats.mutations.fetch_add(1, Ordering::Relaxed);

        debug!(collection = %collection, count = ids.len(), "Committed delete batch");
        Ok(ids.len())
    }

    async fn merge_document(&self, collection: &str, id: &str, data: Value) -> Result<()> {
        let mut collections = self.collections.lock();
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.get_mut(id) {
            Some(existing) => merge_json(existing, data),
            None => {
                docs.insert(id.to_string(), data);
            }
        }
        self.stats.mutations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        Ok(self
            .collections
            .lock()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document::new(id, data.clone())))
    }

    async fn list_ids(&self, collection: &str) -> Result<Vec<String>> {
        Ok(self
            .collections
            .lock()
            .get(collection)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
