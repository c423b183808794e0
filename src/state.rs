//! Application state shared across handlers

use crate::auth::{Authorizer, StoreAuthorizer};
use crate::config::RetentionConfig;
use crate::retention::RetentionEngine;
use crate::routes::metrics::Metrics;
use crate::store::DocumentStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Document store the engine purges
    pub store: Arc<dyn DocumentStore>,
    /// Retention engine shared by the HTTP handlers and the scheduled task
    pub engine: Arc<RetentionEngine>,
    /// Resolves bearer tokens and admin grants
    pub authorizer: Arc<dyn Authorizer>,
    /// Application metrics for Prometheus
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Create new application state
    ///
    /// # Arguments
    /// * `store` - Document store backing both the engine and authorization
    /// * `retention` - Parameters the engine runs with
    pub fn new(store: Arc<dyn DocumentStore>, retention: RetentionConfig) -> Self {
        let metrics = Arc::new(Metrics::new());
        let engine = RetentionEngine::new(Arc::clone(&store), retention, Arc::clone(&metrics));
        let authorizer = StoreAuthorizer::new(Arc::clone(&store));

        Self {
            store,
            engine: Arc::new(engine),
            authorizer: Arc::new(authorizer),
            metrics,
        }
    }
}
