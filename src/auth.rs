//! Caller authentication and role checks

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, warn};

use crate::store::{DocumentStore, API_KEYS, USERS};

/// Role required for administrative operations
pub const ADMIN_ROLE: &str = "admin";

/// Resolves caller identities and answers role queries
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Map a bearer token to a user id
    async fn authenticate(&self, token: &str) -> Option<String>;

    /// Whether the user holds any of `roles`
    async fn has_role(&self, user_id: &str, roles: &[&str]) -> bool;
}

/// Authorizer backed by the document store.
///
/// API keys live at `apiKeys/{key}` with a `userId` field. A user document
/// grants a role through its `role` field (default `user`); `isAdmin: true`
/// grants every role.
pub struct StoreAuthorizer {
    store: Arc<dyn DocumentStore>,
}

impl StoreAuthorizer {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Authorizer for StoreAuthorizer {
    async fn authenticate(&self, token: &str) -> Option<String> {
        if token.is_empty() {
            return None;
        }

        match self.store.get_document(API_KEYS, token).await {
            Ok(Some(doc)) => doc
                .data
                .get("userId")
                .and_then(Value::as_str)
                .map(str::to_string),
            Ok(None) => None,
            Err(e) => {
                error!(error = %e, "Failed to look up API key");
                None
            }
        }
    }

    async fn has_role(&self, user_id: &str, roles: &[&str]) -> bool {
        if user_id.is_empty() {
            return false;
        }

        let user = match self.store.get_document(USERS, user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(user_id = %user_id, "Authorization check for unknown user");
                return false;
            }
            Err(e) => {
                error!(error = %e, user_id = %user_id, "Failed to validate authorization");
                return false;
            }
        };

        if user.data.get("isAdmin").and_then(Value::as_bool) == Some(true) {
            return true;
        }

        let role = user
            .data
            .get("role")
            .and_then(Value::as_str)
            .unwrap_or("user");
        roles.contains(&role)
    }
}

/// Extract Bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn authorizer() -> (MemoryStore, StoreAuthorizer) {
        let store = MemoryStore::new();
        store.insert(USERS, "root", json!({ "isAdmin": true }));
        store.insert(USERS, "ops", json!({ "role": "admin" }));
        store.insert(USERS, "maker", json!({ "role": "user" }));
        store.insert(USERS, "plain", json!({}));
        store.insert(API_KEYS, "key-root", json!({ "userId": "root" }));
        store.insert(API_KEYS, "key-broken", json!({ "owner": "root" }));
        let auth = StoreAuthorizer::new(Arc::new(store.clone()));
        (store, auth)
    }

    #[tokio::test]
    async fn test_authenticate() {
        let (_, auth) = authorizer();
        assert_eq!(auth.authenticate("key-root").await.as_deref(), Some("root"));
        assert_eq!(auth.authenticate("key-broken").await, None);
        assert_eq!(auth.authenticate("missing").await, None);
        assert_eq!(auth.authenticate("").await, None);
    }

    #[tokio::test]
    async fn test_has_role() {
        let (_, auth) = authorizer();
        assert!(auth.has_role("root", &[ADMIN_ROLE]).await);
        assert!(auth.has_role("ops", &[ADMIN_ROLE]).await);
        assert!(!auth.has_role("maker", &[ADMIN_ROLE]).await);
        assert!(!auth.has_role("plain", &[ADMIN_ROLE]).await);
        assert!(auth.has_role("plain", &["user"]).await);
        assert!(!auth.has_role("ghost", &[ADMIN_ROLE]).await);
        assert!(!auth.has_role("", &[ADMIN_ROLE]).await);
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("Authorization", "Bearer abc123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), Some("abc123"));

        headers.insert("Authorization", "Basic abc123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("Authorization", "Bearer ".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
