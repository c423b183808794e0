//! Application error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Wraps whatever failed underneath an entry point, keeping the cause.
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Box<AppError>,
    },
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Wrap an error as `Internal`, attaching it as the cause.
    pub fn internal(message: impl Into<String>, source: AppError) -> Self {
        AppError::Internal {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) => "unavailable",
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::PermissionDenied(_) => "permission-denied",
            AppError::InvalidRequest(_) => "invalid-argument",
            AppError::InvalidState(_) => "failed-precondition",
            AppError::Internal { .. } => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(_) | AppError::InvalidState(_) | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::Internal { message, source } => json!({
                "error": message,
                "kind": self.kind(),
                "code": status.as_u16(),
                "details": source.to_string(),
            }),
            AppError::DatabaseError(msg)
            | AppError::Unauthenticated(msg)
            | AppError::PermissionDenied(msg)
            | AppError::InvalidRequest(msg)
            | AppError::InvalidState(msg) => json!({
                "error": msg,
                "kind": self.kind(),
                "code": status.as_u16(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidState(err.to_string())
    }
}
