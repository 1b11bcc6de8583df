//! Error types for the cache server
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache engine, its backends and the HTTP layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key absent from both the cache and the origin
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The origin could not answer (I/O failure, malformed data)
    #[error("Origin unavailable for key '{key}': {message}")]
    OriginUnavailable { key: String, message: String },

    /// The snapshot write failed; the in-memory mutation has already been applied
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// A persisted snapshot could not be decoded
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),
}

impl CacheError {
    /// Creates an `OriginUnavailable` error for `key`.
    pub fn origin(key: impl Into<String>, message: impl ToString) -> Self {
        CacheError::OriginUnavailable {
            key: key.into(),
            message: message.to_string(),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::OriginUnavailable { .. } => StatusCode::BAD_GATEWAY,
            CacheError::Persistence(_) | CacheError::MalformedSnapshot(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match self {
            CacheError::NotFound(msg) | CacheError::InvalidRequest(msg) => msg,
            other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache server.
pub type Result<T> = std::result::Result<T, CacheError>;
