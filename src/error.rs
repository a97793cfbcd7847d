//! Error types for the tiered cache server
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the tiered cache server.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Engine called before initialization or after shutdown
    #[error("Engine not ready: {0}")]
    NotReady(String),

    /// Key not found in any tier the strategy touches. Expired and corrupt
    /// entries surface the same way: as a miss.
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Value could not be encoded for storage
    #[error("Encoding failed for key '{key}': {reason}")]
    Encode { key: String, reason: String },

    /// Disk tier I/O failure
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CacheError::NotReady(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            CacheError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            CacheError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CacheError::Encode { .. } => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            CacheError::Storage(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            CacheError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the tiered cache server.
pub type Result<T> = std::result::Result<T, CacheError>;
