//! Error types for the distributed cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::CacheResponse;

// == Cache Error Enum ==
/// Unified error type for the distributed cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The placement ring has no entries
    #[error("Hash ring is empty")]
    RingEmpty,

    /// Node id is not part of the configured node set
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Every lease attempt for the key failed
    #[error("Could not acquire lock for key: {0}")]
    LockAcquisitionFailed(String),

    /// A single backend call failed
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A stored value could not be turned back into an entry
    #[error("Conversion error: {0}")]
    ConversionError(String),

    /// Lease or primary write failed during a put
    #[error("Put failed for key '{key}': {source}")]
    PutFailed {
        key: String,
        #[source]
        source: Box<CacheError>,
    },

    /// Key not found or expired
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid startup configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Wraps a lower-level failure into a `PutFailed` for the given key.
    pub fn put_failed(key: impl Into<String>, source: CacheError) -> Self {
        CacheError::PutFailed {
            key: key.into(),
            source: Box::new(source),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) | CacheError::NodeNotFound(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(CacheResponse::<()>::error(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the distributed cache.
pub type Result<T> = std::result::Result<T, CacheError>;
