//! Error types for the cache node
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
/// Unified error type for the cache node.
///
/// `Clone` so that a single load result can be handed to every caller
/// waiting on the same in-flight key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key argument was empty
    #[error("key is required")]
    EmptyKey,

    /// The local getter could not produce a value
    #[error("load failed: {0}")]
    LoadFailed(String),

    /// Transport-level failure talking to a remote peer
    #[error("peer fetch failed: {0}")]
    PeerFetchFailed(String),

    /// Internal bookkeeping corruption
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// No group registered under that name
    #[error("no such group: {0}")]
    GroupNotFound(String),

    /// Peers were registered on a group more than once
    #[error("peers already registered for group: {0}")]
    PeersAlreadyRegistered(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::EmptyKey | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::LoadFailed(_) | CacheError::GroupNotFound(_) => StatusCode::NOT_FOUND,
            CacheError::PeerFetchFailed(_) => StatusCode::BAD_GATEWAY,
            CacheError::PeersAlreadyRegistered(_) => StatusCode::CONFLICT,
            CacheError::InvariantViolation(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache node.
pub type Result<T> = std::result::Result<T, CacheError>;
