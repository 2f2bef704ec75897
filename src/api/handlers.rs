//! API Handlers
//!
//! HTTP request handlers for the peer endpoint and the front-end API.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::byteview::ByteView;
use crate::error::{CacheError, Result};
use crate::group::{Group, GroupRegistry};
use crate::models::{HealthResponse, KeyQuery, StatsResponse};

/// State shared by the peer endpoint handlers.
#[derive(Clone)]
pub struct AppState {
    /// Groups this node serves
    pub groups: Arc<GroupRegistry>,
}

impl AppState {
    pub fn new(groups: Arc<GroupRegistry>) -> Self {
        Self { groups }
    }
}

fn bytes_response(view: ByteView) -> Response {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        view.byte_slice(),
    )
        .into_response()
}

/// Handler for GET {base_path}:group/:key
///
/// Serves a key of one of this node's groups to a peer.
pub async fn peer_get_handler(
    State(state): State<AppState>,
    Path((name, key)): Path<(String, String)>,
) -> Result<Response> {
    let group = state
        .groups
        .get(&name)
        .ok_or(CacheError::GroupNotFound(name))?;
    let view = group.get(&key).await?;

    Ok(bytes_response(view))
}

/// Handler for GET /api?key=...
///
/// Front-end lookup against a single group.
pub async fn api_get_handler(
    State(group): State<Arc<Group>>,
    Query(query): Query<KeyQuery>,
) -> Result<Response> {
    let view = group.get(&query.key).await?;
    Ok(bytes_response(view))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let groups = state.groups.groups().iter().map(|g| g.stats()).collect();
    Json(StatsResponse::new(groups))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
