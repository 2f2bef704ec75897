//! API Module
//!
//! HTTP handlers and routing for the peer endpoint and the front-end API.
//!
//! # Endpoints
//! Peer router:
//! - `GET {base_path}:group/:key` - Value bytes of `key` in `group`
//! - `GET /stats` - Per-group statistics
//! - `GET /health` - Health check endpoint
//!
//! API router:
//! - `GET /api?key=...` - Value bytes of `key` in the served group
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::{create_api_router, create_peer_router};
