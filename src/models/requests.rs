//! Request DTOs for the HTTP endpoints
//!
//! Defines the structure of incoming query strings.

use serde::Deserialize;

/// Query string of the front-end lookup (GET /api?key=...)
///
/// A missing `key` deserializes to the empty string, which the group
/// rejects as an empty key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyQuery {
    /// The key to look up
    #[serde(default)]
    pub key: String,
}
