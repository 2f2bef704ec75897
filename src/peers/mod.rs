//! Peers Module
//!
//! Capabilities a group uses to find and query the peer that owns a key.
//!
//! # Components
//! - [`PeerPicker`]: decides which remote peer, if any, owns a key
//! - [`PeerGetter`]: fetches a key's value from one remote peer
//! - [`HttpPool`]: HTTP implementation of both, backed by a [`HashRing`]
//!
//! [`HashRing`]: crate::consistenthash::HashRing

mod http;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

pub use http::{HttpGetter, HttpPool, DEFAULT_BASE_PATH, DEFAULT_PEER_TIMEOUT};

/// Request sent to the owning peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub group: String,
    pub key: String,
}

impl FetchRequest {
    pub fn new(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            key: key.into(),
        }
    }
}

/// Value returned by the owning peer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchResponse {
    pub value: Vec<u8>,
}

// == Peer Picker ==
/// Locates the peer that owns a key.
pub trait PeerPicker: Send + Sync {
    /// Returns the remote owner of `key`, or `None` when the key should be
    /// loaded locally (no peers, or this node owns it).
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}

// == Peer Getter ==
/// Client for one remote peer.
#[async_trait]
pub trait PeerGetter: Send + Sync {
    async fn get(&self, req: &FetchRequest) -> Result<FetchResponse>;
}
