//! HTTP Peer Pool
//!
//! Routes keys to peers over HTTP. Peers serve each other on
//! `GET {base_path}{group}/{key}` with the raw value bytes as the body.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use tracing::debug;

use super::{FetchRequest, FetchResponse, PeerGetter, PeerPicker};
use crate::config::DEFAULT_REPLICAS;
use crate::consistenthash::HashRing;
use crate::error::{CacheError, Result};

/// Path prefix peers are served under.
pub const DEFAULT_BASE_PATH: &str = "/_peercache/";

/// Default timeout of one peer request.
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(5);

// == HTTP Getter ==
/// Fetches values from one peer.
#[derive(Debug, Clone)]
pub struct HttpGetter {
    /// Peer address joined with the base path, e.g. `http://10.0.0.2:8001/_peercache/`
    base_url: String,
    client: Client,
}

impl HttpGetter {
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }
}

#[async_trait]
impl PeerGetter for HttpGetter {
    async fn get(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let url = format!(
            "{}{}/{}",
            self.base_url,
            urlencoding::encode(&req.group),
            urlencoding::encode(&req.key)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CacheError::PeerFetchFailed(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(CacheError::PeerFetchFailed(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CacheError::PeerFetchFailed(format!("reading body from {}: {}", url, e)))?;

        Ok(FetchResponse {
            value: body.to_vec(),
        })
    }
}

struct PoolState {
    ring: HashRing,
    getters: HashMap<String, Arc<HttpGetter>>,
}

// == HTTP Pool ==
/// Set of HTTP peers, one of which is this node.
///
/// Implements [`PeerPicker`] by looking keys up on a consistent-hash ring of
/// the peer addresses.
pub struct HttpPool {
    /// This node's own address, e.g. `http://localhost:8001`
    self_addr: String,
    base_path: String,
    replicas: usize,
    client: Client,
    state: RwLock<PoolState>,
}

impl HttpPool {
    // == Constructor ==
    /// Creates a pool for the node reachable at `self_addr`.
    pub fn new(self_addr: impl Into<String>) -> Result<Self> {
        Self::with_options(self_addr, DEFAULT_BASE_PATH, DEFAULT_REPLICAS, DEFAULT_PEER_TIMEOUT)
    }

    pub fn with_options(
        self_addr: impl Into<String>,
        base_path: impl Into<String>,
        replicas: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Internal(format!("building peer client: {}", e)))?;

        Ok(Self {
            self_addr: self_addr.into(),
            base_path: base_path.into(),
            replicas,
            client,
            state: RwLock::new(PoolState {
                ring: HashRing::new(replicas, None),
                getters: HashMap::new(),
            }),
        })
    }

    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    // == Set ==
    /// Replaces the peer list. Already cached entries are not moved.
    pub fn set<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let peers: Vec<String> = peers.into_iter().map(|p| p.as_ref().to_string()).collect();

        let mut ring = HashRing::new(self.replicas, None);
        ring.add(&peers);

        let getters = peers
            .iter()
            .map(|peer| {
                let getter = HttpGetter::new(
                    format!("{}{}", peer, self.base_path),
                    self.client.clone(),
                );
                (peer.clone(), Arc::new(getter))
            })
            .collect();

        *self.state.write() = PoolState { ring, getters };
        debug!("[Server {}] peer set updated: {:?}", self.self_addr, peers);
    }

    /// Currently registered peers, sorted.
    pub fn peers(&self) -> Vec<String> {
        let mut peers: Vec<String> = self.state.read().getters.keys().cloned().collect();
        peers.sort();
        peers
    }
}

impl PeerPicker for HttpPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let state = self.state.read();
        let peer = state.ring.get(key)?;
        if peer.is_empty() || peer == self.self_addr {
            return None;
        }
        debug!("[Server {}] pick peer {} for key {}", self.self_addr, peer, key);
        state
            .getters
            .get(peer)
            .map(|getter| getter.clone() as Arc<dyn PeerGetter>)
    }
}

impl std::fmt::Debug for HttpPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPool")
            .field("self_addr", &self.self_addr)
            .field("base_path", &self.base_path)
            .field("peers", &self.peers())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_peer_without_peers() {
        let pool = HttpPool::new("http://localhost:8001").unwrap();
        assert!(pool.pick_peer("key").is_none());
    }

    #[test]
    fn test_pick_peer_skips_self() {
        let pool = HttpPool::new("http://localhost:8001").unwrap();
        pool.set(["http://localhost:8001"]);

        for i in 0..50 {
            assert!(pool.pick_peer(&format!("key{i}")).is_none());
        }
    }

    #[test]
    fn test_pick_peer_returns_remote_owner() {
        let pool = HttpPool::new("http://localhost:8001").unwrap();
        pool.set(["http://localhost:8002"]);

        assert!(pool.pick_peer("Tom").is_some());
        assert_eq!(pool.peers(), vec!["http://localhost:8002"]);
    }

    #[test]
    fn test_pick_peer_splits_keys() {
        let pool = HttpPool::new("http://localhost:8001").unwrap();
        pool.set(["http://localhost:8001", "http://localhost:8002", "http://localhost:8003"]);

        let remote = (0..300)
            .filter(|i| pool.pick_peer(&format!("key{i}")).is_some())
            .count();
        // roughly two thirds of the keyspace lives elsewhere
        assert!(remote > 100 && remote < 300, "{remote} remote keys");
    }

    #[tokio::test]
    async fn test_getter_reports_unreachable_peer() {
        let client = Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let getter = HttpGetter::new("http://127.0.0.1:1/_peercache/", client);

        let err = getter
            .get(&FetchRequest::new("scores", "Tom"))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::PeerFetchFailed(_)));
    }
}
