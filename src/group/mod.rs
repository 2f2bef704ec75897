//! Group Module
//!
//! A named cache namespace tying together the local cache, request
//! deduplication, peer routing and the fallback getter.
//!
//! # Lookup Flow
//! 1. Empty keys are rejected
//! 2. Local cache hit returns immediately
//! 3. On a miss, one load per key runs at a time on this node
//! 4. The load asks the owning peer, or the getter if this node owns the key
//!    or the peer fails
//! 5. The loaded value is added to the local cache

mod getter;
mod registry;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use tracing::{debug, warn};

use crate::byteview::ByteView;
use crate::cache::{Cache, CacheStats, EvictionPolicy};
use crate::error::{CacheError, Result};
use crate::peers::{FetchRequest, PeerGetter, PeerPicker};
use crate::singleflight::SingleFlight;

pub use getter::{Getter, GetterFunc};
pub use registry::GroupRegistry;

#[derive(Debug, Default)]
struct Counters {
    gets: AtomicU64,
    cache_hits: AtomicU64,
    loads: AtomicU64,
    dedup_loads: AtomicU64,
    peer_loads: AtomicU64,
    peer_errors: AtomicU64,
    local_loads: AtomicU64,
    local_load_errs: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Snapshot of a group's counters.
#[derive(Debug, Clone, Serialize)]
pub struct GroupStats {
    pub name: String,
    /// Every `get`, including rejected ones
    pub gets: u64,
    pub cache_hits: u64,
    /// Loads actually run, after deduplication
    pub loads: u64,
    /// Misses answered by another caller's in-flight load
    pub dedup_loads: u64,
    pub peer_loads: u64,
    pub peer_errors: u64,
    pub local_loads: u64,
    pub local_load_errs: u64,
    /// Share of non-empty gets answered from the local cache
    pub hit_rate: f64,
    pub cache: CacheStats,
}

// == Group ==
/// A cache namespace and its loading logic.
pub struct Group {
    name: String,
    getter: Arc<dyn Getter>,
    main_cache: Cache,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    loader: SingleFlight<ByteView>,
    counters: Counters,
}

impl Group {
    // == Constructor ==
    /// Creates a group whose cache holds at most `cache_bytes` (0 = unbounded).
    pub fn new(
        name: impl Into<String>,
        cache_bytes: u64,
        policy: EvictionPolicy,
        getter: impl Getter + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            getter: Arc::new(getter),
            main_cache: Cache::new(cache_bytes, policy, None),
            peers: OnceLock::new(),
            loader: SingleFlight::new(),
            counters: Counters::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache(&self) -> &Cache {
        &self.main_cache
    }

    // == Register Peers ==
    /// Wires the peer picker. Allowed once, before serving traffic.
    pub fn register_peers(&self, peers: Arc<dyn PeerPicker>) -> Result<()> {
        self.peers
            .set(peers)
            .map_err(|_| CacheError::PeersAlreadyRegistered(self.name.clone()))
    }

    // == Get ==
    /// Returns the value for `key`, loading it on a miss.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        bump(&self.counters.gets);
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }

        if let Some(value) = self.main_cache.get(key)? {
            debug!("[{}] cache hit for {}", self.name, key);
            bump(&self.counters.cache_hits);
            return Ok(value);
        }

        self.load(key).await
    }

    async fn load(&self, key: &str) -> Result<ByteView> {
        let ran = AtomicBool::new(false);
        let result = self
            .loader
            .work(key, || async {
                ran.store(true, Ordering::Relaxed);
                bump(&self.counters.loads);
                if let Some(peer) = self.peers.get().and_then(|p| p.pick_peer(key)) {
                    match self.get_from_peer(peer.as_ref(), key).await {
                        Ok(value) => {
                            bump(&self.counters.peer_loads);
                            self.populate_cache(key, value.clone())?;
                            return Ok(value);
                        }
                        Err(err) => {
                            bump(&self.counters.peer_errors);
                            warn!("[{}] failed to get {} from peer: {}", self.name, key, err);
                        }
                    }
                }
                self.get_locally(key).await
            })
            .await;

        if !ran.load(Ordering::Relaxed) {
            bump(&self.counters.dedup_loads);
        }
        result
    }

    async fn get_from_peer(&self, peer: &dyn PeerGetter, key: &str) -> Result<ByteView> {
        let req = FetchRequest::new(self.name.as_str(), key);
        let res = peer.get(&req).await?;
        Ok(ByteView::from(res.value))
    }

    async fn get_locally(&self, key: &str) -> Result<ByteView> {
        debug!("[{}] loading {} from getter", self.name, key);
        let bytes = match self.getter.get(key).await {
            Ok(bytes) => bytes,
            Err(err) => {
                bump(&self.counters.local_load_errs);
                return Err(match err {
                    CacheError::LoadFailed(_) => err,
                    other => CacheError::LoadFailed(other.to_string()),
                });
            }
        };
        bump(&self.counters.local_loads);

        let value = ByteView::from(bytes);
        self.populate_cache(key, value.clone())?;
        Ok(value)
    }

    fn populate_cache(&self, key: &str, value: ByteView) -> Result<()> {
        self.main_cache.add(key, value)
    }

    // == Stats ==
    pub fn stats(&self) -> GroupStats {
        let read = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        let cache = self.main_cache.stats();
        GroupStats {
            name: self.name.clone(),
            gets: read(&self.counters.gets),
            cache_hits: read(&self.counters.cache_hits),
            loads: read(&self.counters.loads),
            dedup_loads: read(&self.counters.dedup_loads),
            peer_loads: read(&self.counters.peer_loads),
            peer_errors: read(&self.counters.peer_errors),
            local_loads: read(&self.counters.local_loads),
            local_load_errs: read(&self.counters.local_load_errs),
            hit_rate: cache.hit_rate(),
            cache,
        }
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("cache", &self.main_cache)
            .field("peers_registered", &self.peers.get().is_some())
            .finish()
    }
}
