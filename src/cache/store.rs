//! Cache Store Module
//!
//! Mutex-guarded eviction container holding [`ByteView`] values.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::byteview::ByteView;
use crate::cache::{CacheStats, Container, EvictionPolicy, OnEvicted};
use crate::error::Result;

struct Inner {
    container: Box<dyn Container<ByteView>>,
    stats: CacheStats,
}

// == Cache ==
/// One eviction container behind a single lock.
///
/// Every operation on the container is serialized by the lock, and a value
/// added is visible to every later `get` from any thread.
pub struct Cache {
    policy: EvictionPolicy,
    max_bytes: u64,
    inner: Mutex<Inner>,
    evictions: Arc<AtomicU64>,
}

impl Cache {
    // == Constructor ==
    /// Creates a cache bounded to `max_bytes` (0 = unbounded).
    ///
    /// `on_evicted` runs under the cache lock and must not touch this cache.
    pub fn new(
        max_bytes: u64,
        policy: EvictionPolicy,
        on_evicted: Option<OnEvicted<ByteView>>,
    ) -> Self {
        let evictions = Arc::new(AtomicU64::new(0));
        let counter = evictions.clone();
        let mut user_callback = on_evicted;
        let callback: OnEvicted<ByteView> = Box::new(move |key, value| {
            counter.fetch_add(1, Ordering::Relaxed);
            if let Some(cb) = user_callback.as_mut() {
                cb(key, value);
            }
        });

        Self {
            policy,
            max_bytes,
            inner: Mutex::new(Inner {
                container: policy.build(max_bytes, Some(callback)),
                stats: CacheStats::new(),
            }),
            evictions,
        }
    }

    /// Wraps an already built container. Its evictions are not counted.
    #[cfg(test)]
    pub(crate) fn from_container(
        policy: EvictionPolicy,
        max_bytes: u64,
        container: Box<dyn Container<ByteView>>,
    ) -> Self {
        Self {
            policy,
            max_bytes,
            inner: Mutex::new(Inner {
                container,
                stats: CacheStats::new(),
            }),
            evictions: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    // == Add ==
    /// Stores `value` under `key`, evicting as needed.
    pub fn add(&self, key: &str, value: ByteView) -> Result<()> {
        self.inner.lock().container.add(key, value)
    }

    // == Get ==
    /// Returns a shared handle to the cached value, if present.
    pub fn get(&self, key: &str) -> Result<Option<ByteView>> {
        let mut inner = self.inner.lock();
        let Inner { container, stats } = &mut *inner;
        let found = container.get(key)?.cloned();
        match found {
            Some(_) => stats.record_hit(),
            None => stats.record_miss(),
        }
        Ok(found)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bytes(&self) -> u64 {
        self.inner.lock().container.bytes()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let mut stats = inner.stats.clone();
        stats.evictions = self.evictions.load(Ordering::Relaxed);
        stats.entries = inner.container.len();
        stats.bytes = inner.container.bytes();
        stats
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("policy", &self.policy)
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}
