//! Cache Module
//!
//! Byte-bounded eviction containers (LRU and LFU) and the mutex-guarded
//! [`Cache`] a group owns.

mod lfu;
mod list;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

// Re-export public types
pub use lfu::LfuCache;
pub use lru::LruCache;
pub use stats::CacheStats;
pub use store::Cache;

// == Byte Size ==
/// A value that knows how many bytes it occupies.
pub trait ByteSize {
    fn byte_len(&self) -> usize;
}

impl ByteSize for String {
    fn byte_len(&self) -> usize {
        self.len()
    }
}

impl ByteSize for Vec<u8> {
    fn byte_len(&self) -> usize {
        self.len()
    }
}

/// Callback invoked with every evicted entry, after it has been unlinked.
///
/// Runs while the owning [`Cache`] lock is held and must not call back into
/// that cache.
pub type OnEvicted<V> = Box<dyn FnMut(&str, &V) + Send>;

// == Container ==
/// Shared contract of the eviction policies.
///
/// Every container bounds the sum of `key.len() + value.byte_len()` over its
/// entries by `max_bytes` (0 means unbounded). An `add` that goes over budget
/// evicts until the container fits again, which can evict the entry that was
/// just added.
pub trait Container<V>: Send {
    /// Inserts or overwrites `key`. Overwrites count as an access.
    fn add(&mut self, key: &str, value: V) -> Result<()>;

    /// Looks up `key`, recording the access.
    fn get(&mut self, key: &str) -> Result<Option<&V>>;

    /// Evicts one entry chosen by the policy.
    fn remove_oldest(&mut self) -> Result<Option<(String, V)>>;

    /// Number of entries held.
    fn len(&self) -> usize;

    /// Bytes currently accounted.
    fn bytes(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Accounted size of one entry.
fn entry_size<V: ByteSize>(key: &str, value: &V) -> u64 {
    (key.len() + value.byte_len()) as u64
}

fn missing_entry(key: &str) -> CacheError {
    CacheError::InvariantViolation(format!("index holds '{}' but its entry is gone", key))
}

// == Eviction Policy ==
/// Which container a cache is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    #[default]
    Lru,
    Lfu,
}

impl EvictionPolicy {
    /// Builds an empty container for this policy.
    pub fn build<V>(self, max_bytes: u64, on_evicted: Option<OnEvicted<V>>) -> Box<dyn Container<V>>
    where
        V: ByteSize + Send + 'static,
    {
        match self {
            EvictionPolicy::Lru => Box::new(LruCache::new(max_bytes, on_evicted)),
            EvictionPolicy::Lfu => Box::new(LfuCache::new(max_bytes, on_evicted)),
        }
    }
}

impl FromStr for EvictionPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionPolicy::Lru),
            "lfu" => Ok(EvictionPolicy::Lfu),
            other => Err(CacheError::InvalidRequest(format!(
                "unknown eviction policy '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionPolicy::Lru => f.write_str("lru"),
            EvictionPolicy::Lfu => f.write_str("lfu"),
        }
    }
}
