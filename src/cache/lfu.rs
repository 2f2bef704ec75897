//! LFU Container Module
//!
//! Least Frequently Used eviction over a byte budget, with O(1) frequency
//! bookkeeping.
//!
//! Every entry sits in the chain of its current access frequency. Each chain
//! is ordered most-recently-touched first, so the victim is the tail of the
//! chain at `min_freq`: the least frequently used entry, oldest first among
//! ties. Non-empty buckets are linked to each other in ascending frequency
//! order, so `min_freq` can move to the next bucket without a scan.
//!
//! ```text
//!   min_freq = 1
//!      │
//!      ▼
//!   freq=1: head ─► [k3] ◄──► [k2] ◄── tail (evicted first)
//!      │ next
//!      ▼
//!   freq=3: head ─► [k1] ◄── tail
//! ```

use std::collections::HashMap;
use std::fmt;

use super::list::{Chain, Slab, SlotId};
use super::{entry_size, missing_entry, ByteSize, Container, OnEvicted};
use crate::error::{CacheError, Result};

struct Node<V> {
    key: String,
    value: V,
    freq: u64,
}

/// Entries sharing one frequency, plus links to the neighbouring buckets.
#[derive(Debug, Default)]
struct Bucket {
    chain: Chain,
    /// Next lower non-empty frequency
    prev: Option<u64>,
    /// Next higher non-empty frequency
    next: Option<u64>,
}

// == LFU Cache ==
/// Byte-bounded container that evicts the least frequently used entry.
pub struct LfuCache<V> {
    /// Byte budget, 0 = unbounded
    max_bytes: u64,
    /// Bytes currently held
    n_bytes: u64,
    /// Lowest frequency with a non-empty bucket, 0 when empty
    min_freq: u64,
    slab: Slab<Node<V>>,
    index: HashMap<String, SlotId>,
    buckets: HashMap<u64, Bucket>,
    on_evicted: Option<OnEvicted<V>>,
}

impl<V: ByteSize + Send> LfuCache<V> {
    // == Constructor ==
    /// Creates an empty container bounded to `max_bytes`.
    pub fn new(max_bytes: u64, on_evicted: Option<OnEvicted<V>>) -> Self {
        Self {
            max_bytes,
            n_bytes: 0,
            min_freq: 0,
            slab: Slab::new(),
            index: HashMap::new(),
            buckets: HashMap::new(),
            on_evicted,
        }
    }

    /// Access count of `key`, if present.
    pub fn frequency(&self, key: &str) -> Option<u64> {
        let id = self.index.get(key)?;
        self.slab.get(*id).map(|node| node.freq)
    }

    /// Creates an empty bucket for `freq` directly above `prev`, or below
    /// every other bucket when `prev` is `None`.
    fn link_bucket(&mut self, freq: u64, prev: Option<u64>) -> Result<()> {
        let next = match prev {
            Some(p) => {
                let below = bucket_mut(&mut self.buckets, p)?;
                let next = below.next;
                below.next = Some(freq);
                next
            }
            None => self
                .buckets
                .contains_key(&self.min_freq)
                .then_some(self.min_freq),
        };
        if let Some(n) = next {
            bucket_mut(&mut self.buckets, n)?.prev = Some(freq);
        }

        self.buckets.insert(
            freq,
            Bucket {
                chain: Chain::new(),
                prev,
                next,
            },
        );
        Ok(())
    }

    /// Drops the now empty bucket for `freq`, joining its neighbours.
    fn unlink_bucket(&mut self, freq: u64) -> Result<()> {
        let bucket = self
            .buckets
            .remove(&freq)
            .ok_or_else(|| missing_bucket(freq))?;
        if let Some(p) = bucket.prev {
            bucket_mut(&mut self.buckets, p)?.next = bucket.next;
        }
        if let Some(n) = bucket.next {
            bucket_mut(&mut self.buckets, n)?.prev = bucket.prev;
        }
        if self.min_freq == freq {
            self.min_freq = bucket.next.unwrap_or(0);
        }
        Ok(())
    }

    /// Moves `id` from its bucket to the head of the next one up.
    fn touch(&mut self, id: SlotId) -> Result<()> {
        let freq = match self.slab.get(id) {
            Some(node) => node.freq,
            None => return Err(missing_entry("<lfu touch>")),
        };
        let next = freq + 1;
        if !self.buckets.contains_key(&next) {
            self.link_bucket(next, Some(freq))?;
        }

        let bucket = bucket_mut(&mut self.buckets, freq)?;
        self.slab.unlink(&mut bucket.chain, id);
        let emptied = bucket.chain.is_empty();

        if let Some(node) = self.slab.get_mut(id) {
            node.freq = next;
        }
        let target = bucket_mut(&mut self.buckets, next)?;
        self.slab.push_front(&mut target.chain, id);

        if emptied {
            self.unlink_bucket(freq)?;
        }
        Ok(())
    }

    fn evict_to_budget(&mut self) -> Result<()> {
        while self.max_bytes != 0 && self.n_bytes > self.max_bytes {
            if self.remove_oldest()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let mut seen = 0usize;
        let mut total = 0u64;
        for (freq, bucket) in &self.buckets {
            assert!(!bucket.chain.is_empty(), "empty bucket {freq} kept");
            assert!(*freq >= self.min_freq);
            for node in self.slab.iter(&bucket.chain) {
                assert_eq!(node.freq, *freq);
                assert!(self.index.contains_key(&node.key));
                total += entry_size(&node.key, &node.value);
                seen += 1;
            }
        }
        assert_eq!(seen, self.index.len());
        assert_eq!(self.slab.len(), self.index.len());
        assert_eq!(total, self.n_bytes);

        // walking the links from min_freq visits every bucket in order
        let mut walked = 0usize;
        let mut prev = None;
        let mut current = (!self.index.is_empty()).then_some(self.min_freq);
        while let Some(freq) = current {
            let bucket = &self.buckets[&freq];
            assert_eq!(bucket.prev, prev);
            if let Some(p) = prev {
                assert!(p < freq);
            }
            walked += 1;
            prev = Some(freq);
            current = bucket.next;
        }
        assert_eq!(walked, self.buckets.len());
    }
}

fn bucket_mut(buckets: &mut HashMap<u64, Bucket>, freq: u64) -> Result<&mut Bucket> {
    buckets.get_mut(&freq).ok_or_else(|| missing_bucket(freq))
}

fn missing_bucket(freq: u64) -> CacheError {
    CacheError::InvariantViolation(format!("frequency bucket {} missing", freq))
}

impl<V: ByteSize + Send> Container<V> for LfuCache<V> {
    // == Add ==
    fn add(&mut self, key: &str, value: V) -> Result<()> {
        if let Some(&id) = self.index.get(key) {
            let node = self.slab.get_mut(id).ok_or_else(|| missing_entry(key))?;
            self.n_bytes = self.n_bytes + value.byte_len() as u64 - node.value.byte_len() as u64;
            node.value = value;
            self.touch(id)?;
        } else {
            if !self.buckets.contains_key(&1) {
                self.link_bucket(1, None)?;
            }
            self.n_bytes += entry_size(key, &value);
            let id = self.slab.insert(Node {
                key: key.to_string(),
                value,
                freq: 1,
            });
            let bucket = bucket_mut(&mut self.buckets, 1)?;
            self.slab.push_front(&mut bucket.chain, id);
            self.index.insert(key.to_string(), id);
            self.min_freq = 1;
        }
        self.evict_to_budget()
    }

    // == Get ==
    fn get(&mut self, key: &str) -> Result<Option<&V>> {
        let Some(&id) = self.index.get(key) else {
            return Ok(None);
        };
        self.touch(id)?;
        self.slab
            .get(id)
            .map(|node| Some(&node.value))
            .ok_or_else(|| missing_entry(key))
    }

    // == Evict Least Frequent ==
    fn remove_oldest(&mut self) -> Result<Option<(String, V)>> {
        if self.index.is_empty() {
            return Ok(None);
        }

        let freq = self.min_freq;
        let bucket = bucket_mut(&mut self.buckets, freq)?;
        let id = bucket.chain.back().ok_or_else(|| missing_bucket(freq))?;
        self.slab.unlink(&mut bucket.chain, id);
        if bucket.chain.is_empty() {
            self.unlink_bucket(freq)?;
        }

        let node = self.slab.take(id).ok_or_else(|| missing_entry("<lfu tail>"))?;
        self.index.remove(&node.key);
        self.n_bytes -= entry_size(&node.key, &node.value);

        if let Some(on_evicted) = self.on_evicted.as_mut() {
            on_evicted(&node.key, &node.value);
        }
        Ok(Some((node.key, node.value)))
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn bytes(&self) -> u64 {
        self.n_bytes
    }
}

impl<V> fmt::Debug for LfuCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LfuCache")
            .field("max_bytes", &self.max_bytes)
            .field("n_bytes", &self.n_bytes)
            .field("min_freq", &self.min_freq)
            .field("len", &self.index.len())
            .finish()
    }
}
