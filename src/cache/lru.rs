//! LRU Container Module
//!
//! Least Recently Used eviction over a byte budget.

use std::collections::HashMap;
use std::fmt;

use super::list::{Chain, Slab, SlotId};
use super::{entry_size, missing_entry, ByteSize, Container, OnEvicted};
use crate::error::Result;

struct Node<V> {
    key: String,
    value: V,
}

// == LRU Cache ==
/// Byte-bounded container that evicts the least recently used entry.
///
/// Entries are kept in one recency chain:
/// - Front = Most recently used
/// - Back = Least recently used
pub struct LruCache<V> {
    /// Byte budget, 0 = unbounded
    max_bytes: u64,
    /// Bytes currently held
    n_bytes: u64,
    slab: Slab<Node<V>>,
    order: Chain,
    index: HashMap<String, SlotId>,
    on_evicted: Option<OnEvicted<V>>,
}

impl<V: ByteSize + Send> LruCache<V> {
    // == Constructor ==
    /// Creates an empty container bounded to `max_bytes`.
    pub fn new(max_bytes: u64, on_evicted: Option<OnEvicted<V>>) -> Self {
        Self {
            max_bytes,
            n_bytes: 0,
            slab: Slab::new(),
            order: Chain::new(),
            index: HashMap::new(),
            on_evicted,
        }
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
    fn keys_mru_first(&self) -> Vec<String> {
        self.slab.iter(&self.order).map(|n| n.key.clone()).collect()
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let nodes: Vec<&Node<V>> = self.slab.iter(&self.order).collect();
        assert_eq!(nodes.len(), self.index.len());
        assert_eq!(self.slab.len(), self.index.len());
        let total: u64 = nodes.iter().map(|n| entry_size(&n.key, &n.value)).sum();
        assert_eq!(total, self.n_bytes);
        for node in nodes {
            assert!(self.index.contains_key(&node.key));
        }
    }
}

impl<V: ByteSize + Send> Container<V> for LruCache<V> {
    // == Add ==
    fn add(&mut self, key: &str, value: V) -> Result<()> {
        if let Some(&id) = self.index.get(key) {
            self.slab.move_to_front(&mut self.order, id);
            let node = self.slab.get_mut(id).ok_or_else(|| missing_entry(key))?;
            self.n_bytes = self.n_bytes + value.byte_len() as u64 - node.value.byte_len() as u64;
            node.value = value;
        } else {
            self.n_bytes += entry_size(key, &value);
            let id = self.slab.insert(Node {
                key: key.to_string(),
                value,
            });
            self.slab.push_front(&mut self.order, id);
            self.index.insert(key.to_string(), id);
        }
        self.evict_to_budget()
    }

    // == Get ==
    fn get(&mut self, key: &str) -> Result<Option<&V>> {
        let Some(&id) = self.index.get(key) else {
            return Ok(None);
        };
        self.slab.move_to_front(&mut self.order, id);
        self.slab
            .get(id)
            .map(|node| Some(&node.value))
            .ok_or_else(|| missing_entry(key))
    }

    // == Evict Oldest ==
    fn remove_oldest(&mut self) -> Result<Option<(String, V)>> {
        let Some(id) = self.order.back() else {
            return Ok(None);
        };
        self.slab.unlink(&mut self.order, id);
        let Some(node) = self.slab.take(id) else {
            return Err(missing_entry("<lru tail>"));
        };
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

impl<V> fmt::Debug for LruCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("max_bytes", &self.max_bytes)
            .field("n_bytes", &self.n_bytes)
            .field("len", &self.index.len())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn value(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn test_lru_get() {
        let mut lru = LruCache::new(0, None);
        lru.add("key1", value("1234")).unwrap();

        assert_eq!(lru.get("key1").unwrap(), Some(&value("1234")));
        assert_eq!(lru.get("key2").unwrap(), None);
        lru.assert_invariants();
    }

    #[test]
    fn test_lru_remove_oldest_on_overflow() {
        let (k1, k2, k3) = ("key1", "key2", "k3");
        let (v1, v2, v3) = ("value1", "value2", "v3");
        let cap = (k1.len() + k2.len() + v1.len() + v2.len()) as u64;
        let mut lru = LruCache::new(cap, None);

        lru.add(k1, value(v1)).unwrap();
        lru.add(k2, value(v2)).unwrap();
        lru.add(k3, value(v3)).unwrap();

        assert_eq!(lru.get(k1).unwrap(), None);
        assert_eq!(lru.len(), 2);
        lru.assert_invariants();
    }

    #[test]
    fn test_lru_get_refreshes_recency() {
        let mut lru = LruCache::new(9, None);
        lru.add("a", value("11")).unwrap();
        lru.add("b", value("22")).unwrap();
        lru.add("c", value("33")).unwrap();

        // a becomes most recent, so b is the next victim
        lru.get("a").unwrap();
        lru.add("d", value("44")).unwrap();

        assert_eq!(lru.get("b").unwrap(), None);
        assert!(lru.get("a").unwrap().is_some());
        assert_eq!(lru.keys_mru_first(), vec!["a", "d", "c"]);
    }

    #[test]
    fn test_lru_overwrite_adjusts_bytes() {
        let mut lru = LruCache::new(0, None);
        lru.add("key", value("short")).unwrap();
        assert_eq!(lru.bytes(), 8);

        lru.add("key", value("a longer value")).unwrap();
        assert_eq!(lru.bytes(), 17);
        assert_eq!(lru.len(), 1);

        lru.add("key", value("")).unwrap();
        assert_eq!(lru.bytes(), 3);
        lru.assert_invariants();
    }

    #[test]
    fn test_lru_overwrite_counts_as_access() {
        let mut lru = LruCache::new(0, None);
        lru.add("a", value("1")).unwrap();
        lru.add("b", value("2")).unwrap();
        lru.add("a", value("3")).unwrap();

        let (key, _) = lru.remove_oldest().unwrap().unwrap();
        assert_eq!(key, "b");
    }

    #[test]
    fn test_lru_oversized_entry_evicts_itself() {
        let mut lru = LruCache::new(8, None);
        lru.add("a", value("1")).unwrap();
        lru.add("huge", value("0123456789")).unwrap();

        assert!(lru.is_empty());
        assert_eq!(lru.bytes(), 0);
    }

    #[test]
    fn test_lru_unbounded_never_evicts() {
        let mut lru = LruCache::new(0, None);
        for i in 0..500 {
            lru.add(&format!("key{i}"), value("some value")).unwrap();
        }
        assert_eq!(lru.len(), 500);
    }

    #[test]
    fn test_lru_remove_oldest_empty() {
        let mut lru: LruCache<String> = LruCache::new(0, None);
        assert!(lru.remove_oldest().unwrap().is_none());
    }

    #[test]
    fn test_lru_on_evicted() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = evicted.clone();
        let callback: OnEvicted<String> = Box::new(move |key, value| {
            sink.lock().unwrap().push((key.to_string(), value.clone()));
        });

        let mut lru = LruCache::new(10, Some(callback));
        lru.add("key1", value("123456")).unwrap();
        lru.add("k2", value("k2")).unwrap();
        lru.add("k3", value("k3")).unwrap();
        lru.add("k4", value("k4")).unwrap();

        let evicted = evicted.lock().unwrap();
        assert_eq!(
            *evicted,
            vec![
                ("key1".to_string(), "123456".to_string()),
                ("k2".to_string(), "k2".to_string()),
            ]
        );
    }
}
