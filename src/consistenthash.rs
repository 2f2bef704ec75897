//! Consistent Hash Module
//!
//! Maps keys onto a ring of peers, each replicated as several virtual nodes.

use std::collections::HashMap;

/// Hash function used to place keys and virtual nodes on the ring.
pub type HashFn = fn(&[u8]) -> u32;

// == Hash Ring ==
/// Consistent-hash ring over peer identifiers.
///
/// Each peer owns `replicas` points on the ring, hashed from
/// `"{index}{peer}"`. A key belongs to the first point clockwise from its
/// own hash.
#[derive(Debug, Clone)]
pub struct HashRing {
    /// Virtual nodes per peer
    replicas: usize,
    hash: HashFn,
    /// Sorted virtual node hashes
    keys: Vec<u32>,
    /// Virtual node hash -> peer
    hash_map: HashMap<u32, String>,
}

impl HashRing {
    // == Constructor ==
    /// Creates an empty ring. `hash` defaults to CRC-32 (IEEE).
    pub fn new(replicas: usize, hash: Option<HashFn>) -> Self {
        Self {
            replicas,
            hash: hash.unwrap_or(crc32fast::hash),
            keys: Vec::new(),
            hash_map: HashMap::new(),
        }
    }

    // == Add ==
    /// Places every peer on the ring.
    pub fn add<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for peer in peers {
            let peer = peer.as_ref();
            for i in 0..self.replicas {
                let hash = (self.hash)(format!("{}{}", i, peer).as_bytes());
                self.keys.push(hash);
                self.hash_map.insert(hash, peer.to_string());
            }
        }
        self.keys.sort_unstable();
    }

    // == Get ==
    /// Returns the peer owning `key`, or `None` if the ring is empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }

        let hash = (self.hash)(key.as_bytes());
        let idx = self.keys.partition_point(|&k| k < hash);
        let vnode = self.keys[idx % self.keys.len()];
        self.hash_map.get(&vnode).map(String::as_str)
    }

    /// Number of virtual nodes on the ring.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_REPLICAS, None)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    /// Interprets the input as a decimal number so ring positions are obvious.
    fn decimal_hash(data: &[u8]) -> u32 {
        std::str::from_utf8(data)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    #[test]
    fn test_hashing() {
        let mut ring = HashRing::new(3, Some(decimal_hash));

        // virtual nodes: 2, 4, 6, 12, 14, 16, 22, 24, 26
        ring.add(["6", "4", "2"]);

        let cases = [("2", "2"), ("11", "2"), ("23", "4"), ("27", "2")];
        for (key, peer) in cases {
            assert_eq!(ring.get(key), Some(peer), "asking for {key}");
        }

        // adds 8, 18, 28
        ring.add(["8"]);

        // 27 now maps to 8
        let cases = [("2", "2"), ("11", "2"), ("23", "4"), ("27", "8")];
        for (key, peer) in cases {
            assert_eq!(ring.get(key), Some(peer), "asking for {key}");
        }
    }

    #[test]
    fn test_empty_ring() {
        let ring = HashRing::new(3, None);
        assert_eq!(ring.get("anything"), None);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_replicas_per_peer() {
        let mut ring = HashRing::new(50, None);
        ring.add(["http://a:8001", "http://b:8002"]);
        assert_eq!(ring.len(), 100);
        assert!(ring.keys.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_lookup_is_deterministic() {
        let mut ring = HashRing::new(50, None);
        ring.add(["peer-a", "peer-b", "peer-c"]);

        for i in 0..200 {
            let key = format!("key-{i}");
            let first = ring.get(&key).map(str::to_string);
            assert_eq!(ring.get(&key).map(str::to_string), first);
        }
    }

    #[test]
    fn test_adding_peer_moves_bounded_fraction() {
        let mut ring = HashRing::new(50, None);
        ring.add(["peer-a", "peer-b", "peer-c"]);

        let keys: Vec<String> = (0..2000).map(|i| format!("key-{i}")).collect();
        let before: Vec<String> = keys
            .iter()
            .map(|k| ring.get(k).unwrap_or_default().to_string())
            .collect();

        ring.add(["peer-d"]);

        let mut moved = 0;
        for (key, old) in keys.iter().zip(&before) {
            let new = ring.get(key).unwrap_or_default();
            if new != old {
                // keys only ever move to the new peer
                assert_eq!(new, "peer-d");
                moved += 1;
            }
        }
        assert!(moved > 0);
        assert!(moved < keys.len() / 2, "{moved} of {} keys moved", keys.len());
    }
}
