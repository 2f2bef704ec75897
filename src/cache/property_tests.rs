//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the byte accounting and eviction behaviour of both
//! containers against a plain map model.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::{entry_size, Container, EvictionPolicy, OnEvicted};

// == Strategies ==
/// Generates cache keys from a small alphabet so that operations collide
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,3}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,16}".prop_map(|s| s)
}

fn policy_strategy() -> impl Strategy<Value = EvictionPolicy> {
    prop_oneof![Just(EvictionPolicy::Lru), Just(EvictionPolicy::Lfu)]
}

#[derive(Debug, Clone)]
enum CacheOp {
    Add { key: String, value: String },
    Get { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Add { key, value }),
        1 => key_strategy().prop_map(|key| CacheOp::Get { key }),
    ]
}

/// Builds a container whose evicted keys are collected into the returned log.
fn recording_container(
    policy: EvictionPolicy,
    max_bytes: u64,
) -> (Box<dyn Container<String>>, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let on_evicted: OnEvicted<String> = Box::new(move |key: &str, _: &String| {
        sink.lock().push(key.to_string());
    });
    (policy.build(max_bytes, Some(on_evicted)), log)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Byte accounting always matches the entries held, stays within budget,
    // and every eviction is reported to the callback exactly once.
    #[test]
    fn prop_bytes_match_entries(
        policy in policy_strategy(),
        max_bytes in 1u64..64,
        ops in prop::collection::vec(cache_op_strategy(), 1..80),
    ) {
        let (mut container, log) = recording_container(policy, max_bytes);
        let mut model: HashMap<String, String> = HashMap::new();

        for op in ops {
            match op {
                CacheOp::Add { key, value } => {
                    container.add(&key, value.clone()).unwrap();
                    model.insert(key, value);
                }
                CacheOp::Get { key } => {
                    let found = container.get(&key).unwrap().cloned();
                    prop_assert_eq!(found.as_ref(), model.get(&key));
                }
            }

            for evicted in log.lock().drain(..) {
                prop_assert!(model.remove(&evicted).is_some(), "{} evicted twice", evicted);
            }

            let expected: u64 = model.iter().map(|(k, v)| entry_size(k, v)).sum();
            prop_assert_eq!(container.bytes(), expected);
            prop_assert!(container.bytes() <= max_bytes);
            prop_assert_eq!(container.len(), model.len());
        }
    }

    // An unbounded container never evicts.
    #[test]
    fn prop_unbounded_never_evicts(
        policy in policy_strategy(),
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..60),
    ) {
        let (mut container, log) = recording_container(policy, 0);

        for (key, value) in &entries {
            container.add(key, value.clone()).unwrap();
        }

        let distinct: HashSet<&String> = entries.iter().map(|(k, _)| k).collect();
        prop_assert_eq!(container.len(), distinct.len());
        prop_assert!(log.lock().is_empty());
    }

    // Under LRU the entry just added survives whenever it fits on its own.
    #[test]
    fn prop_lru_keeps_latest(
        max_bytes in 4u64..64,
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..60),
    ) {
        let (mut container, _log) = recording_container(EvictionPolicy::Lru, max_bytes);

        for (key, value) in entries {
            let fits = entry_size(&key, &value) <= max_bytes;
            container.add(&key, value.clone()).unwrap();
            prop_assert_eq!(container.get(&key).unwrap().is_some(), fits);
        }
    }
}
