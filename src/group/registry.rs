//! Group Registry Module
//!
//! Name -> group lookup shared by the HTTP handlers.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use super::{Getter, Group};
use crate::cache::EvictionPolicy;

// == Group Registry ==
/// Groups served by this node, by name.
#[derive(Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // == New Group ==
    /// Creates a group and registers it, replacing any group with that name.
    pub fn new_group(
        &self,
        name: impl Into<String>,
        cache_bytes: u64,
        policy: EvictionPolicy,
        getter: impl Getter + 'static,
    ) -> Arc<Group> {
        self.insert(Group::new(name, cache_bytes, policy, getter))
    }

    /// Registers an already built group.
    pub fn insert(&self, group: Group) -> Arc<Group> {
        let group = Arc::new(group);
        info!(
            "Group '{}' registered ({} bytes, {})",
            group.name(),
            group.cache().max_bytes(),
            group.cache().policy()
        );
        self.groups
            .write()
            .insert(group.name().to_string(), group.clone());
        group
    }

    // == Get ==
    pub fn get(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().get(name).cloned()
    }

    /// Names of the registered groups, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// All registered groups, sorted by name.
    pub fn groups(&self) -> Vec<Arc<Group>> {
        let mut groups: Vec<Arc<Group>> = self.groups.read().values().cloned().collect();
        groups.sort_by(|a, b| a.name().cmp(b.name()));
        groups
    }
}
