//! Indexes for efficient pool lookups.

use express_core::InstanceId;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Entity index: entity name -> instances created as exactly that entity.
#[derive(Debug, Default)]
pub struct EntityIndex {
    index: HashMap<String, BTreeSet<InstanceId>>,
}

impl EntityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: &str, id: InstanceId) {
        self.index.entry(entity.to_string()).or_default().insert(id);
    }

    pub fn remove(&mut self, entity: &str, id: InstanceId) {
        if let Some(set) = self.index.get_mut(entity) {
            set.remove(&id);
            if set.is_empty() {
                self.index.remove(entity);
            }
        }
    }

    pub fn get(&self, entity: &str) -> impl Iterator<Item = InstanceId> + '_ {
        self.index
            .get(entity)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }
}

/// An attribute role: the attribute and the entity that declared it.
///
/// Subtypes inherit the declaring entity's role, so a reference held in an
/// inherited slot is indexed under the supertype that owns the attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Role {
    pub entity: String,
    pub attr: String,
}

impl Role {
    pub fn new(entity: impl Into<String>, attr: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            attr: attr.into(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.attr)
    }
}

/// Reverse-reference index: target -> role -> referencer -> reference count.
///
/// Counts make the index a multiset, so an aggregate holding the same target
/// twice keeps the referencer until both references are gone.
#[derive(Debug, Default)]
pub struct ReverseIndex {
    incoming: HashMap<InstanceId, HashMap<Role, BTreeMap<InstanceId, usize>>>,
}

impl ReverseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, target: InstanceId, role: &Role, referencer: InstanceId) {
        *self
            .incoming
            .entry(target)
            .or_default()
            .entry(role.clone())
            .or_default()
            .entry(referencer)
            .or_default() += 1;
    }

    pub fn remove(&mut self, target: InstanceId, role: &Role, referencer: InstanceId) {
        let Some(roles) = self.incoming.get_mut(&target) else {
            return;
        };
        if let Some(referencers) = roles.get_mut(role) {
            if let Some(count) = referencers.get_mut(&referencer) {
                *count -= 1;
                if *count == 0 {
                    referencers.remove(&referencer);
                }
            }
            if referencers.is_empty() {
                roles.remove(role);
            }
        }
        if roles.is_empty() {
            self.incoming.remove(&target);
        }
    }

    /// Distinct referencers of `target` through `role`, in id order.
    pub fn users(&self, target: InstanceId, role: &Role) -> Vec<InstanceId> {
        self.incoming
            .get(&target)
            .and_then(|roles| roles.get(role))
            .map(|refs| refs.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Distinct referencers of `target` through any role, in id order.
    pub fn all_users(&self, target: InstanceId) -> Vec<InstanceId> {
        let mut users = BTreeSet::new();
        if let Some(roles) = self.incoming.get(&target) {
            for refs in roles.values() {
                users.extend(refs.keys().copied());
            }
        }
        users.into_iter().collect()
    }

    pub fn is_referenced(&self, target: InstanceId) -> bool {
        self.incoming.contains_key(&target)
    }
}
