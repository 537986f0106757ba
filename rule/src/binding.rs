//! Variable bindings for rule evaluation.

use express_core::{InstanceId, Value};
use std::collections::HashMap;

/// The evaluation scope: the instance bound to `SELF` plus named variables
/// (QUERY iteration variables, global-rule extents).
///
/// Variable names are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    self_id: Option<InstanceId>,
    map: HashMap<String, Value>,
}

impl Bindings {
    /// Create new empty bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bindings with `SELF` set to an instance.
    pub fn for_instance(id: InstanceId) -> Self {
        Self {
            self_id: Some(id),
            map: HashMap::new(),
        }
    }

    /// The instance bound to `SELF`, if any.
    pub fn self_id(&self) -> Option<InstanceId> {
        self.self_id
    }

    /// Insert a binding.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<Value>) {
        self.map.insert(name.as_ref().to_uppercase(), value.into());
    }

    /// Get a binding by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.map.get(&name.to_uppercase())
    }

    /// Check if a variable is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Clone with an additional binding.
    pub fn extend_with(&self, name: impl AsRef<str>, value: impl Into<Value>) -> Self {
        let mut new_bindings = self.clone();
        new_bindings.insert(name, value);
        new_bindings
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindings_insert_and_get_ignore_case() {
        let mut bindings = Bindings::new();
        bindings.insert("x", InstanceId::new(1));
        bindings.insert("Y", Value::Integer(42));

        assert!(bindings.contains("X"));
        assert!(bindings.contains("y"));
        assert!(!bindings.contains("z"));
        assert_eq!(bindings.get("x"), Some(&Value::EntityRef(InstanceId::new(1))));
        assert_eq!(bindings.self_id(), None);
    }

    #[test]
    fn test_bindings_extend_with_keeps_self() {
        let bindings = Bindings::for_instance(InstanceId::new(7));
        let extended = bindings.extend_with("item", InstanceId::new(2));

        assert!(!bindings.contains("item"));
        assert!(extended.contains("item"));
        assert_eq!(extended.self_id(), Some(InstanceId::new(7)));
        assert_eq!(extended.len(), 1);
    }
}
