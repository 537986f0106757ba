//! Entity instance structure.
//!
//! An instance is a single flattened record: every explicit attribute of the
//! entity and all of its ancestors, in layout order, under one identity.

use crate::{Attributes, InstanceId, Value};

/// An entity instance.
#[derive(Debug, Clone)]
pub struct Instance {
    /// Pool-unique identifier for this instance.
    pub id: InstanceId,
    /// Canonical name of the instantiated entity.
    pub entity: String,
    /// Write counter, bumped on every attribute change.
    pub version: u64,
    /// Explicit attribute values in flattened layout order.
    pub attributes: Attributes,
}

impl Instance {
    /// Create a new instance with the given properties.
    pub fn new(id: InstanceId, entity: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            id,
            entity: entity.into(),
            version: 1,
            attributes,
        }
    }

    /// Get an attribute value by name.
    pub fn get_attr(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Replace an existing slot, returning the previous value.
    ///
    /// Returns `None` (and leaves the instance untouched) if the slot does not exist.
    pub fn replace_attr(&mut self, name: &str, value: Value) -> Option<Value> {
        let slot = self.attributes.get_mut(name)?;
        let old = std::mem::replace(slot, value);
        self.version += 1;
        Some(old)
    }

    /// Slot values in layout order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.attributes.values()
    }

    /// Every instance this one references, with the slot holding each reference.
    pub fn references(&self) -> impl Iterator<Item = (&str, InstanceId)> + '_ {
        self.attributes.iter().flat_map(|(name, value)| {
            value
                .entity_refs()
                .into_iter()
                .map(move |id| (name.as_str(), id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;

    #[test]
    fn test_instance_creation() {
        let inst = Instance::new(InstanceId::new(1), "POINT", attrs! { "name" => "origin" });

        assert_eq!(inst.id, InstanceId::new(1));
        assert_eq!(inst.entity, "POINT");
        assert_eq!(inst.version, 1);
        assert_eq!(inst.get_attr("name"), Some(&Value::String("origin".into())));
    }

    #[test]
    fn test_replace_attr_bumps_version() {
        let mut inst = Instance::new(InstanceId::new(1), "POINT", attrs! { "name" => "a" });

        let old = inst.replace_attr("name", Value::String("b".into()));
        assert_eq!(old, Some(Value::String("a".into())));
        assert_eq!(inst.version, 2);

        assert_eq!(inst.replace_attr("missing", Value::Undefined), None);
        assert_eq!(inst.version, 2);
    }

    #[test]
    fn test_references_report_owning_slot() {
        let inst = Instance::new(
            InstanceId::new(3),
            "SHAPE_ASPECT",
            attrs! {
                "name" => "a",
                "of_shape" => InstanceId::new(1),
                "users" => vec![Value::EntityRef(InstanceId::new(2))],
            },
        );

        let refs: Vec<_> = inst.references().collect();
        assert_eq!(
            refs,
            vec![("of_shape", InstanceId::new(1)), ("users", InstanceId::new(2))]
        );
    }
}
