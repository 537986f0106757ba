//! Live instance storage.

use crate::index::{EntityIndex, ReverseIndex, Role};
use express_core::{Attributes, Instance, InstanceId, PoolError, PoolResult, Value};
use express_registry::{canonical_attr, Registry};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, trace};

/// ID allocator for instances. Identifiers are never reused.
#[derive(Debug)]
struct IdAllocator {
    next_id: u64,
}

impl IdAllocator {
    fn new() -> Self {
        Self { next_id: 1 }
    }

    fn alloc(&mut self) -> InstanceId {
        let id = InstanceId::new(self.next_id);
        self.next_id += 1;
        id
    }
}

/// The live instances of one exchange structure.
///
/// The pool performs no type checking; it trusts its caller (the mutation
/// layer) to hand it conformant values. It does own the invariant that the
/// reverse index mirrors the forward references exactly.
#[derive(Debug)]
pub struct InstancePool {
    registry: Arc<Registry>,
    instances: BTreeMap<InstanceId, Instance>,
    id_alloc: IdAllocator,
    entity_index: EntityIndex,
    reverse_index: ReverseIndex,
}

impl InstancePool {
    /// Create a new empty pool over a schema.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            instances: BTreeMap::new(),
            id_alloc: IdAllocator::new(),
            entity_index: EntityIndex::new(),
            reverse_index: ReverseIndex::new(),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    // ==================== Instance Operations ====================

    /// Store a new instance of `entity`.
    ///
    /// Slots are laid out in the entity's flattened order; slots missing from
    /// `attributes` are stored as `Undefined`.
    pub fn insert(&mut self, entity: &str, attributes: Attributes) -> PoolResult<InstanceId> {
        let layout = self
            .registry
            .layout(entity)
            .ok_or_else(|| PoolError::UnknownEntity(entity.to_string()))?;

        if let Some(extra) = attributes.keys().find(|k| layout.slot(k).is_none()) {
            return Err(PoolError::attribute_not_found(&layout.entity, extra.as_str()));
        }

        let mut attributes = attributes;
        let mut ordered = Attributes::with_capacity(layout.arity());
        for slot in layout.slots() {
            let value = attributes.swap_remove(&slot.name).unwrap_or(Value::Undefined);
            ordered.insert(slot.name.clone(), value);
        }

        let id = self.id_alloc.alloc();
        let instance = Instance::new(id, layout.entity.clone(), ordered);

        for slot in layout.slots() {
            if let Some(value) = instance.get_attr(&slot.name) {
                let role = Role::new(&slot.owner, &slot.name);
                for target in value.entity_refs() {
                    trace!(%target, %role, referencer = %id, "index reference");
                    self.reverse_index.insert(target, &role, id);
                }
            }
        }
        self.entity_index.insert(&layout.entity, id);

        debug!(%id, entity = %layout.entity, "instance stored");
        self.instances.insert(id, instance);
        Ok(id)
    }

    /// Get an instance by ID.
    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(&id)
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.instances.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// All instances in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values()
    }

    /// Replace a stored slot, returning the previous value.
    ///
    /// References dropped by the write leave the reverse index before the
    /// new ones are added, within the same call.
    pub fn set_attribute(&mut self, id: InstanceId, attr: &str, value: Value) -> PoolResult<Value> {
        let registry = Arc::clone(&self.registry);
        let instance = self
            .instances
            .get_mut(&id)
            .ok_or(PoolError::InstanceNotFound(id))?;
        let layout = registry
            .layout(&instance.entity)
            .ok_or_else(|| PoolError::UnknownEntity(instance.entity.clone()))?;
        let slot = layout
            .slot(attr)
            .ok_or_else(|| PoolError::attribute_not_found(&instance.entity, attr))?;
        let role = Role::new(&slot.owner, &slot.name);

        let added = value.entity_refs();
        let old = instance
            .replace_attr(&slot.name, value)
            .ok_or_else(|| PoolError::attribute_not_found(&layout.entity, attr))?;

        for target in old.entity_refs() {
            trace!(%target, %role, referencer = %id, "unindex reference");
            self.reverse_index.remove(target, &role, id);
        }
        for target in added {
            trace!(%target, %role, referencer = %id, "index reference");
            self.reverse_index.insert(target, &role, id);
        }

        debug!(%id, entity = %layout.entity, attr = %slot.name, "attribute written");
        Ok(old)
    }

    /// Remove an instance.
    ///
    /// Fails with `InstanceReferenced` while any other instance still refers
    /// to it; references an instance holds to itself do not count.
    pub fn remove(&mut self, id: InstanceId) -> PoolResult<Instance> {
        if !self.instances.contains_key(&id) {
            return Err(PoolError::InstanceNotFound(id));
        }

        let referencers: Vec<InstanceId> = self
            .reverse_index
            .all_users(id)
            .into_iter()
            .filter(|r| *r != id)
            .collect();
        if !referencers.is_empty() {
            return Err(PoolError::InstanceReferenced { id, referencers });
        }

        let registry = Arc::clone(&self.registry);
        let instance = self
            .instances
            .remove(&id)
            .ok_or(PoolError::InstanceNotFound(id))?;
        if let Some(layout) = registry.layout(&instance.entity) {
            for slot in layout.slots() {
                if let Some(value) = instance.get_attr(&slot.name) {
                    let role = Role::new(&slot.owner, &slot.name);
                    for target in value.entity_refs() {
                        self.reverse_index.remove(target, &role, id);
                    }
                }
            }
        }
        self.entity_index.remove(&instance.entity, id);

        debug!(%id, entity = %instance.entity, "instance removed");
        Ok(instance)
    }

    // ==================== Reference Queries ====================

    /// Instances referencing `target` through `role`.
    pub fn users(&self, target: InstanceId, role: &Role) -> Vec<InstanceId> {
        self.reverse_index.users(target, role)
    }

    /// Instances referencing `target` through any attribute.
    pub fn all_users(&self, target: InstanceId) -> Vec<InstanceId> {
        self.reverse_index.all_users(target)
    }

    /// USEDIN: instances referencing `target` through the attribute named by
    /// `path` (`ENTITY.ATTR` or `SCHEMA.ENTITY.ATTR`).
    ///
    /// Only referencers that are instances of `ENTITY` (or a subtype) count.
    /// An empty path selects every referencer; a path naming no known
    /// attribute selects none.
    pub fn used_in(&self, target: InstanceId, path: &str) -> Vec<InstanceId> {
        let path = path.trim();
        if path.is_empty() {
            return self.all_users(target);
        }
        let Some((entity, attr)) = path.rsplit_once('.') else {
            return Vec::new();
        };
        let Some(layout) = self.registry.layout(entity) else {
            return Vec::new();
        };
        let Some(slot) = layout.slot(&canonical_attr(attr)) else {
            return Vec::new();
        };

        let role = Role::new(&slot.owner, &slot.name);
        self.users(target, &role)
            .into_iter()
            .filter(|id| self.is_instance_of(*id, &layout.entity))
            .collect()
    }

    /// Check whether an instance's entity is `entity` or one of its subtypes.
    pub fn is_instance_of(&self, id: InstanceId, entity: &str) -> bool {
        self.instances
            .get(&id)
            .map(|inst| self.registry.is_kind_of(&inst.entity, entity))
            .unwrap_or(false)
    }

    /// Live instances of `entity` and all of its subtypes, in id order.
    pub fn extent(&self, entity: &str) -> Vec<InstanceId> {
        let Some(name) = self.registry.canonical_name(entity) else {
            return Vec::new();
        };
        let mut ids: BTreeSet<InstanceId> = self.entity_index.get(name).collect();
        for sub in self.registry.subtypes(name) {
            ids.extend(self.entity_index.get(sub));
        }
        ids.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use express_core::attrs;
    use express_registry::{AttrDef, RegistryBuilder};
    use pretty_assertions::assert_eq;

    fn registry() -> Arc<Registry> {
        let mut builder = RegistryBuilder::new("index_attribute");
        builder
            .entity("shape_aspect")
            .attr(AttrDef::new("name", "STRING"))
            .done()
            .unwrap();
        builder
            .entity("datum")
            .subtype_of("shape_aspect")
            .done()
            .unwrap();
        let items = builder
            .aggregate(express_core::AggregateKind::Set, "shape_aspect", 1, None)
            .unwrap();
        builder
            .entity("index_attribute")
            .attr(AttrDef::new("identified_item", "shape_aspect"))
            .done()
            .unwrap();
        builder
            .entity("special_index")
            .subtype_of("index_attribute")
            .done()
            .unwrap();
        builder
            .entity("group")
            .attr(AttrDef::new("items", items))
            .done()
            .unwrap();
        Arc::new(builder.build().unwrap())
    }

    // ========== TEST: insert_orders_slots ==========
    #[test]
    fn test_insert_orders_slots_and_fills_undefined() {
        // GIVEN an empty pool
        let mut pool = InstancePool::new(registry());

        // WHEN inserting with no attributes
        let id = pool.insert("index_attribute.datum", attrs! {}).unwrap();

        // THEN the instance has every slot, undefined
        let inst = pool.get(id).unwrap();
        assert_eq!(inst.entity, "DATUM");
        assert_eq!(inst.get_attr("name"), Some(&Value::Undefined));
        assert_eq!(id, InstanceId::new(1));
    }

    // ========== TEST: insert_unknown_slot ==========
    #[test]
    fn test_insert_rejects_unknown_slot() {
        let mut pool = InstancePool::new(registry());

        let result = pool.insert("shape_aspect", attrs! { "colour" => "red" });

        assert!(matches!(result, Err(PoolError::AttributeNotFound { .. })));
        assert!(pool.is_empty());
    }

    // ========== TEST: used_in_tracks_reassignment ==========
    #[test]
    fn test_used_in_tracks_reassignment() {
        // GIVEN two shape aspects and an index attribute pointing at the first
        let mut pool = InstancePool::new(registry());
        let a = pool.insert("shape_aspect", attrs! { "name" => "a" }).unwrap();
        let b = pool.insert("shape_aspect", attrs! { "name" => "b" }).unwrap();
        let ia = pool
            .insert("index_attribute", attrs! { "identified_item" => a })
            .unwrap();

        assert_eq!(
            pool.used_in(a, "INDEX_ATTRIBUTE.INDEX_ATTRIBUTE.IDENTIFIED_ITEM"),
            vec![ia]
        );

        // WHEN the reference is reassigned to b
        let old = pool
            .set_attribute(ia, "identified_item", Value::EntityRef(b))
            .unwrap();

        // THEN a loses the referencer and b gains it
        assert_eq!(old, Value::EntityRef(a));
        assert!(pool.used_in(a, "INDEX_ATTRIBUTE.IDENTIFIED_ITEM").is_empty());
        assert_eq!(pool.used_in(b, "index_attribute.identified_item"), vec![ia]);
    }

    // ========== TEST: used_in_inherited_role ==========
    #[test]
    fn test_used_in_sees_subtype_referencers_but_not_supertype_ones() {
        let mut pool = InstancePool::new(registry());
        let a = pool.insert("shape_aspect", attrs! { "name" => "a" }).unwrap();
        let plain = pool
            .insert("index_attribute", attrs! { "identified_item" => a })
            .unwrap();
        let special = pool
            .insert("special_index", attrs! { "identified_item" => a })
            .unwrap();

        assert_eq!(
            pool.used_in(a, "INDEX_ATTRIBUTE.IDENTIFIED_ITEM"),
            vec![plain, special]
        );
        assert_eq!(pool.used_in(a, "SPECIAL_INDEX.IDENTIFIED_ITEM"), vec![special]);
        assert!(pool.used_in(a, "SPECIAL_INDEX.NOTHING").is_empty());
        assert_eq!(pool.used_in(a, ""), vec![plain, special]);
    }

    // ========== TEST: aggregate_references ==========
    #[test]
    fn test_aggregate_references_are_indexed() {
        let mut pool = InstancePool::new(registry());
        let a = pool.insert("shape_aspect", attrs! { "name" => "a" }).unwrap();
        let g = pool
            .insert(
                "group",
                attrs! { "items" => Value::set(vec![Value::EntityRef(a)]) },
            )
            .unwrap();

        assert_eq!(pool.used_in(a, "GROUP.ITEMS"), vec![g]);

        pool.set_attribute(g, "items", Value::set(vec![])).unwrap();
        assert!(pool.all_users(a).is_empty());
    }

    // ========== TEST: remove_restricts ==========
    #[test]
    fn test_remove_referenced_instance_fails() {
        // GIVEN a referenced shape aspect
        let mut pool = InstancePool::new(registry());
        let a = pool.insert("shape_aspect", attrs! { "name" => "a" }).unwrap();
        let ia = pool
            .insert("index_attribute", attrs! { "identified_item" => a })
            .unwrap();

        // WHEN removing it
        let result = pool.remove(a);

        // THEN it is refused and the instance survives
        match result {
            Err(PoolError::InstanceReferenced { id, referencers }) => {
                assert_eq!(id, a);
                assert_eq!(referencers, vec![ia]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(pool.contains(a));

        // AND removing the referencer first unblocks it
        pool.remove(ia).unwrap();
        assert!(pool.all_users(a).is_empty());
        pool.remove(a).unwrap();
        assert!(pool.is_empty());
    }

    // ========== TEST: remove_missing ==========
    #[test]
    fn test_remove_missing_instance() {
        let mut pool = InstancePool::new(registry());

        let result = pool.remove(InstanceId::new(42));

        assert!(matches!(result, Err(PoolError::InstanceNotFound(_))));
    }

    // ========== TEST: extent_includes_subtypes ==========
    #[test]
    fn test_extent_includes_subtypes() {
        let mut pool = InstancePool::new(registry());
        let a = pool.insert("shape_aspect", attrs! { "name" => "a" }).unwrap();
        let d = pool.insert("datum", attrs! { "name" => "d" }).unwrap();

        assert_eq!(pool.extent("SHAPE_ASPECT"), vec![a, d]);
        assert_eq!(pool.extent("datum"), vec![d]);
        assert!(pool.extent("unknown").is_empty());
    }

    // ========== TEST: ids_not_reused ==========
    #[test]
    fn test_ids_are_not_reused() {
        let mut pool = InstancePool::new(registry());
        let a = pool.insert("shape_aspect", attrs! {}).unwrap();
        pool.remove(a).unwrap();

        let b = pool.insert("shape_aspect", attrs! {}).unwrap();

        assert_ne!(a, b);
    }
}
