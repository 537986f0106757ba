//! Slot validation helpers for mutation operations.

use express_core::Value;
use express_pool::InstancePool;
use express_registry::{canonical_attr, EntityLayout, Registry, Slot};
use express_typecheck::TypeChecker;

use crate::error::{MutationError, MutationResult};

/// Layout of an entity that may be instantiated.
pub fn instantiable_layout<'r>(
    registry: &'r Registry,
    entity: &str,
) -> MutationResult<&'r EntityLayout> {
    let def = registry
        .entity(entity)
        .ok_or_else(|| MutationError::unknown_type(entity))?;
    if def.is_abstract {
        return Err(MutationError::abstract_entity(&def.name));
    }
    registry
        .layout(&def.name)
        .ok_or_else(|| MutationError::unknown_type(entity))
}

/// The stored slot an attribute write targets.
///
/// Derived and inverse attributes exist on the entity but have no slot.
pub fn writable_slot<'l>(layout: &'l EntityLayout, attr: &str) -> MutationResult<&'l Slot> {
    let name = canonical_attr(attr);
    if let Some(slot) = layout.slot(&name) {
        return Ok(slot);
    }
    if layout.computed_attr(&name).is_some() {
        return Err(MutationError::readonly_attribute(&layout.entity, name));
    }
    Err(MutationError::unknown_attribute(&layout.entity, name))
}

/// Validate a value for a slot: mandatory check, then coercion.
///
/// Returns the value in the slot's declared representation.
pub fn validate_slot(
    checker: &TypeChecker<'_>,
    entity: &str,
    slot: &Slot,
    value: Value,
    pool: &InstancePool,
) -> MutationResult<Value> {
    if value.is_undefined() {
        if slot.optional {
            return Ok(value);
        }
        return Err(MutationError::missing_mandatory(entity, &slot.name));
    }
    checker
        .coerce(value, &slot.type_name, pool)
        .map_err(|e| MutationError::invalid_attribute(entity, &slot.name, e))
}
