//! CONSTRUCT operation - creates new instances.

use express_core::{Attributes, InstanceId, Value};
use express_pool::InstancePool;
use express_registry::{canonical_attr, EntityLayout};
use express_typecheck::TypeChecker;
use tracing::debug;

use crate::error::{MutationError, MutationResult};
use crate::validation;

/// Construct an instance from values in flattened slot order.
pub fn execute_construct(
    checker: &TypeChecker<'_>,
    pool: &mut InstancePool,
    entity: &str,
    values: Vec<Value>,
) -> MutationResult<InstanceId> {
    let layout = validation::instantiable_layout(checker.registry(), entity)?;
    if values.len() != layout.arity() {
        return Err(MutationError::arity_mismatch(
            &layout.entity,
            layout.arity(),
            values.len(),
        ));
    }

    let named = layout
        .slots()
        .iter()
        .zip(values)
        .map(|(slot, value)| (slot.name.clone(), value))
        .collect();
    store(checker, pool, layout, named)
}

/// Construct an instance from a name -> value mapping.
///
/// Names are case-insensitive; slots left out are treated as undefined.
pub fn execute_construct_named(
    checker: &TypeChecker<'_>,
    pool: &mut InstancePool,
    entity: &str,
    attributes: Attributes,
) -> MutationResult<InstanceId> {
    let layout = validation::instantiable_layout(checker.registry(), entity)?;

    let mut named = Attributes::with_capacity(attributes.len());
    for (name, value) in attributes {
        let slot = validation::writable_slot(layout, &name)?;
        named.insert(slot.name.clone(), value);
    }
    store(checker, pool, layout, named)
}

/// Validate every slot, then hand the record to the pool.
///
/// Nothing reaches the pool unless all slots pass.
fn store(
    checker: &TypeChecker<'_>,
    pool: &mut InstancePool,
    layout: &EntityLayout,
    mut named: Attributes,
) -> MutationResult<InstanceId> {
    let mut attrs = Attributes::with_capacity(layout.arity());
    for slot in layout.slots() {
        let raw = named
            .swap_remove(&canonical_attr(&slot.name))
            .unwrap_or(Value::Undefined);
        let value = validation::validate_slot(checker, &layout.entity, slot, raw, pool)?;
        attrs.insert(slot.name.clone(), value);
    }

    let id = pool.insert(&layout.entity, attrs)?;
    debug!(%id, entity = %layout.entity, "instance constructed");
    Ok(id)
}
