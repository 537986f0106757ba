//! SET operation - replaces one attribute of a live instance.

use express_core::{InstanceId, PoolError, Value};
use express_pool::InstancePool;
use express_typecheck::TypeChecker;
use tracing::debug;

use crate::error::{MutationError, MutationResult};
use crate::validation;

/// Validate and write `value` into `attr`, returning the previous value.
///
/// The instance is left untouched when validation fails.
pub fn execute_set(
    checker: &TypeChecker<'_>,
    pool: &mut InstancePool,
    id: InstanceId,
    attr: &str,
    value: Value,
) -> MutationResult<Value> {
    let registry = checker.registry();
    let entity = pool
        .get(id)
        .map(|inst| inst.entity.clone())
        .ok_or(PoolError::InstanceNotFound(id))?;
    let layout = registry
        .layout(&entity)
        .ok_or_else(|| MutationError::unknown_type(&entity))?;
    let slot = validation::writable_slot(layout, attr)?;

    let value = validation::validate_slot(checker, &layout.entity, slot, value, pool)?;
    let old = pool.set_attribute(id, &slot.name, value)?;

    debug!(%id, entity = %layout.entity, attr = %slot.name, "attribute set");
    Ok(old)
}
