//! DESTROY operation - removes an instance from the pool.

use express_core::{Instance, InstanceId};
use express_pool::InstancePool;
use tracing::debug;

use crate::error::MutationResult;

/// Remove an instance that nothing else references.
///
/// Deregisters its own outgoing references from the reverse index.
pub fn execute_destroy(pool: &mut InstancePool, id: InstanceId) -> MutationResult<Instance> {
    let instance = pool.remove(id)?;
    debug!(%id, entity = %instance.entity, "instance destroyed");
    Ok(instance)
}
