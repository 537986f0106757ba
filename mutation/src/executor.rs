//! Mutation executor - coordinates mutation operations.
//!
//! The executor delegates to specialized operation modules in `ops/`:
//! - `ops/construct.rs` - CONSTRUCT (positional and named)
//! - `ops/set.rs` - SET (attribute updates)
//! - `ops/destroy.rs` - DESTROY (instance removal)

use express_core::{Attributes, Instance, InstanceId, Value};
use express_pool::InstancePool;
use express_registry::Registry;
use express_typecheck::{CheckOptions, TypeChecker};

use crate::error::MutationResult;
use crate::ops;

/// Mutation executor.
pub struct MutationExecutor<'r, 'p> {
    checker: TypeChecker<'r>,
    pool: &'p mut InstancePool,
}

impl<'r, 'p> MutationExecutor<'r, 'p> {
    /// Create a new executor with default checking options.
    pub fn new(registry: &'r Registry, pool: &'p mut InstancePool) -> Self {
        Self::with_options(registry, pool, CheckOptions::default())
    }

    pub fn with_options(
        registry: &'r Registry,
        pool: &'p mut InstancePool,
        options: CheckOptions,
    ) -> Self {
        Self {
            checker: TypeChecker::with_options(registry, options),
            pool,
        }
    }

    /// Construct an instance from values in flattened slot order.
    pub fn construct(&mut self, entity: &str, values: Vec<Value>) -> MutationResult<InstanceId> {
        ops::execute_construct(&self.checker, self.pool, entity, values)
    }

    /// Construct an instance from named attribute values.
    pub fn construct_named(
        &mut self,
        entity: &str,
        attributes: Attributes,
    ) -> MutationResult<InstanceId> {
        ops::execute_construct_named(&self.checker, self.pool, entity, attributes)
    }

    /// Write one attribute, returning the value it replaced.
    pub fn set_attribute(
        &mut self,
        id: InstanceId,
        attr: &str,
        value: Value,
    ) -> MutationResult<Value> {
        ops::execute_set(&self.checker, self.pool, id, attr, value)
    }

    /// Destroy an unreferenced instance.
    pub fn destroy(&mut self, id: InstanceId) -> MutationResult<Instance> {
        ops::execute_destroy(self.pool, id)
    }
}
