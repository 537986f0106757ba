//! The exchange structure.

use express_core::{AggregateValue, Attributes, Instance, InstanceId, Value};
use express_mutation::MutationExecutor;
use express_pool::InstancePool;
use express_registry::{Expr, Registry};
use express_rule::{builtins, Bindings, Evaluator, RuleError, RuleViolation, Validator};
use express_typecheck::{CheckOptions, TypeChecker};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::error::{ExchangeError, ExchangeResult};

/// A population of instances of one schema.
///
/// Writes take the pool's write lock for the whole "store slot, update
/// reverse index" step; reads run under the read lock, so every query sees
/// either all or none of a write.
pub struct Exchange {
    /// The schema (shared, immutable).
    registry: Arc<Registry>,
    /// Live instances and their reverse index.
    pool: RwLock<InstancePool>,
    /// Options for checking values written to the pool.
    options: CheckOptions,
}

impl Exchange {
    /// Create an empty exchange with default checking options.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_options(registry, CheckOptions::default())
    }

    pub fn with_options(registry: Arc<Registry>, options: CheckOptions) -> Self {
        let pool = InstancePool::new(Arc::clone(&registry));
        debug!(schema = %registry.schema(), "exchange created");
        Self {
            registry,
            pool: RwLock::new(pool),
            options,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.pool.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.read().is_empty()
    }

    // ==================== Mutation ====================

    /// Construct an instance from values in flattened attribute order.
    pub fn construct(&self, entity: &str, values: Vec<Value>) -> ExchangeResult<InstanceId> {
        let mut pool = self.pool.write();
        let mut executor = MutationExecutor::with_options(&self.registry, &mut pool, self.options.clone());
        Ok(executor.construct(entity, values)?)
    }

    /// Construct an instance from named attribute values.
    pub fn construct_named(&self, entity: &str, attributes: Attributes) -> ExchangeResult<InstanceId> {
        let mut pool = self.pool.write();
        let mut executor = MutationExecutor::with_options(&self.registry, &mut pool, self.options.clone());
        Ok(executor.construct_named(entity, attributes)?)
    }

    /// Write one attribute, returning the value it replaced.
    pub fn set_attribute(&self, id: InstanceId, attr: &str, value: Value) -> ExchangeResult<Value> {
        let mut pool = self.pool.write();
        let mut executor = MutationExecutor::with_options(&self.registry, &mut pool, self.options.clone());
        Ok(executor.set_attribute(id, attr, value)?)
    }

    /// Destroy an instance no other instance references.
    pub fn destroy(&self, id: InstanceId) -> ExchangeResult<Instance> {
        let mut pool = self.pool.write();
        let mut executor = MutationExecutor::with_options(&self.registry, &mut pool, self.options.clone());
        Ok(executor.destroy(id)?)
    }

    // ==================== Reads ====================

    /// A copy of the instance as it is now.
    pub fn get(&self, id: InstanceId) -> Option<Instance> {
        self.pool.read().get(id).cloned()
    }

    /// The stored attribute values, in layout order.
    ///
    /// Passing the result to [`Exchange::construct_named`] with the same
    /// entity builds an attribute-for-attribute equal instance.
    pub fn attributes(&self, id: InstanceId) -> ExchangeResult<Attributes> {
        self.pool
            .read()
            .get(id)
            .map(|instance| instance.attributes.clone())
            .ok_or_else(|| ExchangeError::instance_not_found(id))
    }

    /// Read any attribute: stored, derived or inverse.
    pub fn attribute(&self, id: InstanceId, name: &str) -> ExchangeResult<Value> {
        let pool = self.pool.read();
        Ok(Evaluator::new(&pool).attribute(id, name)?)
    }

    // ==================== Validation ====================

    /// Violations of the where and unique rules of the instance's entity and
    /// its ancestors. Empty means valid.
    pub fn validate(&self, id: InstanceId) -> ExchangeResult<Vec<RuleViolation>> {
        let pool = self.pool.read();
        Ok(Validator::new(&pool).validate(id)?)
    }

    /// Violations of the schema's global rules.
    pub fn validate_global(&self) -> Vec<RuleViolation> {
        let pool = self.pool.read();
        Validator::new(&pool).validate_global()
    }

    /// Violations across every instance and every global rule.
    pub fn validate_all(&self) -> ExchangeResult<Vec<RuleViolation>> {
        let pool = self.pool.read();
        Ok(Validator::new(&pool).validate_all()?)
    }

    // ==================== Types ====================

    /// Whether `value` belongs to `type_name`.
    pub fn type_check(&self, value: &Value, type_name: &str) -> bool {
        let pool = self.pool.read();
        self.checker().type_check(value, type_name, &pool)
    }

    /// Like [`Exchange::type_check`], with the reason for a failure.
    pub fn check(&self, value: &Value, type_name: &str) -> ExchangeResult<()> {
        let pool = self.pool.read();
        Ok(self.checker().check(value, type_name, &pool)?)
    }

    /// TYPEOF: every type `value` belongs to, schema-qualified where declared.
    pub fn type_of(&self, value: &Value) -> BTreeSet<String> {
        let pool = self.pool.read();
        builtins::type_names(&self.checker(), &pool, value)
    }

    fn checker(&self) -> TypeChecker<'_> {
        TypeChecker::with_options(&self.registry, self.options.clone())
    }

    // ==================== Builtins ====================

    /// SIZEOF of an aggregate.
    pub fn size_of(&self, value: &Value) -> ExchangeResult<Value> {
        Ok(builtins::sizeof(value)?)
    }

    /// USEDIN: live instances referencing `target` through `role`
    /// (`[SCHEMA.]ENTITY.ATTR`; empty for every role).
    pub fn used_in(&self, target: InstanceId, role: &str) -> Vec<InstanceId> {
        self.pool.read().used_in(target, role)
    }

    /// EXISTS: whether `value` is determinate.
    pub fn exists(&self, value: &Value) -> bool {
        !value.is_undefined()
    }

    /// QUERY: the elements of `source` for which `predicate` is TRUE with the
    /// element bound to `var`. The result keeps the source's kind and order.
    pub fn query(&self, var: &str, source: &Value, predicate: &Expr) -> ExchangeResult<Value> {
        let agg = match source.underlying() {
            Value::Undefined => return Ok(Value::Undefined),
            Value::Aggregate(agg) => agg,
            other => {
                return Err(RuleError::type_error(format!(
                    "QUERY expects an aggregate, got {}",
                    other.category()
                ))
                .into())
            }
        };
        let pool = self.pool.read();
        let evaluator = Evaluator::new(&pool);
        let bindings = Bindings::new();
        let items = evaluator
            .query(var, agg, predicate, &bindings)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Aggregate(AggregateValue {
            kind: agg.kind,
            element_type: agg.element_type.clone(),
            items,
        }))
    }

    /// Evaluate an expression against the current population.
    pub fn evaluate(&self, expr: &Expr, bindings: &Bindings) -> ExchangeResult<Value> {
        let pool = self.pool.read();
        Ok(Evaluator::new(&pool).eval(expr, bindings)?)
    }
}
