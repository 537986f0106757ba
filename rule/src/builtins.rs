//! Built-in function library.
//!
//! Pure functions over values and a pool snapshot. Indeterminate arguments
//! yield indeterminate results, except for `EXISTS` and `NVL`, which exist
//! to test for them.

use express_core::{AggregateKind, AggregateValue, InstanceId, Value};
use express_pool::InstancePool;
use express_typecheck::TypeChecker;
use std::collections::BTreeSet;

use crate::error::{RuleError, RuleResult};

/// SIZEOF: number of elements of an aggregate.
pub fn sizeof(value: &Value) -> RuleResult<Value> {
    match value.underlying() {
        Value::Undefined => Ok(Value::Undefined),
        Value::Aggregate(agg) => Ok(Value::Integer(agg.len() as i64)),
        other => Err(RuleError::type_error(format!(
            "SIZEOF expects an aggregate, got {}",
            other.category()
        ))),
    }
}

/// USEDIN: a BAG of the instances referencing `target` through `role`
/// (`[SCHEMA.]ENTITY.ATTR`, or empty for every role).
///
/// Answered from the pool's reverse index.
pub fn usedin(pool: &InstancePool, target: &Value, role: &Value) -> RuleResult<Value> {
    let role = match role.underlying() {
        Value::Undefined => return Ok(Value::Undefined),
        Value::String(s) => s.as_str(),
        other => {
            return Err(RuleError::type_error(format!(
                "USEDIN expects a role string, got {}",
                other.category()
            )))
        }
    };
    let target = match target.underlying() {
        Value::Undefined => return Ok(Value::Undefined),
        Value::EntityRef(id) => *id,
        other => {
            return Err(RuleError::type_error(format!(
                "USEDIN expects an entity instance, got {}",
                other.category()
            )))
        }
    };
    Ok(references(pool.used_in(target, role)))
}

/// Qualified names of every type `value` belongs to.
///
/// Declared types are reported as `SCHEMA.NAME`; simple types and aggregate
/// kinds stay bare.
pub fn type_names(checker: &TypeChecker<'_>, pool: &InstancePool, value: &Value) -> BTreeSet<String> {
    let registry = checker.registry();
    checker
        .type_names(value, pool)
        .into_iter()
        .map(|name| registry.qualify(&name))
        .collect()
}

/// TYPEOF: the names of `value`'s types, as a SET of STRING.
pub fn type_of(checker: &TypeChecker<'_>, pool: &InstancePool, value: &Value) -> Value {
    if value.is_undefined() {
        return Value::Undefined;
    }
    let names = type_names(checker, pool, value)
        .into_iter()
        .map(Value::String)
        .collect();
    Value::Aggregate(AggregateValue::new(AggregateKind::Set, names).with_element_type("STRING"))
}

/// EXISTS: whether `value` is determinate.
pub fn exists(value: &Value) -> Value {
    Value::Boolean(!value.is_undefined())
}

/// NVL: `value` unless it is indeterminate, else `substitute`.
pub fn nvl(value: Value, substitute: Value) -> Value {
    if value.is_undefined() {
        substitute
    } else {
        value
    }
}

/// ABS: absolute value of a number.
pub fn abs(value: &Value) -> RuleResult<Value> {
    match value.underlying() {
        Value::Undefined => Ok(Value::Undefined),
        Value::Integer(i) => i
            .checked_abs()
            .map(Value::Integer)
            .ok_or_else(|| RuleError::type_error("integer overflow in ABS")),
        Value::Real(r) => Ok(Value::Real(r.abs())),
        other => Err(RuleError::type_error(format!(
            "ABS expects a number, got {}",
            other.category()
        ))),
    }
}

/// HIINDEX: upper index of an aggregate, which is its size.
pub fn hiindex(value: &Value) -> RuleResult<Value> {
    sizeof(value).map_err(|_| RuleError::type_error("HIINDEX expects an aggregate"))
}

/// LOINDEX: lower index of an aggregate, always 1.
pub fn loindex(value: &Value) -> RuleResult<Value> {
    match value.underlying() {
        Value::Undefined => Ok(Value::Undefined),
        Value::Aggregate(_) => Ok(Value::Integer(1)),
        other => Err(RuleError::type_error(format!(
            "LOINDEX expects an aggregate, got {}",
            other.category()
        ))),
    }
}

/// A BAG of entity references.
pub(crate) fn references(ids: Vec<InstanceId>) -> Value {
    Value::bag(ids.into_iter().map(Value::EntityRef).collect())
}
