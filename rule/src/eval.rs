//! Expression evaluation.

use express_core::{AggregateValue, InstanceId, Logical, Value};
use express_pool::InstancePool;
use express_registry::{
    canonical_attr, AttrKind, BinaryOp, Builtin, Expr, Registry, TypeDescriptor, UnaryOp,
};
use express_typecheck::TypeChecker;
use tracing::trace;

use crate::error::{RuleError, RuleResult};
use crate::query::Query;
use crate::{builtins, like, Bindings, MAX_DEPTH};

/// Expression evaluator.
///
/// The evaluator holds no state of its own: every call reads the pool as it
/// is, so results are never cached across mutations.
pub struct Evaluator<'a> {
    registry: &'a Registry,
    pool: &'a InstancePool,
    checker: TypeChecker<'a>,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator over a pool snapshot.
    pub fn new(pool: &'a InstancePool) -> Self {
        let registry: &'a Registry = pool.registry();
        Self {
            registry,
            pool,
            checker: TypeChecker::new(registry),
        }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn pool(&self) -> &'a InstancePool {
        self.pool
    }

    pub fn checker(&self) -> &TypeChecker<'a> {
        &self.checker
    }

    /// Evaluate an expression with the given bindings.
    pub fn eval(&self, expr: &Expr, bindings: &Bindings) -> RuleResult<Value> {
        self.eval_at(expr, bindings, 0)
    }

    /// Evaluate an expression as a LOGICAL; indeterminate yields UNKNOWN.
    pub fn eval_logical(&self, expr: &Expr, bindings: &Bindings) -> RuleResult<Logical> {
        self.eval_logical_at(expr, bindings, 0)
    }

    /// Read an attribute of an instance: a stored slot, a derived attribute
    /// (evaluated now) or an inverse attribute (read from the reverse index).
    pub fn attribute(&self, id: InstanceId, name: &str) -> RuleResult<Value> {
        self.attribute_at(id, name, 0)
    }

    /// Lazily filter `source` by `predicate`, binding each element to `var`.
    ///
    /// The iterator borrows the source; calling again restarts from the first element.
    pub fn query<'e>(
        &'e self,
        var: &'e str,
        source: &'e AggregateValue,
        predicate: &'e Expr,
        bindings: &'e Bindings,
    ) -> Query<'e, 'a> {
        Query::new(self, var, source, predicate, bindings, 0)
    }

    pub(crate) fn eval_logical_at(
        &self,
        expr: &Expr,
        bindings: &Bindings,
        depth: usize,
    ) -> RuleResult<Logical> {
        let value = self.eval_at(expr, bindings, depth)?;
        to_logical(&value)
    }

    fn eval_at(&self, expr: &Expr, bindings: &Bindings, depth: usize) -> RuleResult<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::SelfRef => bindings
                .self_id()
                .map(Value::EntityRef)
                .ok_or_else(|| RuleError::unbound_variable("SELF")),
            Expr::Var(name) => self.eval_var(name, bindings, depth),
            Expr::Attr(base, attr) => {
                let base = self.eval_at(base, bindings, depth)?;
                match base.underlying() {
                    Value::Undefined => Ok(Value::Undefined),
                    Value::EntityRef(id) => self.attribute_at(*id, attr, depth),
                    other => Err(RuleError::type_error(format!(
                        "cannot access attribute '{}' on {}",
                        attr,
                        other.category()
                    ))),
                }
            }
            Expr::Index(base, index) => {
                let base = self.eval_at(base, bindings, depth)?;
                let index = self.eval_at(index, bindings, depth)?;
                match (base.underlying(), index.underlying()) {
                    (Value::Undefined, _) | (_, Value::Undefined) => Ok(Value::Undefined),
                    (Value::Aggregate(agg), Value::Integer(i)) => {
                        Ok(agg.get(*i).cloned().unwrap_or(Value::Undefined))
                    }
                    (Value::Aggregate(_), other) => Err(RuleError::type_error(format!(
                        "index must be an INTEGER, got {}",
                        other.category()
                    ))),
                    (other, _) => Err(RuleError::type_error(format!(
                        "cannot index {}",
                        other.category()
                    ))),
                }
            }
            Expr::Unary(op, operand) => {
                let value = self.eval_at(operand, bindings, depth)?;
                self.eval_unary_op(*op, &value)
            }
            Expr::Binary(op, left, right) => self.eval_binary_op(*op, left, right, bindings, depth),
            Expr::Call(builtin, args) => self.eval_call(*builtin, args, bindings, depth),
            Expr::Query {
                var,
                source,
                predicate,
            } => {
                let source = self.eval_at(source, bindings, depth)?;
                let agg = match source.underlying() {
                    Value::Undefined => return Ok(Value::Undefined),
                    Value::Aggregate(agg) => agg,
                    other => {
                        return Err(RuleError::type_error(format!(
                            "QUERY expects an aggregate, got {}",
                            other.category()
                        )))
                    }
                };
                let items = Query::new(self, var, agg, predicate, bindings, depth)
                    .collect::<RuleResult<Vec<_>>>()?;
                Ok(Value::Aggregate(AggregateValue {
                    kind: agg.kind,
                    element_type: agg.element_type.clone(),
                    items,
                }))
            }
            Expr::AggregateInit(items) => items
                .iter()
                .map(|e| self.eval_at(e, bindings, depth))
                .collect::<RuleResult<Vec<_>>>()
                .map(Value::list),
        }
    }

    /// Bound variables first; inside a rule, a bare name falls back to the
    /// attribute of `SELF`.
    fn eval_var(&self, name: &str, bindings: &Bindings, depth: usize) -> RuleResult<Value> {
        if let Some(value) = bindings.get(name) {
            return Ok(value.clone());
        }
        match bindings.self_id() {
            Some(id) => self
                .attribute_at(id, name, depth)
                .map_err(|e| match e {
                    RuleError::UnknownAttribute { .. } => RuleError::unbound_variable(name),
                    other => other,
                }),
            None => Err(RuleError::unbound_variable(name)),
        }
    }

    fn attribute_at(&self, id: InstanceId, name: &str, depth: usize) -> RuleResult<Value> {
        let instance = self.pool.get(id).ok_or(RuleError::InstanceNotFound(id))?;
        // `SELF\entity.attr` reaches the same flattened slot as `SELF.attr`.
        let attr = canonical_attr(name.rsplit('.').next().unwrap_or(name));
        if let Some(value) = instance.get_attr(&attr) {
            return Ok(value.clone());
        }

        let computed = self
            .registry
            .layout(&instance.entity)
            .and_then(|layout| layout.computed_attr(&attr))
            .ok_or_else(|| RuleError::unknown_attribute(&instance.entity, &attr))?;
        match &computed.def.kind {
            AttrKind::Derived(expr) => {
                if depth >= MAX_DEPTH {
                    return Err(RuleError::max_depth_exceeded(MAX_DEPTH));
                }
                trace!(%id, attr = %attr, "evaluating derived attribute");
                self.eval_at(expr, &Bindings::for_instance(id), depth + 1)
            }
            AttrKind::Inverse { entity, attribute } => {
                let users = self.pool.used_in(id, &format!("{}.{}", entity, attribute));
                Ok(self.inverse_value(&computed.def.type_name, users))
            }
            AttrKind::Explicit | AttrKind::Redeclared => {
                Err(RuleError::unknown_attribute(&instance.entity, &attr))
            }
        }
    }

    /// Inverse attributes declared as an aggregate yield all referencers;
    /// a single-valued inverse yields the first, or indeterminate.
    fn inverse_value(&self, type_name: &str, users: Vec<InstanceId>) -> Value {
        match self.registry.resolve(type_name) {
            Ok(TypeDescriptor::Aggregate(agg)) => Value::Aggregate(
                AggregateValue::new(agg.kind, users.into_iter().map(Value::EntityRef).collect())
                    .with_element_type(agg.element_type.clone()),
            ),
            _ => users
                .first()
                .map(|id| Value::EntityRef(*id))
                .unwrap_or(Value::Undefined),
        }
    }

    fn eval_unary_op(&self, op: UnaryOp, value: &Value) -> RuleResult<Value> {
        match op {
            UnaryOp::Not => Ok(Value::Logical(to_logical(value)?.not())),
            UnaryOp::Neg => match value.underlying() {
                Value::Undefined => Ok(Value::Undefined),
                Value::Integer(i) => i
                    .checked_neg()
                    .map(Value::Integer)
                    .ok_or_else(|| RuleError::type_error("integer overflow")),
                Value::Real(r) => Ok(Value::Real(-r)),
                other => Err(RuleError::type_error(format!(
                    "cannot negate {}",
                    other.category()
                ))),
            },
        }
    }

    fn eval_binary_op(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        bindings: &Bindings,
        depth: usize,
    ) -> RuleResult<Value> {
        // Logical operators short-circuit on a decided left operand.
        match op {
            BinaryOp::And => {
                let l = self.eval_logical_at(left, bindings, depth)?;
                if l == Logical::False {
                    return Ok(Value::Logical(Logical::False));
                }
                let r = self.eval_logical_at(right, bindings, depth)?;
                return Ok(Value::Logical(l.and(r)));
            }
            BinaryOp::Or => {
                let l = self.eval_logical_at(left, bindings, depth)?;
                if l == Logical::True {
                    return Ok(Value::Logical(Logical::True));
                }
                let r = self.eval_logical_at(right, bindings, depth)?;
                return Ok(Value::Logical(l.or(r)));
            }
            BinaryOp::Xor => {
                let l = self.eval_logical_at(left, bindings, depth)?;
                let r = self.eval_logical_at(right, bindings, depth)?;
                return Ok(Value::Logical(l.xor(r)));
            }
            _ => {}
        }

        let left_val = self.eval_at(left, bindings, depth)?;
        let right_val = self.eval_at(right, bindings, depth)?;

        match op {
            // Arithmetic
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                eval_arithmetic(op, &left_val, &right_val)
            }

            // Comparison
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::InstanceEq
            | BinaryOp::InstanceNotEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq => eval_comparison(op, &left_val, &right_val),

            BinaryOp::In => {
                if left_val.is_undefined() || right_val.is_undefined() {
                    return Ok(Value::Logical(Logical::Unknown));
                }
                let agg = right_val.as_aggregate().ok_or_else(|| {
                    RuleError::type_error(format!(
                        "IN expects an aggregate, got {}",
                        right_val.category()
                    ))
                })?;
                let found = agg.items.iter().any(|item| values_equal(&left_val, item));
                Ok(Value::Logical(Logical::from(found)))
            }

            BinaryOp::Like => match (left_val.underlying(), right_val.underlying()) {
                (Value::Undefined, _) | (_, Value::Undefined) => {
                    Ok(Value::Logical(Logical::Unknown))
                }
                (Value::String(text), Value::String(pattern)) => {
                    Ok(Value::Logical(Logical::from(like::matches(text, pattern)?)))
                }
                (l, r) => Err(RuleError::type_error(format!(
                    "LIKE expects strings, got {} and {}",
                    l.category(),
                    r.category()
                ))),
            },

            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => Err(RuleError::type_error(
                "logical operator reached value evaluation",
            )),
        }
    }

    /// Evaluate a built-in function call.
    fn eval_call(
        &self,
        builtin: Builtin,
        args: &[Expr],
        bindings: &Bindings,
        depth: usize,
    ) -> RuleResult<Value> {
        let values = args
            .iter()
            .map(|arg| self.eval_at(arg, bindings, depth))
            .collect::<RuleResult<Vec<_>>>()?;

        match (builtin, values.as_slice()) {
            (Builtin::Sizeof, [value]) => builtins::sizeof(value),
            (Builtin::Usedin, [target, role]) => builtins::usedin(self.pool, target, role),
            (Builtin::Typeof, [value]) => Ok(builtins::type_of(&self.checker, self.pool, value)),
            (Builtin::Exists, [value]) => Ok(builtins::exists(value)),
            (Builtin::Nvl, [value, substitute]) => {
                Ok(builtins::nvl(value.clone(), substitute.clone()))
            }
            (Builtin::Abs, [value]) => builtins::abs(value),
            (Builtin::Hiindex, [value]) => builtins::hiindex(value),
            (Builtin::Loindex, [value]) => builtins::loindex(value),
            _ => Err(RuleError::type_error(format!(
                "{} expects {} argument(s), got {}",
                builtin.name(),
                builtin.arity(),
                values.len()
            ))),
        }
    }
}

/// Interpret a value as a LOGICAL; indeterminate is UNKNOWN.
pub(crate) fn to_logical(value: &Value) -> RuleResult<Logical> {
    if value.is_undefined() {
        return Ok(Logical::Unknown);
    }
    value.as_logical().ok_or_else(|| {
        RuleError::type_error(format!("expected LOGICAL, got {}", value.category()))
    })
}

/// EXPRESS value equality: numbers by value, enumeration items by name,
/// instances by identity, unordered aggregates as multisets.
pub(crate) fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.underlying(), right.underlying()) {
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::EntityRef(a), Value::EntityRef(b)) => a == b,
        (Value::Enumeration { item: a, .. }, Value::Enumeration { item: b, .. }) => {
            a.eq_ignore_ascii_case(b)
        }
        (Value::Aggregate(a), Value::Aggregate(b)) => aggregates_equal(a, b),
        (a, b) => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => x == y,
            _ => match (a.as_logical(), b.as_logical()) {
                (Some(x), Some(y)) => x == y,
                _ => a == b,
            },
        },
    }
}

fn aggregates_equal(a: &AggregateValue, b: &AggregateValue) -> bool {
    if a.len() != b.len() {
        return false;
    }
    if a.kind.is_ordered() && b.kind.is_ordered() {
        return a.items.iter().zip(&b.items).all(|(x, y)| values_equal(x, y));
    }
    let mut unmatched: Vec<&Value> = b.items.iter().collect();
    a.items.iter().all(|x| {
        match unmatched.iter().position(|y| values_equal(x, y)) {
            Some(pos) => {
                unmatched.swap_remove(pos);
                true
            }
            None => false,
        }
    })
}

fn eval_comparison(op: BinaryOp, left: &Value, right: &Value) -> RuleResult<Value> {
    // Comparing against an indeterminate value is UNKNOWN.
    if left.is_undefined() || right.is_undefined() {
        return Ok(Value::Logical(Logical::Unknown));
    }
    let result = match op {
        BinaryOp::Eq | BinaryOp::InstanceEq => values_equal(left, right),
        BinaryOp::NotEq | BinaryOp::InstanceNotEq => !values_equal(left, right),
        _ => {
            let ordering = left.partial_cmp_value(right).ok_or_else(|| {
                RuleError::type_error(format!(
                    "cannot compare {} and {}",
                    left.category(),
                    right.category()
                ))
            })?;
            match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::LtEq => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }
        }
    };
    Ok(Value::Logical(Logical::from(result)))
}

fn eval_arithmetic(op: BinaryOp, left: &Value, right: &Value) -> RuleResult<Value> {
    // Arithmetic on an indeterminate value is indeterminate.
    if left.is_undefined() || right.is_undefined() {
        return Ok(Value::Undefined);
    }
    let overflow = || RuleError::type_error("integer overflow");
    match (op, left.underlying(), right.underlying()) {
        (BinaryOp::Add, Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
        (BinaryOp::Add, Value::Integer(a), Value::Integer(b)) => {
            a.checked_add(*b).map(Value::Integer).ok_or_else(overflow)
        }
        (BinaryOp::Sub, Value::Integer(a), Value::Integer(b)) => {
            a.checked_sub(*b).map(Value::Integer).ok_or_else(overflow)
        }
        (BinaryOp::Mul, Value::Integer(a), Value::Integer(b)) => {
            a.checked_mul(*b).map(Value::Integer).ok_or_else(overflow)
        }
        (BinaryOp::Mod, Value::Integer(a), Value::Integer(b)) => {
            if *b == 0 {
                return Err(RuleError::DivisionByZero);
            }
            // The result takes the sign of the divisor.
            let m = a.checked_rem(*b).ok_or_else(overflow)?;
            if m != 0 && (m < 0) != (*b < 0) {
                m.checked_add(*b).map(Value::Integer).ok_or_else(overflow)
            } else {
                Ok(Value::Integer(m))
            }
        }
        (_, l, r) => {
            let (Some(a), Some(b)) = (l.as_number(), r.as_number()) else {
                return Err(RuleError::type_error(format!(
                    "cannot apply {:?} to {} and {}",
                    op,
                    l.category(),
                    r.category()
                )));
            };
            match op {
                BinaryOp::Add => Ok(Value::Real(a + b)),
                BinaryOp::Sub => Ok(Value::Real(a - b)),
                BinaryOp::Mul => Ok(Value::Real(a * b)),
                BinaryOp::Div => {
                    if b == 0.0 {
                        Err(RuleError::DivisionByZero)
                    } else {
                        Ok(Value::Real(a / b))
                    }
                }
                _ => Err(RuleError::type_error(format!(
                    "MOD expects integers, got {} and {}",
                    l.category(),
                    r.category()
                ))),
            }
        }
    }
}
