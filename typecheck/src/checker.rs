//! Structural and nominal type checking.
//!
//! `check` never modifies the value. Aggregates are checked structurally
//! (kind, bounds, uniqueness, then every element); entities nominally (the
//! referenced instance's entity must be the declared one or a subtype);
//! selects by membership of the value's type names in the select's
//! transitive alternative set.

use crate::{CheckOptions, CheckResult, TypeError};
use express_core::{InstanceId, Value};
use express_pool::InstancePool;
use express_registry::{canonical_type, Registry, SimpleKind, TypeDescriptor};
use std::collections::{BTreeSet, HashSet};
use tracing::trace;

/// Type checker over one schema.
#[derive(Debug, Clone)]
pub struct TypeChecker<'a> {
    pub(crate) registry: &'a Registry,
    pub(crate) options: CheckOptions,
}

/// Recursion state for one top-level check.
#[derive(Debug, Default)]
struct Walk {
    depth: usize,
    /// Instances already descended into; revisits are taken as satisfied.
    visited: HashSet<InstanceId>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self::with_options(registry, CheckOptions::default())
    }

    pub fn with_options(registry: &'a Registry, options: CheckOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Check `value` against the type named `type_name`.
    ///
    /// `Undefined` conforms at the top level; optionality is the caller's concern.
    pub fn check(&self, value: &Value, type_name: &str, pool: &InstancePool) -> CheckResult<()> {
        let name = self.resolve_name(type_name)?;
        self.check_at(value, name, pool, &mut Walk::default())
    }

    /// Boolean form of [`check`](Self::check).
    pub fn type_check(&self, value: &Value, type_name: &str, pool: &InstancePool) -> bool {
        self.check(value, type_name, pool).is_ok()
    }

    /// Every type name `value` satisfies (unqualified, canonical spelling).
    pub fn type_names(&self, value: &Value, pool: &InstancePool) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_names(value, pool, &mut names);
        names
    }

    pub(crate) fn resolve_name(&self, type_name: &str) -> CheckResult<&'a str> {
        self.registry
            .canonical_name(type_name)
            .ok_or_else(|| TypeError::UnknownType(type_name.to_string()))
    }

    fn check_at(
        &self,
        value: &Value,
        name: &str,
        pool: &InstancePool,
        walk: &mut Walk,
    ) -> CheckResult<()> {
        if value.is_undefined() {
            return Ok(());
        }
        if walk.depth > self.options.max_depth {
            return Err(TypeError::CycleDetected(self.options.max_depth));
        }
        let descriptor = self
            .registry
            .get(name)
            .ok_or_else(|| TypeError::UnknownType(name.to_string()))?;

        match descriptor {
            TypeDescriptor::Simple(kind) => {
                if self.simple_accepts(*kind, value) {
                    Ok(())
                } else {
                    Err(TypeError::mismatch(name, self.describe(value, pool)))
                }
            }
            TypeDescriptor::Enumeration(enumeration) => match value {
                Value::Enumeration { type_name, item }
                    if enumeration.has_item(item)
                        && type_name
                            .as_deref()
                            .map(|t| canonical_type(t) == enumeration.name)
                            .unwrap_or(true) =>
                {
                    Ok(())
                }
                other => Err(TypeError::mismatch(name, self.describe(other, pool))),
            },
            TypeDescriptor::Defined(defined) => match value {
                Value::Defined {
                    type_name,
                    value: inner,
                } => {
                    let actual = self
                        .registry
                        .canonical_name(type_name)
                        .unwrap_or(type_name.as_str());
                    if actual == defined.name {
                        self.descend(inner, &defined.base, pool, walk)
                    } else if self.specializes(actual, &defined.name) {
                        self.check_at(value, actual, pool, walk)
                    } else {
                        Err(TypeError::mismatch(name, actual))
                    }
                }
                other => Err(TypeError::mismatch(name, self.describe(other, pool))),
            },
            TypeDescriptor::Aggregate(agg_type) => {
                let Value::Aggregate(agg) = strip_defined(value) else {
                    return Err(TypeError::mismatch(name, self.describe(value, pool)));
                };
                if agg.kind != agg_type.kind {
                    return Err(TypeError::mismatch(name, agg.kind.name()));
                }
                if !agg_type.admits_len(agg.len()) {
                    return Err(TypeError::BoundViolation {
                        type_name: agg_type.name.clone(),
                        len: agg.len(),
                    });
                }
                if agg_type.unique {
                    if let Some((i, j)) = agg.first_duplicate() {
                        return Err(TypeError::UniquenessViolation {
                            type_name: agg_type.name.clone(),
                            first: i + 1,
                            second: j + 1,
                        });
                    }
                }
                for item in &agg.items {
                    if item.is_undefined() {
                        if !agg_type.optional_elements {
                            return Err(TypeError::mismatch(&agg_type.element_type, "?"));
                        }
                        continue;
                    }
                    self.descend(item, &agg_type.element_type, pool, walk)?;
                }
                Ok(())
            }
            TypeDescriptor::Select(select) => {
                let inner = match value {
                    Value::Select { type_name, value: inner } => {
                        // The wrapper must name this select or one nested in it.
                        let admitted = self.registry.canonical_name(type_name).is_some_and(|wrapper| {
                            wrapper == select.name
                                || self
                                    .registry
                                    .select_members(&select.name)
                                    .is_some_and(|members| members.contains(wrapper))
                        });
                        if !admitted {
                            return Err(TypeError::select_mismatch(&select.name, type_name.as_str()));
                        }
                        inner.as_ref()
                    }
                    other => other,
                };
                let resolved = self.registry.select_members(&select.name).and_then(|members| {
                    self.type_names(inner, pool)
                        .into_iter()
                        .find(|n| members.contains(n))
                });
                match resolved {
                    Some(alternative) => self.descend(inner, &alternative, pool, walk),
                    None => Err(TypeError::select_mismatch(
                        &select.name,
                        self.describe(inner, pool),
                    )),
                }
            }
            TypeDescriptor::Entity(entity) => {
                let Some(id) = value.as_entity_ref() else {
                    return Err(TypeError::mismatch(name, self.describe(value, pool)));
                };
                let Some(instance) = pool.get(id) else {
                    return Err(TypeError::mismatch(name, format!("dangling reference {}", id)));
                };
                if !self.registry.is_kind_of(&instance.entity, &entity.name) {
                    return Err(TypeError::mismatch(name, instance.entity.as_str()));
                }
                if self.options.deep_entities && walk.visited.insert(id) {
                    trace!(%id, entity = %instance.entity, depth = walk.depth, "descending into instance");
                    if let Some(layout) = self.registry.layout(&instance.entity) {
                        for slot in layout.slots() {
                            if let Some(slot_value) = instance.get_attr(&slot.name) {
                                self.descend(slot_value, &slot.type_name, pool, walk)?;
                            }
                        }
                    }
                }
                Ok(())
            }
        }
    }

    fn descend(
        &self,
        value: &Value,
        name: &str,
        pool: &InstancePool,
        walk: &mut Walk,
    ) -> CheckResult<()> {
        walk.depth += 1;
        let result = self.check_at(value, name, pool, walk);
        walk.depth -= 1;
        result
    }

    /// Whether defined type `sub` is (transitively) based on `sup`.
    pub(crate) fn specializes(&self, sub: &str, sup: &str) -> bool {
        self.registry.type_closure(sub).iter().any(|n| n == sup)
    }

    pub(crate) fn simple_accepts(&self, kind: SimpleKind, value: &Value) -> bool {
        match (kind, strip_defined(value)) {
            (SimpleKind::Integer, Value::Integer(_)) => true,
            (SimpleKind::Real, Value::Real(_)) => true,
            (SimpleKind::Real, Value::Integer(_)) => self.registry.integer_is_real(),
            (SimpleKind::Number, Value::Integer(_) | Value::Real(_)) => true,
            (SimpleKind::String, Value::String(_)) => true,
            (SimpleKind::Boolean, Value::Boolean(_)) => true,
            (SimpleKind::Logical, Value::Logical(_) | Value::Boolean(_)) => true,
            (SimpleKind::Binary, Value::Binary(_)) => true,
            _ => false,
        }
    }

    /// Short description of a value for error messages.
    pub(crate) fn describe(&self, value: &Value, pool: &InstancePool) -> String {
        match value {
            Value::EntityRef(id) => pool
                .get(*id)
                .map(|inst| inst.entity.clone())
                .unwrap_or_else(|| format!("dangling reference {}", id)),
            Value::Defined { type_name, .. } | Value::Select { type_name, .. } => {
                type_name.clone()
            }
            Value::Enumeration {
                type_name: Some(t),
                ..
            } => t.clone(),
            other => other.category().to_string(),
        }
    }

    fn collect_names(&self, value: &Value, pool: &InstancePool, names: &mut BTreeSet<String>) {
        match value {
            Value::Undefined => {}
            Value::Integer(_) => {
                self.add_closure("INTEGER", names);
                if self.registry.integer_is_real() {
                    self.add_closure("REAL", names);
                }
                self.add_closure("NUMBER", names);
            }
            Value::Real(_) => {
                self.add_closure("REAL", names);
                self.add_closure("NUMBER", names);
            }
            Value::String(_) => self.add_closure("STRING", names),
            Value::Boolean(_) => {
                self.add_closure("BOOLEAN", names);
                self.add_closure("LOGICAL", names);
            }
            Value::Logical(_) => self.add_closure("LOGICAL", names),
            Value::Binary(_) => self.add_closure("BINARY", names),
            Value::Enumeration { type_name, .. } => {
                if let Some(t) = type_name {
                    self.add_closure(t, names);
                }
            }
            Value::Defined { type_name, value } => {
                self.add_closure(type_name, names);
                self.collect_names(value, pool, names);
            }
            Value::Aggregate(agg) => {
                names.insert(agg.kind.name().to_string());
            }
            Value::Select { type_name, value } => {
                self.collect_names(value, pool, names);
                self.add_closure(type_name, names);
            }
            Value::EntityRef(id) => {
                if let Some(instance) = pool.get(*id) {
                    self.add_closure(&instance.entity, names);
                }
            }
        }
    }

    fn add_closure(&self, name: &str, names: &mut BTreeSet<String>) {
        match self.registry.canonical_name(name) {
            Some(canonical) => {
                let closure = self.registry.type_closure(canonical);
                if closure.is_empty() {
                    names.insert(canonical.to_string());
                } else {
                    names.extend(closure.iter().cloned());
                }
            }
            None => {
                names.insert(name.to_string());
            }
        }
    }
}

/// Look through defined-type wrappers.
pub(crate) fn strip_defined(value: &Value) -> &Value {
    match value {
        Value::Defined { value, .. } => strip_defined(value),
        other => other,
    }
}
