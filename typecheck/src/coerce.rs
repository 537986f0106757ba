//! Coercion of raw values into declared representations.

use crate::{CheckResult, CoercionPolicy, TypeChecker, TypeError};
use express_core::{AggregateKind, AggregateValue, Value};
use express_pool::InstancePool;
use express_registry::{canonical_type, TypeDescriptor};
use tracing::trace;

impl<'a> TypeChecker<'a> {
    /// Coerce `value` into the representation of `type_name`, then check it.
    ///
    /// Wraps defined types, relabels aggregate literals (LISTs) to the
    /// declared kind and element type, and wraps selects in the first alternative (declaration
    /// order) that accepts the value. Entity references satisfying a select
    /// stay bare. A value whose shape cannot be brought to the declared type
    /// fails with `CoercionError`; a well-shaped value that still does not
    /// conform fails with the checker's error.
    pub fn coerce(&self, value: Value, type_name: &str, pool: &InstancePool) -> CheckResult<Value> {
        let name = self.resolve_name(type_name)?;
        if value.is_undefined() {
            return Ok(value);
        }
        let coerced = self.coerce_to(value, name, pool, 0)?;
        trace!(type_name = name, policy = ?self.options.coercion, "coerced value");
        self.check(&coerced, name, pool)?;
        Ok(coerced)
    }

    fn coerce_to(
        &self,
        value: Value,
        name: &str,
        pool: &InstancePool,
        depth: usize,
    ) -> CheckResult<Value> {
        if depth > self.options.max_depth {
            return Err(TypeError::CycleDetected(self.options.max_depth));
        }
        let descriptor = self
            .registry
            .get(name)
            .ok_or_else(|| TypeError::UnknownType(name.to_string()))?;

        match descriptor {
            TypeDescriptor::Simple(kind) => {
                if self.simple_accepts(*kind, &value) {
                    Ok(value)
                } else {
                    Err(TypeError::coercion(name, self.describe(&value, pool)))
                }
            }
            TypeDescriptor::Entity(_) => {
                if value.as_entity_ref().is_some() {
                    Ok(value)
                } else {
                    Err(TypeError::coercion(name, self.describe(&value, pool)))
                }
            }
            TypeDescriptor::Enumeration(enumeration) => match value {
                Value::Enumeration { type_name, item }
                    if enumeration.has_item(&item)
                        && type_name
                            .as_deref()
                            .map(|t| canonical_type(t) == enumeration.name)
                            .unwrap_or(true) =>
                {
                    Ok(Value::Enumeration {
                        type_name: Some(enumeration.name.clone()),
                        item,
                    })
                }
                other => Err(TypeError::coercion(name, self.describe(&other, pool))),
            },
            TypeDescriptor::Defined(defined) => {
                let inner = match value {
                    Value::Defined {
                        type_name,
                        value: inner,
                    } => {
                        let actual = canonical_type(&type_name);
                        if actual == defined.name {
                            *inner
                        } else if self.specializes(&actual, &defined.name) {
                            return Ok(Value::Defined {
                                type_name,
                                value: inner,
                            });
                        } else {
                            return Err(TypeError::coercion(name, type_name));
                        }
                    }
                    other => other,
                };
                let inner = self.coerce_to(inner, &defined.base, pool, depth + 1)?;
                Ok(Value::defined(defined.name.clone(), inner))
            }
            TypeDescriptor::Aggregate(agg_type) => {
                let Value::Aggregate(agg) = value else {
                    return Err(TypeError::coercion(name, self.describe(&value, pool)));
                };
                // Only a literal LIST takes on the declared kind.
                if agg.kind != agg_type.kind && agg.kind != AggregateKind::List {
                    return Err(TypeError::mismatch(name, agg.kind.name()));
                }
                let items = match self.options.coercion {
                    CoercionPolicy::Shallow => agg.items,
                    CoercionPolicy::Deep => agg
                        .items
                        .into_iter()
                        .map(|item| {
                            if item.is_undefined() {
                                Ok(item)
                            } else {
                                self.coerce_to(item, &agg_type.element_type, pool, depth + 1)
                            }
                        })
                        .collect::<CheckResult<Vec<_>>>()?,
                };
                Ok(Value::Aggregate(
                    AggregateValue::new(agg_type.kind, items)
                        .with_element_type(agg_type.element_type.clone()),
                ))
            }
            TypeDescriptor::Select(select) => {
                let members = self.registry.select_members(&select.name);
                let value = match value {
                    Value::Select {
                        type_name,
                        value: inner,
                    } => {
                        let actual = canonical_type(&type_name);
                        if actual == select.name {
                            return Ok(Value::Select {
                                type_name,
                                value: inner,
                            });
                        }
                        if members.map(|m| m.contains(&actual)).unwrap_or(false) {
                            return Ok(Value::select(select.name.clone(), *inner));
                        }
                        return Err(TypeError::select_mismatch(&select.name, type_name));
                    }
                    other => other,
                };

                if value.as_entity_ref().is_some() {
                    return Ok(value);
                }
                if self.check(&value, name, pool).is_ok() {
                    return Ok(Value::select(select.name.clone(), value));
                }
                for alternative in &select.alternatives {
                    let Ok(candidate) = self.coerce_to(value.clone(), alternative, pool, depth + 1)
                    else {
                        continue;
                    };
                    if self.check(&candidate, alternative, pool).is_ok() {
                        let inner = match candidate {
                            Value::Select { value, .. } => *value,
                            other => other,
                        };
                        return Ok(Value::select(select.name.clone(), inner));
                    }
                }
                Err(TypeError::select_mismatch(
                    &select.name,
                    self.describe(&value, pool),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::checker::tests::schema;
    use crate::{CheckOptions, CoercionPolicy, TypeChecker, TypeError};
    use express_core::{attrs, AggregateKind, Value};
    use express_pool::InstancePool;
    use express_registry::{AttrDef, RegistryBuilder};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    // ========== TEST: coerce_wraps_defined ==========
    #[test]
    fn test_coerce_wraps_defined_chain() {
        // GIVEN identifier = label = STRING
        let registry = schema();
        let pool = InstancePool::new(registry.clone());
        let checker = TypeChecker::new(&registry);

        // WHEN a raw string is coerced into identifier
        let value = checker.coerce("d1".into(), "identifier", &pool).unwrap();

        // THEN it is wrapped once per defined level
        assert_eq!(
            value,
            Value::defined("IDENTIFIER", Value::defined("LABEL", "d1".into()))
        );
    }

    // ========== TEST: coerce_relabels_aggregate ==========
    #[test]
    fn test_coerce_relabels_raw_list_as_declared_array() {
        let registry = schema();
        let pool = InstancePool::new(registry.clone());
        let checker = TypeChecker::new(&registry);

        let raw = Value::list(vec![Value::Real(1.0), Value::Real(2.0), Value::Real(3.0)]);
        let value = checker.coerce(raw, "ARRAY [1:3] OF REAL", &pool).unwrap();

        let agg = value.as_aggregate().unwrap();
        assert_eq!(agg.kind, AggregateKind::Array);
        assert_eq!(agg.element_type.as_deref(), Some("REAL"));
        assert_eq!(agg.items, vec![Value::Real(1.0), Value::Real(2.0), Value::Real(3.0)]);
    }

    // ========== TEST: coerce_keeps_unordered_kinds ==========
    #[test]
    fn test_coerce_rejects_set_or_bag_for_ordered_aggregate() {
        // GIVEN ARRAY [1:3] OF REAL and SET [0:?] OF INTEGER
        let registry = schema();
        let pool = InstancePool::new(registry.clone());
        let checker = TypeChecker::new(&registry);

        // THEN unordered collections are not relabelled as arrays
        assert_eq!(
            checker.coerce(Value::set(vec![Value::Real(1.0)]), "ARRAY [1:3] OF REAL", &pool),
            Err(TypeError::mismatch("ARRAY [1:3] OF REAL", "SET"))
        );
        assert_eq!(
            checker.coerce(Value::bag(vec![Value::Real(1.0)]), "ARRAY [1:3] OF REAL", &pool),
            Err(TypeError::mismatch("ARRAY [1:3] OF REAL", "BAG"))
        );
        assert_eq!(
            checker.coerce(Value::array(vec![Value::Integer(1)]), "SET [0:?] OF INTEGER", &pool),
            Err(TypeError::mismatch("SET [0:?] OF INTEGER", "ARRAY"))
        );

        // AND a literal list still becomes a set, duplicates rejected
        let set = checker
            .coerce(Value::list(vec![1.into(), 2.into()]), "SET [0:?] OF INTEGER", &pool)
            .unwrap();
        assert_eq!(set.as_aggregate().unwrap().kind, AggregateKind::Set);
        assert!(matches!(
            checker.coerce(Value::list(vec![1.into(), 1.into()]), "SET [0:?] OF INTEGER", &pool),
            Err(TypeError::UniquenessViolation { .. })
        ));
    }

    // ========== TEST: coerce_bound_violation ==========
    #[test]
    fn test_coerce_reports_bound_violation_after_wrapping() {
        let registry = schema();
        let pool = InstancePool::new(registry.clone());
        let checker = TypeChecker::new(&registry);

        let result = checker.coerce(Value::list(vec![]), "ARRAY [1:3] OF REAL", &pool);

        assert!(matches!(result, Err(TypeError::BoundViolation { len: 0, .. })));
    }

    // ========== TEST: coerce_wrong_shape ==========
    #[test]
    fn test_coerce_wrong_shape_is_coercion_error() {
        let registry = schema();
        let pool = InstancePool::new(registry.clone());
        let checker = TypeChecker::new(&registry);

        assert_eq!(
            checker.coerce("x".into(), "ARRAY [1:3] OF REAL", &pool),
            Err(TypeError::coercion("ARRAY [1:3] OF REAL", "STRING"))
        );
        assert_eq!(
            checker.coerce(Value::Real(1.0), "label", &pool),
            Err(TypeError::coercion("STRING", "REAL"))
        );
    }

    // ========== TEST: coerce_select_first_alternative ==========
    #[test]
    fn test_coerce_select_picks_first_accepting_alternative() {
        let registry = schema();
        let pool = InstancePool::new(registry.clone());
        let checker = TypeChecker::new(&registry);

        let text = checker.coerce("x".into(), "text_or_side", &pool).unwrap();
        assert_eq!(
            text,
            Value::select("TEXT_OR_SIDE", Value::defined("LABEL", "x".into()))
        );

        let side = checker
            .coerce(Value::enumeration("left"), "text_or_side", &pool)
            .unwrap();
        assert_eq!(
            side,
            Value::select(
                "TEXT_OR_SIDE",
                Value::Enumeration {
                    type_name: Some("SIDE".into()),
                    item: "left".into()
                }
            )
        );

        assert!(matches!(
            checker.coerce(Value::Integer(1), "text_or_side", &pool),
            Err(TypeError::SelectMismatch { .. })
        ));
    }

    // ========== TEST: coerce_select_keeps_entity_refs_bare ==========
    #[test]
    fn test_coerce_select_keeps_entity_refs_bare() {
        let registry = schema();
        let mut pool = InstancePool::new(registry.clone());
        let datum = pool.insert("datum", attrs! {}).unwrap();
        let aspect = pool.insert("shape_aspect", attrs! {}).unwrap();
        let checker = TypeChecker::new(&registry);

        assert_eq!(
            checker.coerce(datum.into(), "datum_or_common_datum", &pool),
            Ok(Value::EntityRef(datum))
        );
        assert!(matches!(
            checker.coerce(aspect.into(), "datum_or_common_datum", &pool),
            Err(TypeError::SelectMismatch { .. })
        ));
    }

    // ========== TEST: shallow_vs_deep ==========
    #[test]
    fn test_shallow_coercion_does_not_convert_elements() {
        // GIVEN LIST [1:?] OF label
        let mut builder = RegistryBuilder::new("s");
        builder.defined_type("label", "STRING").unwrap();
        let labels = builder
            .aggregate(AggregateKind::List, "label", 1, None)
            .unwrap();
        builder
            .entity("tagged")
            .attr(AttrDef::new("tags", labels.clone()))
            .done()
            .unwrap();
        let registry = Arc::new(builder.build().unwrap());
        let pool = InstancePool::new(registry.clone());
        let raw = Value::list(vec!["a".into(), "b".into()]);

        // WHEN coerced shallowly, raw strings stay raw and fail the element check
        let shallow = TypeChecker::new(&registry);
        assert_eq!(
            shallow.coerce(raw.clone(), &labels, &pool),
            Err(TypeError::mismatch("LABEL", "STRING"))
        );

        // THEN deep coercion wraps every element
        let deep = TypeChecker::with_options(
            &registry,
            CheckOptions::new().with_coercion(CoercionPolicy::Deep),
        );
        let value = deep.coerce(raw, &labels, &pool).unwrap();
        assert_eq!(
            value.as_aggregate().unwrap().items,
            vec![
                Value::defined("LABEL", "a".into()),
                Value::defined("LABEL", "b".into())
            ]
        );
    }

    #[test]
    fn test_undefined_passes_through() {
        let registry = schema();
        let pool = InstancePool::new(registry.clone());
        let checker = TypeChecker::new(&registry);

        assert_eq!(checker.coerce(Value::Undefined, "label", &pool), Ok(Value::Undefined));
    }
}
