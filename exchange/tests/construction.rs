//! Construction, bounds and round-trip through the exchange structure.

mod common;

use common::exchange;
use express_core::{attrs, AggregateKind, Attributes, ErrorKind, Value};
use express_exchange::ExchangeError;
use express_mutation::MutationError;
use express_typecheck::TypeError;
use pretty_assertions::assert_eq;

fn point(coords: Vec<f64>) -> Value {
    Value::array(coords.into_iter().map(Value::Real).collect())
}

mod mandatory {
    use super::*;
    use pretty_assertions::assert_eq;

    fn complete_target() -> Attributes {
        attrs! {
            "object_name" => "gauge",
            "magnitude" => 2.5,
            "day" => 12,
            "target_id" => "T-1",
        }
    }

    #[test]
    fn test_every_mandatory_attribute_is_enforced() {
        // GIVEN a complete attribute set for an entity with inherited slots
        let ex = exchange();
        ex.construct_named("calibrated_target", complete_target())
            .unwrap();

        for attr in ["object_name", "magnitude", "day", "target_id"] {
            // WHEN one mandatory attribute is left out
            let mut attributes = complete_target();
            attributes.shift_remove(attr);
            let err = ex
                .construct_named("calibrated_target", attributes)
                .unwrap_err();

            // THEN construction fails naming that attribute
            assert_eq!(err.kind(), ErrorKind::MissingMandatoryAttribute);
            assert!(matches!(
                err,
                ExchangeError::Mutation(MutationError::MissingMandatoryAttribute { attr: ref a, .. }) if a == attr
            ));
        }

        // AND none of the failed attempts became visible
        assert_eq!(ex.len(), 1);
    }

    #[test]
    fn test_explicit_undefined_counts_as_absent() {
        let ex = exchange();

        let err = ex
            .construct("shape_aspect", vec![Value::Undefined, Value::Undefined])
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingMandatoryAttribute);
    }

    #[test]
    fn test_optional_attribute_may_be_undefined() {
        let ex = exchange();

        let id = ex
            .construct("shape_aspect", vec!["flange".into(), Value::Undefined])
            .unwrap();

        assert_eq!(ex.attribute(id, "description").unwrap(), Value::Undefined);
    }
}

mod bounds {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_array_accepts_one_to_three_elements() {
        let ex = exchange();

        for coords in [vec![1.0], vec![1.0, 2.0], vec![1.0, 2.0, 3.0]] {
            let len = coords.len();
            let id = ex
                .construct("cartesian_point", vec!["p".into(), point(coords)])
                .unwrap();
            let stored = ex.attribute(id, "coordinates").unwrap();
            assert_eq!(stored.as_aggregate().map(|agg| agg.len()), Some(len));
        }
    }

    #[test]
    fn test_array_rejects_empty_and_oversized() {
        let ex = exchange();

        for coords in [vec![], vec![1.0, 2.0, 3.0, 4.0]] {
            let err = ex
                .construct("cartesian_point", vec!["p".into(), point(coords)])
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BoundViolation);
        }
        assert!(ex.is_empty());
    }

    #[test]
    fn test_array_rejects_wrong_element_type() {
        let ex = exchange();

        let err = ex
            .construct(
                "cartesian_point",
                vec!["p".into(), Value::array(vec!["x".into()])],
            )
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_oversized_write_leaves_instance_unchanged() {
        // GIVEN a valid point
        let ex = exchange();
        let id = ex
            .construct("cartesian_point", vec!["p".into(), point(vec![0.0])])
            .unwrap();

        // WHEN an oversized array is written
        let err = ex
            .set_attribute(id, "coordinates", point(vec![0.0; 4]))
            .unwrap_err();

        // THEN the old value survives
        assert_eq!(err.kind(), ErrorKind::BoundViolation);
        let instance = ex.get(id).unwrap();
        assert_eq!(instance.version, 1);
        assert_eq!(
            instance.get_attr("coordinates").and_then(|v| v.as_aggregate()).map(|a| a.len()),
            Some(1)
        );
    }
}

mod aggregates_and_selects {
    use super::*;
    use pretty_assertions::assert_eq;

    fn group(tags: Value, ranks: Value, subject: Value) -> Vec<Value> {
        vec![tags, ranks, subject]
    }

    fn type_error(err: ExchangeError) -> TypeError {
        match err {
            ExchangeError::Mutation(MutationError::InvalidAttribute { error, .. }) => error,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_set_members_are_rejected() {
        // GIVEN an aspect to use as subject
        let ex = exchange();
        let aspect = ex
            .construct("shape_aspect", vec!["a".into(), Value::Undefined])
            .unwrap();

        // WHEN a set holds the same string twice
        let err = ex
            .construct(
                "item_group",
                group(
                    Value::set(vec!["x".into(), "x".into()]),
                    Value::list(vec![]),
                    aspect.into(),
                ),
            )
            .unwrap_err();

        // THEN construction fails and nothing is stored
        assert_eq!(err.kind(), ErrorKind::UniquenessViolation);
        assert_eq!(
            type_error(err),
            TypeError::UniquenessViolation {
                type_name: "SET [0:?] OF STRING".into(),
                first: 1,
                second: 2,
            }
        );
        assert_eq!(ex.len(), 1);
    }

    #[test]
    fn test_unique_list_rejects_repeat_on_write() {
        // GIVEN a valid group
        let ex = exchange();
        let aspect = ex
            .construct("shape_aspect", vec!["a".into(), Value::Undefined])
            .unwrap();
        let id = ex
            .construct(
                "item_group",
                group(
                    Value::set(vec!["x".into(), "y".into()]),
                    Value::list(vec![1.into(), 2.into()]),
                    aspect.into(),
                ),
            )
            .unwrap();

        // WHEN the unique list is overwritten with a repeat
        let err = ex
            .set_attribute(id, "ranks", Value::list(vec![1.into(), 2.into(), 1.into()]))
            .unwrap_err();

        // THEN the write fails and the old list survives
        assert_eq!(
            type_error(err),
            TypeError::UniquenessViolation {
                type_name: "LIST [0:?] OF UNIQUE INTEGER".into(),
                first: 1,
                second: 3,
            }
        );
        let ranks = ex.attribute(id, "ranks").unwrap();
        assert_eq!(
            ranks.as_aggregate().map(|agg| agg.items.clone()),
            Some(vec![Value::Integer(1), Value::Integer(2)])
        );
    }

    #[test]
    fn test_select_slot_accepts_only_its_alternatives() {
        let ex = exchange();
        let aspect = ex
            .construct("shape_aspect", vec!["a".into(), Value::Undefined])
            .unwrap();
        let point = ex
            .construct("cartesian_point", vec!["p".into(), point(vec![0.0])])
            .unwrap();
        let index = ex.construct("index_attribute", vec![aspect.into()]).unwrap();
        let tags = || Value::set(vec![]);
        let ranks = || Value::list(vec![]);

        // GIVEN a group whose subject is a point (a geometric item)
        let id = ex
            .construct("item_group", group(tags(), ranks(), point.into()))
            .unwrap();

        // WHEN an index attribute is offered as subject
        let err = ex
            .construct("item_group", group(tags(), ranks(), index.into()))
            .unwrap_err();
        assert_eq!(
            type_error(err),
            TypeError::select_mismatch("GEOMETRY_SELECT", "INDEX_ATTRIBUTE")
        );

        // THEN a plain string fails the same way on write
        let err = ex.set_attribute(id, "subject", "x".into()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SelectMismatch);
        assert_eq!(ex.attribute(id, "subject").unwrap(), Value::EntityRef(point));

        // AND a shape aspect is a valid replacement
        ex.set_attribute(id, "subject", aspect.into()).unwrap();
        assert_eq!(ex.used_in(aspect, "ITEM_GROUP.SUBJECT"), vec![id]);
    }
}

mod round_trip {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_and_reconstruct_is_lossless() {
        // GIVEN a point with awkward reals
        let ex = exchange();
        let original = ex
            .construct(
                "cartesian_point",
                vec![
                    "origin".into(),
                    point(vec![0.1 + 0.2, 1e-300, -std::f64::consts::PI]),
                ],
            )
            .unwrap();

        // WHEN its attributes are extracted and fed back in
        let extracted = ex.attributes(original).unwrap();
        let copy = ex
            .construct_named("cartesian_point", extracted.clone())
            .unwrap();

        // THEN every attribute is equal, in the same order
        let copied = ex.attributes(copy).unwrap();
        assert_eq!(copied, extracted);
        assert_eq!(
            copied.keys().collect::<Vec<_>>(),
            vec!["name", "coordinates"]
        );
        let coords = copied["coordinates"].as_aggregate().unwrap();
        assert_eq!(coords.kind, AggregateKind::Array);
        assert_eq!(coords.items[0], Value::Real(0.1 + 0.2));
        assert_eq!(coords.items[1], Value::Real(1e-300));
    }

    #[test]
    fn test_round_trip_keeps_undefined_optionals_and_references() {
        let ex = exchange();
        let aspect = ex
            .construct("shape_aspect", vec!["flange".into(), Value::Undefined])
            .unwrap();
        let index = ex.construct("index_attribute", vec![aspect.into()]).unwrap();

        let copy = ex
            .construct_named("shape_aspect", ex.attributes(aspect).unwrap())
            .unwrap();
        let index_copy = ex
            .construct_named("index_attribute", ex.attributes(index).unwrap())
            .unwrap();

        assert_eq!(ex.attributes(copy).unwrap(), ex.attributes(aspect).unwrap());
        assert_eq!(
            ex.attribute(index_copy, "identified_item").unwrap(),
            Value::EntityRef(aspect)
        );
        assert_eq!(
            ex.used_in(aspect, "INDEX_ATTRIBUTE.IDENTIFIED_ITEM"),
            vec![index, index_copy]
        );
    }
}
