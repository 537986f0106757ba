//! Shared schema fixture for the exchange integration tests.
//!
//! A cut-down `index_attribute` schema:
//!
//! ```text
//! representation_item (ABSTRACT)
//!   <- geometric_representation_item
//!     <- cartesian_point                  coordinates : ARRAY [1:3] OF REAL
//! shape_aspect                            name, description (OPTIONAL)
//!   <- datum                              WR1: SIZEOF(USEDIN(SELF, ..IDENTIFIED_ITEM)) <= 1
//! index_attribute                         identified_item : shape_aspect
//! item_group                              tags : SET OF STRING, ranks : LIST OF UNIQUE INTEGER,
//!                                         subject : geometry_select
//! characterized_object, measure_item, dated_item
//!   <- calibrated_target (complex, three supertypes)
//! ```

#![allow(dead_code)]

use express_core::AggregateKind;
use express_exchange::Exchange;
use express_registry::{AggregateType, AttrDef, Expr, Registry, RegistryBuilder, TypeDescriptor};
use std::sync::Arc;

pub const SCHEMA: &str = "INDEX_ATTRIBUTE";
pub const IDENTIFIED_ITEM: &str = "INDEX_ATTRIBUTE.INDEX_ATTRIBUTE.IDENTIFIED_ITEM";

pub fn registry() -> Arc<Registry> {
    let mut builder = RegistryBuilder::new("index_attribute");
    builder.defined_type("label", "STRING").unwrap();
    builder.defined_type("text", "STRING").unwrap();
    let coordinates = builder
        .aggregate(AggregateKind::Array, "REAL", 1, Some(3))
        .unwrap();

    builder
        .entity("representation_item")
        .abstract_entity()
        .attr(AttrDef::new("name", "label"))
        .done()
        .unwrap();
    builder
        .entity("geometric_representation_item")
        .subtype_of("representation_item")
        .done()
        .unwrap();
    builder
        .entity("cartesian_point")
        .subtype_of("geometric_representation_item")
        .attr(AttrDef::new("coordinates", coordinates))
        .done()
        .unwrap();
    builder
        .select("geometry_select", ["geometric_representation_item", "shape_aspect"])
        .unwrap();

    builder
        .entity("shape_aspect")
        .attr(AttrDef::new("name", "label"))
        .attr(AttrDef::new("description", "text").optional())
        .done()
        .unwrap();
    builder
        .entity("datum")
        .subtype_of("shape_aspect")
        .where_rule(
            "wr1",
            Expr::sizeof(Expr::usedin(Expr::SelfRef, IDENTIFIED_ITEM)).le(Expr::lit(1)),
        )
        .done()
        .unwrap();
    builder
        .entity("index_attribute")
        .attr(AttrDef::new("identified_item", "shape_aspect"))
        .done()
        .unwrap();

    let tags = builder
        .aggregate(AggregateKind::Set, "STRING", 0, None)
        .unwrap();
    let ranks = builder
        .register(TypeDescriptor::Aggregate(
            AggregateType::new(AggregateKind::List, "INTEGER", 0, None).unique(),
        ))
        .unwrap();
    builder
        .entity("item_group")
        .attr(AttrDef::new("tags", tags))
        .attr(AttrDef::new("ranks", ranks))
        .attr(AttrDef::new("subject", "geometry_select"))
        .done()
        .unwrap();

    builder
        .entity("characterized_object")
        .attr(AttrDef::new("object_name", "STRING"))
        .where_rule("wr1", Expr::self_attr("object_name").ne(Expr::lit("")))
        .done()
        .unwrap();
    builder
        .entity("measure_item")
        .attr(AttrDef::new("magnitude", "REAL"))
        .where_rule("wr1", Expr::self_attr("magnitude").ge(Expr::lit(0.0)))
        .done()
        .unwrap();
    builder
        .entity("dated_item")
        .attr(AttrDef::new("day", "INTEGER"))
        .where_rule(
            "wr1",
            Expr::self_attr("day")
                .ge(Expr::lit(1))
                .and(Expr::self_attr("day").le(Expr::lit(31))),
        )
        .done()
        .unwrap();
    builder
        .entity("calibrated_target")
        .subtype_of("characterized_object")
        .subtype_of("measure_item")
        .subtype_of("dated_item")
        .attr(AttrDef::new("target_id", "STRING"))
        .done()
        .unwrap();

    Arc::new(builder.build().unwrap())
}

pub fn exchange() -> Exchange {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    Exchange::new(registry())
}

/// Schema-qualified type name.
pub fn qualified(name: &str) -> String {
    format!("{}.{}", SCHEMA, name)
}
