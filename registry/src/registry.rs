//! The Registry - immutable schema lookup.

use crate::{
    canonical_type, EntityDef, EntityLayout, GlobalRule, RegistryError, RegistryResult,
    TypeClosures, TypeDescriptor, UniqueRule, WhereRule,
};
use std::collections::{HashMap, HashSet};

/// The Registry provides runtime lookup of schema definitions.
/// It is immutable after construction.
#[derive(Debug)]
pub struct Registry {
    /// Canonical schema name, used to qualify TYPEOF results.
    schema: String,
    integer_is_real: bool,
    /// Type descriptors by canonical name.
    types: HashMap<String, TypeDescriptor>,
    /// Flattened layout of every entity.
    layouts: HashMap<String, EntityLayout>,
    /// Precomputed type closures, select membership and subtype sets.
    closures: TypeClosures,
    global_rules: Vec<GlobalRule>,
}

impl Registry {
    pub(crate) fn new(
        schema: String,
        integer_is_real: bool,
        types: HashMap<String, TypeDescriptor>,
        layouts: HashMap<String, EntityLayout>,
        closures: TypeClosures,
        global_rules: Vec<GlobalRule>,
    ) -> Self {
        Self {
            schema,
            integer_is_real,
            types,
            layouts,
            closures,
            global_rules,
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn integer_is_real(&self) -> bool {
        self.integer_is_real
    }

    // ==================== Type Lookups ====================

    /// Canonical registered name for `name`, which may be schema-qualified
    /// and in any case.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        let trimmed = name.trim();
        if !trimmed.contains(char::is_whitespace) {
            if let Some((schema, _)) = trimmed.rsplit_once('.') {
                if !schema.eq_ignore_ascii_case(&self.schema) {
                    return None;
                }
            }
        }
        self.types
            .get_key_value(&canonical_type(trimmed))
            .map(|(k, _)| k.as_str())
    }

    /// Look up a type by (possibly qualified, any-case) name.
    ///
    /// Fails with `UnknownType` for names the schema does not declare,
    /// including names qualified with another schema.
    pub fn resolve(&self, name: &str) -> RegistryResult<&TypeDescriptor> {
        self.canonical_name(name)
            .and_then(|n| self.types.get(n))
            .ok_or_else(|| RegistryError::unknown_type(name, &self.schema))
    }

    /// Look up a type by canonical name.
    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    /// All registered descriptors.
    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    // ==================== Entity Lookups ====================

    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.resolve(name).ok().and_then(|d| d.as_entity())
    }

    /// Flattened layout of an entity.
    pub fn layout(&self, entity: &str) -> Option<&EntityLayout> {
        match self.layouts.get(entity) {
            Some(layout) => Some(layout),
            None => self
                .canonical_name(entity)
                .and_then(|n| self.layouts.get(n)),
        }
    }

    /// Names of all entities.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.layouts.keys().map(|k| k.as_str())
    }

    /// Check whether `sub` is a strict subtype of `sup`.
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        sub != sup
            && self
                .layouts
                .get(sub)
                .map(|layout| layout.has_ancestor(sup))
                .unwrap_or(false)
    }

    /// Check whether `entity` is `ancestor` or one of its subtypes.
    pub fn is_kind_of(&self, entity: &str, ancestor: &str) -> bool {
        entity == ancestor || self.is_subtype(entity, ancestor)
    }

    /// The entity and its supertypes, supertypes first.
    pub fn ancestors(&self, entity: &str) -> &[String] {
        self.layout(entity).map(|l| l.ancestors()).unwrap_or(&[])
    }

    /// All transitive subtypes (excluding the entity itself).
    pub fn subtypes(&self, entity: &str) -> impl Iterator<Item = &str> {
        self.closures.subtypes(entity)
    }

    // ==================== Select & Closure Lookups ====================

    /// Every type admitted by a select, through nested selects.
    pub fn select_members(&self, select: &str) -> Option<&HashSet<String>> {
        self.closures.select_members(select)
    }

    /// Type closure of a registered type: the type, what it specializes, and
    /// every select that admits it.
    pub fn type_closure(&self, name: &str) -> &[String] {
        self.closures.closure(name)
    }

    /// Schema-qualified spelling for TYPEOF results.
    ///
    /// Simple types and aggregate kinds stay bare.
    pub fn qualify(&self, name: &str) -> String {
        match self.types.get(name) {
            Some(d) if d.is_named() => format!("{}.{}", self.schema, name),
            _ => name.to_string(),
        }
    }

    // ==================== Rule Lookups ====================

    /// Domain rules applying to instances of `entity`: those of every
    /// ancestor, supertypes first, paired with the declaring entity.
    pub fn rules_for(&self, entity: &str) -> Vec<(&str, &WhereRule)> {
        self.ancestors(entity)
            .iter()
            .filter_map(|a| self.types.get(a).and_then(|d| d.as_entity()))
            .flat_map(|def| def.where_rules.iter().map(move |r| (def.name.as_str(), r)))
            .collect()
    }

    /// Uniqueness rules applying to instances of `entity`, with their declaring entity.
    pub fn unique_rules_for(&self, entity: &str) -> Vec<(&str, &UniqueRule)> {
        self.ancestors(entity)
            .iter()
            .filter_map(|a| self.types.get(a).and_then(|d| d.as_entity()))
            .flat_map(|def| def.unique_rules.iter().map(move |r| (def.name.as_str(), r)))
            .collect()
    }

    pub fn global_rules(&self) -> &[GlobalRule] {
        &self.global_rules
    }
}

#[cfg(test)]
mod tests {
    use crate::{AttrDef, Expr, RegistryBuilder};
    use pretty_assertions::assert_eq;

    fn datum_schema() -> crate::Registry {
        let mut builder = RegistryBuilder::new("index_attribute");
        builder.defined_type("label", "STRING").unwrap();
        builder.defined_type("short_label", "label").unwrap();
        builder
            .entity("shape_aspect")
            .attr(AttrDef::new("name", "label"))
            .where_rule("wr1", Expr::lit(true))
            .done()
            .unwrap();
        builder
            .entity("datum")
            .subtype_of("shape_aspect")
            .attr(AttrDef::new("identification", "short_label"))
            .where_rule("wr2", Expr::lit(true))
            .done()
            .unwrap();
        builder
            .entity("common_datum")
            .subtype_of("datum")
            .done()
            .unwrap();
        builder
            .select("datum_or_common_datum", ["datum", "common_datum"])
            .unwrap();
        builder.select("any_label", ["label"]).unwrap();
        builder.select("outer", ["any_label"]).unwrap();
        builder.build().unwrap()
    }

    // ========== TEST: defined_chain_closure ==========
    #[test]
    fn test_defined_chain_closure() {
        // GIVEN short_label = label = STRING
        let registry = datum_schema();

        // WHEN the closure of SHORT_LABEL is requested
        let closure = registry.type_closure("SHORT_LABEL");

        // THEN it lists itself, its bases and every select admitting a base
        assert_eq!(
            closure,
            &["SHORT_LABEL", "LABEL", "STRING", "ANY_LABEL", "OUTER"]
        );
    }

    // ========== TEST: entity_closure_includes_selects ==========
    #[test]
    fn test_entity_closure_includes_ancestors_and_selects() {
        let registry = datum_schema();

        let closure = registry.type_closure("COMMON_DATUM");

        assert_eq!(
            closure,
            &["COMMON_DATUM", "DATUM", "SHAPE_ASPECT", "DATUM_OR_COMMON_DATUM"]
        );
    }

    // ========== TEST: nested_select_members ==========
    #[test]
    fn test_nested_select_members() {
        let registry = datum_schema();

        let members = registry.select_members("OUTER").unwrap();

        assert!(members.contains("ANY_LABEL"));
        assert!(members.contains("LABEL"));
    }

    // ========== TEST: rules_for_inherits ==========
    #[test]
    fn test_rules_for_includes_ancestor_rules() {
        let registry = datum_schema();

        let rules: Vec<(&str, &str)> = registry
            .rules_for("COMMON_DATUM")
            .into_iter()
            .map(|(owner, r)| (owner, r.name.as_str()))
            .collect();

        assert_eq!(rules, vec![("SHAPE_ASPECT", "wr1"), ("DATUM", "wr2")]);
    }

    // ========== TEST: subtype_queries ==========
    #[test]
    fn test_subtype_queries() {
        let registry = datum_schema();

        assert!(registry.is_subtype("COMMON_DATUM", "SHAPE_ASPECT"));
        assert!(registry.is_kind_of("DATUM", "DATUM"));
        assert!(!registry.is_subtype("SHAPE_ASPECT", "DATUM"));
        let mut subs: Vec<&str> = registry.subtypes("SHAPE_ASPECT").collect();
        subs.sort();
        assert_eq!(subs, vec!["COMMON_DATUM", "DATUM"]);
    }

    // ========== TEST: qualify ==========
    #[test]
    fn test_qualify_leaves_simple_types_bare() {
        let registry = datum_schema();

        assert_eq!(registry.qualify("LABEL"), "INDEX_ATTRIBUTE.LABEL");
        assert_eq!(registry.qualify("STRING"), "STRING");
    }

    // ========== TEST: layout_lookup_accepts_qualified ==========
    #[test]
    fn test_layout_lookup_accepts_qualified_name() {
        let registry = datum_schema();

        let layout = registry.layout("index_attribute.datum").unwrap();

        assert_eq!(layout.entity, "DATUM");
        let names: Vec<&str> = layout.slot_names().collect();
        assert_eq!(names, vec!["name", "identification"]);
    }
}
