//! Flattened entity layouts.
//!
//! An instance of entity `E` stores every explicit attribute of `E` and all of
//! its ancestors in one record. The layout fixes the slot order: supertypes
//! first, in declaration order (recursively), then `E`'s own attributes.
//! An attribute reached through two paths from the same declaring entity
//! (diamond inheritance) occupies a single slot.

use crate::{AttrDef, AttrKind, EntityDef, RegistryError, RegistryResult};
use std::collections::{HashMap, HashSet};

/// One stored attribute slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub name: String,
    /// Declared type, refined by redeclarations in subtypes.
    pub type_name: String,
    pub optional: bool,
    /// Entity that originally declared the attribute.
    pub owner: String,
}

/// A derived or inverse attribute visible on the entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedAttr {
    pub owner: String,
    pub def: AttrDef,
}

/// Flattened attribute layout of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityLayout {
    pub entity: String,
    slots: Vec<Slot>,
    computed: Vec<ComputedAttr>,
    /// Ancestors in supertype declaration order, the entity itself last.
    ancestors: Vec<String>,
    ancestor_set: HashSet<String>,
}

impl EntityLayout {
    /// Stored slots in layout order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.name == name)
    }

    pub fn slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.name.as_str())
    }

    /// Derived and inverse attributes, inherited ones first.
    pub fn computed(&self) -> &[ComputedAttr] {
        &self.computed
    }

    pub fn computed_attr(&self, name: &str) -> Option<&ComputedAttr> {
        self.computed.iter().find(|c| c.def.name == name)
    }

    /// The entity and all its supertypes, supertypes first.
    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    pub fn has_ancestor(&self, entity: &str) -> bool {
        self.ancestor_set.contains(entity)
    }

    pub fn arity(&self) -> usize {
        self.slots.len()
    }
}

/// Compute layouts for every entity, memoized so each supertype is flattened once.
///
/// Supertypes must already be known entities. An entity reached again while
/// its own supertypes are being flattened is an inheritance cycle.
pub(crate) fn compute_layouts(
    entities: &HashMap<String, &EntityDef>,
) -> RegistryResult<HashMap<String, EntityLayout>> {
    let mut layouts = HashMap::new();
    let mut in_progress = HashSet::new();
    let mut names: Vec<&String> = entities.keys().collect();
    names.sort();
    for name in names {
        flatten(name, entities, &mut layouts, &mut in_progress)?;
    }
    Ok(layouts)
}

fn flatten(
    name: &str,
    entities: &HashMap<String, &EntityDef>,
    layouts: &mut HashMap<String, EntityLayout>,
    in_progress: &mut HashSet<String>,
) -> RegistryResult<()> {
    if layouts.contains_key(name) {
        return Ok(());
    }
    if !in_progress.insert(name.to_string()) {
        return Err(RegistryError::InheritanceCycle(name.to_string()));
    }
    let def = entities
        .get(name)
        .ok_or_else(|| RegistryError::NotAnEntity(name.to_string()))?;

    let mut layout = EntityLayout {
        entity: def.name.clone(),
        slots: Vec::new(),
        computed: Vec::new(),
        ancestors: Vec::new(),
        ancestor_set: HashSet::new(),
    };

    for supertype in &def.supertypes {
        flatten(supertype, entities, layouts, in_progress)?;
        let parent = &layouts[supertype.as_str()];
        for slot in &parent.slots {
            merge_slot(&mut layout, slot.clone())?;
        }
        for computed in &parent.computed {
            merge_computed(&mut layout, computed.clone())?;
        }
        for ancestor in &parent.ancestors {
            if layout.ancestor_set.insert(ancestor.clone()) {
                layout.ancestors.push(ancestor.clone());
            }
        }
    }

    for attr in &def.attributes {
        apply_own(&mut layout, &def.name, attr)?;
    }

    layout.ancestor_set.insert(def.name.clone());
    layout.ancestors.push(def.name.clone());
    in_progress.remove(name);
    layouts.insert(def.name.clone(), layout);
    Ok(())
}

fn merge_slot(layout: &mut EntityLayout, slot: Slot) -> RegistryResult<()> {
    if let Some(existing) = layout.slots.iter().find(|s| s.name == slot.name) {
        if existing.owner == slot.owner {
            return Ok(());
        }
        return Err(RegistryError::attribute_collision(
            &layout.entity,
            &slot.name,
            &existing.owner,
            &slot.owner,
        ));
    }
    if let Some(existing) = layout.computed_attr(&slot.name) {
        if matches!(existing.def.kind, AttrKind::Derived(_)) {
            return Ok(());
        }
        return Err(RegistryError::attribute_collision(
            &layout.entity,
            &slot.name,
            &existing.owner,
            &slot.owner,
        ));
    }
    layout.slots.push(slot);
    Ok(())
}

fn merge_computed(layout: &mut EntityLayout, computed: ComputedAttr) -> RegistryResult<()> {
    if let Some(existing) = layout.computed_attr(&computed.def.name) {
        if existing.owner == computed.owner {
            return Ok(());
        }
        return Err(RegistryError::attribute_collision(
            &layout.entity,
            &computed.def.name,
            &existing.owner,
            &computed.owner,
        ));
    }
    // A supertype may have turned an inherited explicit attribute into a derived one.
    layout.slots.retain(|s| s.name != computed.def.name);
    layout.computed.push(computed);
    Ok(())
}

fn apply_own(layout: &mut EntityLayout, owner: &str, attr: &AttrDef) -> RegistryResult<()> {
    match &attr.kind {
        AttrKind::Explicit => {
            let previous = layout
                .slot(&attr.name)
                .map(|s| s.owner.clone())
                .or_else(|| layout.computed_attr(&attr.name).map(|c| c.owner.clone()));
            if let Some(previous) = previous {
                return Err(RegistryError::attribute_collision(
                    &layout.entity,
                    &attr.name,
                    previous,
                    owner,
                ));
            }
            layout.slots.push(Slot {
                name: attr.name.clone(),
                type_name: attr.type_name.clone(),
                optional: attr.optional,
                owner: owner.to_string(),
            });
            Ok(())
        }
        AttrKind::Redeclared => {
            let slot = layout
                .slots
                .iter_mut()
                .find(|s| s.name == attr.name)
                .ok_or_else(|| RegistryError::UnknownRedeclaration {
                    entity: owner.to_string(),
                    attr: attr.name.clone(),
                })?;
            slot.type_name = attr.type_name.clone();
            slot.optional = attr.optional;
            Ok(())
        }
        AttrKind::Derived(_) if layout.slot(&attr.name).is_some() => {
            layout.slots.retain(|s| s.name != attr.name);
            layout.computed.push(ComputedAttr {
                owner: owner.to_string(),
                def: attr.clone(),
            });
            Ok(())
        }
        AttrKind::Derived(_) | AttrKind::Inverse { .. } => {
            if let Some(existing) = layout.computed_attr(&attr.name) {
                return Err(RegistryError::attribute_collision(
                    &layout.entity,
                    &attr.name,
                    &existing.owner,
                    owner,
                ));
            }
            layout.computed.push(ComputedAttr {
                owner: owner.to_string(),
                def: attr.clone(),
            });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Expr;

    fn entity(name: &str, supertypes: &[&str], attrs: Vec<AttrDef>) -> EntityDef {
        let mut def = EntityDef::new(name);
        def.supertypes = supertypes.iter().map(|s| s.to_string()).collect();
        def.attributes = attrs;
        def
    }

    fn layouts_of(defs: &[EntityDef]) -> RegistryResult<HashMap<String, EntityLayout>> {
        let map: HashMap<String, &EntityDef> = defs.iter().map(|d| (d.name.clone(), d)).collect();
        compute_layouts(&map)
    }

    #[test]
    fn test_inheritance_cycle_is_rejected() {
        // GIVEN A <- B <- A
        let defs = vec![entity("A", &["B"], vec![]), entity("B", &["A"], vec![])];

        // THEN flattening stops at the entity reached twice
        assert!(matches!(
            layouts_of(&defs),
            Err(RegistryError::InheritanceCycle(name)) if name == "A"
        ));
    }

    #[test]
    fn test_supertype_slots_come_first() {
        // GIVEN B(b) <- A(a), C(c) <- D(d)
        let defs = vec![
            entity("A", &[], vec![AttrDef::new("a", "INTEGER")]),
            entity("C", &[], vec![AttrDef::new("c", "INTEGER")]),
            entity("B", &["A"], vec![AttrDef::new("b", "INTEGER")]),
            entity("D", &["B", "C"], vec![AttrDef::new("d", "INTEGER")]),
        ];

        // WHEN layouts are computed
        let layouts = layouts_of(&defs).unwrap();

        // THEN slot order follows supertype declaration order
        let d = &layouts["D"];
        let names: Vec<&str> = d.slot_names().collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
        assert_eq!(d.ancestors(), &["A", "B", "C", "D"]);
        assert!(d.has_ancestor("A"));
        assert_eq!(d.slot("a").unwrap().owner, "A");
    }

    #[test]
    fn test_diamond_shares_one_slot() {
        // GIVEN R(id) with L <- R, M <- R, and J <- L, M
        let defs = vec![
            entity("R", &[], vec![AttrDef::new("id", "STRING")]),
            entity("L", &["R"], vec![]),
            entity("M", &["R"], vec![]),
            entity("J", &["L", "M"], vec![]),
        ];

        let layouts = layouts_of(&defs).unwrap();

        // THEN J has one id slot and R appears once among its ancestors
        assert_eq!(layouts["J"].arity(), 1);
        assert_eq!(layouts["J"].ancestors(), &["R", "L", "M", "J"]);
    }

    #[test]
    fn test_same_name_from_different_owners_collides() {
        let defs = vec![
            entity("L", &[], vec![AttrDef::new("name", "STRING")]),
            entity("M", &[], vec![AttrDef::new("name", "STRING")]),
            entity("J", &["L", "M"], vec![]),
        ];

        let result = layouts_of(&defs);

        assert!(matches!(
            result,
            Err(RegistryError::AttributeCollision { ref attr, .. }) if attr == "name"
        ));
    }

    #[test]
    fn test_redeclaration_refines_inherited_slot() {
        let defs = vec![
            entity("A", &[], vec![AttrDef::new("value", "NUMBER").optional()]),
            entity("B", &["A"], vec![AttrDef::redeclared("value", "INTEGER")]),
        ];

        let layouts = layouts_of(&defs).unwrap();

        let slot = layouts["B"].slot("value").unwrap();
        assert_eq!(slot.type_name, "INTEGER");
        assert!(!slot.optional);
        assert_eq!(slot.owner, "A");
        assert_eq!(layouts["A"].slot("value").unwrap().type_name, "NUMBER");
    }

    #[test]
    fn test_redeclaring_unknown_attribute_fails() {
        let defs = vec![
            entity("A", &[], vec![]),
            entity("B", &["A"], vec![AttrDef::redeclared("value", "INTEGER")]),
        ];

        assert!(matches!(
            layouts_of(&defs),
            Err(RegistryError::UnknownRedeclaration { .. })
        ));
    }

    #[test]
    fn test_derived_redeclaration_removes_slot() {
        let defs = vec![
            entity(
                "A",
                &[],
                vec![AttrDef::new("name", "STRING"), AttrDef::new("size", "INTEGER")],
            ),
            entity(
                "B",
                &["A"],
                vec![AttrDef::derived("size", "INTEGER", Expr::lit(0i64))],
            ),
        ];

        let layouts = layouts_of(&defs).unwrap();

        let b = &layouts["B"];
        assert_eq!(b.arity(), 1);
        assert!(b.computed_attr("size").is_some());
    }
}
