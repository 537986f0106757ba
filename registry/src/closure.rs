//! Precomputed type relationships.

use crate::{EntityLayout, TypeDescriptor};
use std::collections::{HashMap, HashSet};

/// Per-type closures: the type itself, what it specializes, and every select
/// that (transitively) admits it.
#[derive(Debug, Clone, Default)]
pub struct TypeClosures {
    closures: HashMap<String, Vec<String>>,
    /// Transitive select membership: select -> every alternative reachable through nested selects.
    select_members: HashMap<String, HashSet<String>>,
    /// Entity -> every transitive subtype, from the layouts' ancestor lists.
    subtypes: HashMap<String, HashSet<String>>,
}

impl TypeClosures {
    pub(crate) fn build(
        types: &HashMap<String, TypeDescriptor>,
        layouts: &HashMap<String, EntityLayout>,
    ) -> Self {
        let mut closures = HashMap::new();
        for name in types.keys() {
            let mut visiting = HashSet::new();
            let base = base_closure(name, types, layouts, &mut visiting);
            closures.insert(name.clone(), base);
        }

        // select -> direct alternatives, inverted
        let mut containing: HashMap<&str, Vec<&str>> = HashMap::new();
        for descriptor in types.values() {
            if let TypeDescriptor::Select(select) = descriptor {
                for alt in &select.alternatives {
                    containing
                        .entry(alt.as_str())
                        .or_default()
                        .push(select.name.as_str());
                }
            }
        }

        for closure in closures.values_mut() {
            let mut seen: HashSet<String> = closure.iter().cloned().collect();
            let mut cursor = 0;
            while cursor < closure.len() {
                if let Some(selects) = containing.get(closure[cursor].as_str()) {
                    for select in selects {
                        if seen.insert(select.to_string()) {
                            closure.push(select.to_string());
                        }
                    }
                }
                cursor += 1;
            }
        }

        let mut select_members = HashMap::new();
        for descriptor in types.values() {
            if let TypeDescriptor::Select(select) = descriptor {
                let mut members = HashSet::new();
                collect_members(&select.name, types, &mut members);
                select_members.insert(select.name.clone(), members);
            }
        }

        let mut subtypes: HashMap<String, HashSet<String>> = HashMap::new();
        for (name, layout) in layouts {
            subtypes.entry(name.clone()).or_default();
            for ancestor in layout.ancestors().iter().filter(|a| *a != name) {
                subtypes.entry(ancestor.clone()).or_default().insert(name.clone());
            }
        }

        Self {
            closures,
            select_members,
            subtypes,
        }
    }

    /// Closure of a registered type, the type itself first.
    pub fn closure(&self, name: &str) -> &[String] {
        self.closures.get(name).map(|c| c.as_slice()).unwrap_or(&[])
    }

    /// All transitive subtypes of an entity, excluding itself.
    pub fn subtypes(&self, entity: &str) -> impl Iterator<Item = &str> {
        self.subtypes
            .get(entity)
            .into_iter()
            .flat_map(|set| set.iter().map(|s| s.as_str()))
    }

    /// Every type a select admits, through nested selects.
    pub fn select_members(&self, select: &str) -> Option<&HashSet<String>> {
        self.select_members.get(select)
    }
}

fn base_closure(
    name: &str,
    types: &HashMap<String, TypeDescriptor>,
    layouts: &HashMap<String, EntityLayout>,
    visiting: &mut HashSet<String>,
) -> Vec<String> {
    if !visiting.insert(name.to_string()) {
        return Vec::new();
    }
    let mut closure = vec![name.to_string()];
    match types.get(name) {
        Some(TypeDescriptor::Defined(defined)) => {
            for base in base_closure(&defined.base, types, layouts, visiting) {
                if !closure.contains(&base) {
                    closure.push(base);
                }
            }
        }
        Some(TypeDescriptor::Aggregate(agg)) => closure.push(agg.kind.name().to_string()),
        Some(TypeDescriptor::Entity(_)) => {
            if let Some(layout) = layouts.get(name) {
                // nearest ancestors first
                for ancestor in layout.ancestors().iter().rev().skip(1) {
                    closure.push(ancestor.clone());
                }
            }
        }
        _ => {}
    }
    closure
}

fn collect_members(select: &str, types: &HashMap<String, TypeDescriptor>, out: &mut HashSet<String>) {
    if let Some(TypeDescriptor::Select(s)) = types.get(select) {
        for alt in &s.alternatives {
            if out.insert(alt.clone()) {
                collect_members(alt, types, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::compute_layouts;
    use crate::{EntityDef, SelectType};

    fn entity(name: &str, supertypes: &[&str]) -> EntityDef {
        let mut def = EntityDef::new(name);
        def.supertypes = supertypes.iter().map(|s| s.to_string()).collect();
        def
    }

    fn closures(defs: Vec<EntityDef>, selects: Vec<SelectType>) -> TypeClosures {
        let map: HashMap<String, &EntityDef> = defs.iter().map(|d| (d.name.clone(), d)).collect();
        let layouts = compute_layouts(&map).unwrap();
        let mut types: HashMap<String, TypeDescriptor> = defs
            .iter()
            .map(|d| (d.name.clone(), TypeDescriptor::Entity(d.clone())))
            .collect();
        for select in selects {
            types.insert(select.name.clone(), TypeDescriptor::Select(select));
        }
        TypeClosures::build(&types, &layouts)
    }

    #[test]
    fn test_subtypes_are_transitive() {
        // GIVEN C <- B <- A
        let closures = closures(
            vec![entity("A", &[]), entity("B", &["A"]), entity("C", &["B"])],
            vec![],
        );

        // THEN A's subtypes are B and C, and C has none
        let mut subs: Vec<&str> = closures.subtypes("A").collect();
        subs.sort();
        assert_eq!(subs, vec!["B", "C"]);
        assert_eq!(closures.subtypes("C").count(), 0);
        assert_eq!(closures.subtypes("UNKNOWN").count(), 0);
    }

    #[test]
    fn test_closure_reaches_select_of_ancestor() {
        let closures = closures(
            vec![entity("A", &[]), entity("B", &["A"])],
            vec![SelectType {
                name: "S".into(),
                alternatives: vec!["A".into()],
            }],
        );

        assert_eq!(closures.closure("B"), ["B", "A", "S"]);
        assert!(closures.select_members("S").unwrap().contains("A"));
    }
}
