//! RegistryBuilder for constructing an immutable Registry.

use crate::layout::compute_layouts;
use crate::{
    canonical_attr, canonical_type, AggregateType, AttrDef, AttrKind,
    DefinedType, EntityDef, EnumerationType, Expr, GlobalRule, Registry, RegistryError,
    RegistryResult, SelectType, SimpleKind, TypeClosures, TypeDescriptor,
    UniqueRule, WhereRule,
};
use express_core::AggregateKind;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Builder for constructing an immutable Registry.
#[derive(Debug)]
pub struct RegistryBuilder {
    schema: String,
    integer_is_real: bool,
    /// Types being built, by canonical name.
    types: HashMap<String, TypeDescriptor>,
    /// Registration order, used for deterministic error reporting.
    order: Vec<String>,
    global_rules: Vec<GlobalRule>,
}

impl RegistryBuilder {
    /// Create a builder for the named schema, with the simple types pre-registered.
    pub fn new(schema: impl Into<String>) -> Self {
        let mut builder = Self {
            schema: canonical_type(&schema.into()),
            integer_is_real: true,
            types: HashMap::new(),
            order: Vec::new(),
            global_rules: Vec::new(),
        };
        for kind in SimpleKind::ALL {
            builder.insert(TypeDescriptor::Simple(kind));
        }
        builder
    }

    /// Whether INTEGER values are accepted where REAL is declared (default: true).
    pub fn integer_is_real(&mut self, enabled: bool) -> &mut Self {
        self.integer_is_real = enabled;
        self
    }

    /// Register a type descriptor, returning its canonical name.
    ///
    /// Re-registering an identical aggregate is a no-op; any other repeated
    /// name is a `DuplicateType` error.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> RegistryResult<String> {
        let descriptor = canonicalize(descriptor);
        if let TypeDescriptor::Aggregate(agg) = &descriptor {
            if let Some(upper) = agg.upper {
                if agg.lower > upper {
                    return Err(RegistryError::InvalidBounds {
                        name: agg.name.clone(),
                        lower: agg.lower,
                        upper,
                    });
                }
            }
        }

        let name = descriptor.name().to_string();
        if let Some(existing) = self.types.get(&name) {
            if matches!(existing, TypeDescriptor::Aggregate(_)) && *existing == descriptor {
                return Ok(name);
            }
            return Err(RegistryError::DuplicateType(name));
        }

        self.insert(descriptor);
        Ok(name)
    }

    fn insert(&mut self, descriptor: TypeDescriptor) {
        let name = descriptor.name().to_string();
        self.order.push(name.clone());
        self.types.insert(name, descriptor);
    }

    /// `TYPE name = base;`
    pub fn defined_type(
        &mut self,
        name: impl Into<String>,
        base: impl Into<String>,
    ) -> RegistryResult<String> {
        self.register(TypeDescriptor::Defined(DefinedType {
            name: name.into(),
            base: base.into(),
        }))
    }

    /// `TYPE name = ENUMERATION OF (items);`
    pub fn enumeration<I, S>(&mut self, name: impl Into<String>, items: I) -> RegistryResult<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(TypeDescriptor::Enumeration(EnumerationType {
            name: name.into(),
            items: items.into_iter().map(Into::into).collect(),
        }))
    }

    /// Register an anonymous aggregate, returning its canonical spelling.
    pub fn aggregate(
        &mut self,
        kind: AggregateKind,
        element_type: impl Into<String>,
        lower: u64,
        upper: Option<u64>,
    ) -> RegistryResult<String> {
        self.register(TypeDescriptor::Aggregate(AggregateType::new(
            kind,
            element_type,
            lower,
            upper,
        )))
    }

    /// `TYPE name = SELECT (alternatives);`
    pub fn select<I, S>(&mut self, name: impl Into<String>, alternatives: I) -> RegistryResult<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(TypeDescriptor::Select(SelectType {
            name: name.into(),
            alternatives: alternatives.into_iter().map(Into::into).collect(),
        }))
    }

    /// Start an entity definition.
    pub fn entity(&mut self, name: impl Into<String>) -> EntityBuilder<'_> {
        EntityBuilder {
            builder: self,
            def: EntityDef::new(name.into()),
        }
    }

    /// Start a global rule definition.
    pub fn global_rule(&mut self, name: impl Into<String>) -> GlobalRuleBuilder<'_> {
        GlobalRuleBuilder {
            builder: self,
            rule: GlobalRule {
                name: canonical_type(&name.into()),
                entities: Vec::new(),
                where_rules: Vec::new(),
            },
        }
    }

    /// Check whether a type name is already registered.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(&canonical_type(name))
    }

    /// Build the immutable Registry.
    pub fn build(self) -> RegistryResult<Registry> {
        // Every reference must resolve
        for name in &self.order {
            let descriptor = &self.types[name];
            for reference in descriptor.references() {
                if !self.types.contains_key(reference) {
                    return Err(RegistryError::unknown_type(reference, name));
                }
            }
            if let TypeDescriptor::Entity(def) = descriptor {
                for supertype in &def.supertypes {
                    if !matches!(self.types.get(supertype), Some(TypeDescriptor::Entity(_))) {
                        return Err(RegistryError::NotAnEntity(supertype.clone()));
                    }
                }
            }
        }
        for rule in &self.global_rules {
            for entity in &rule.entities {
                if !matches!(self.types.get(entity), Some(TypeDescriptor::Entity(_))) {
                    return Err(RegistryError::unknown_type(entity, &rule.name));
                }
            }
        }
        self.check_defined_cycles()?;

        let entities: HashMap<String, &EntityDef> = self
            .types
            .values()
            .filter_map(|d| d.as_entity())
            .map(|e| (e.name.clone(), e))
            .collect();

        let layouts = compute_layouts(&entities)?;
        let closures = TypeClosures::build(&self.types, &layouts);

        debug!(
            schema = %self.schema,
            types = self.types.len(),
            entities = layouts.len(),
            "registry built"
        );

        Ok(Registry::new(
            self.schema,
            self.integer_is_real,
            self.types,
            layouts,
            closures,
            self.global_rules,
        ))
    }

    fn check_defined_cycles(&self) -> RegistryResult<()> {
        for name in &self.order {
            let mut seen = HashSet::new();
            let mut current = name.as_str();
            while let Some(TypeDescriptor::Defined(defined)) = self.types.get(current) {
                if !seen.insert(current) {
                    return Err(RegistryError::InheritanceCycle(name.clone()));
                }
                current = defined.base.as_str();
            }
        }
        Ok(())
    }
}

fn canonicalize(descriptor: TypeDescriptor) -> TypeDescriptor {
    match descriptor {
        TypeDescriptor::Simple(kind) => TypeDescriptor::Simple(kind),
        TypeDescriptor::Defined(d) => TypeDescriptor::Defined(DefinedType {
            name: canonical_type(&d.name),
            base: canonical_type(&d.base),
        }),
        TypeDescriptor::Enumeration(e) => TypeDescriptor::Enumeration(EnumerationType {
            name: canonical_type(&e.name),
            items: e.items,
        }),
        TypeDescriptor::Aggregate(a) => {
            let mut agg = AggregateType::new(a.kind, a.element_type, a.lower, a.upper);
            if a.unique {
                agg = agg.unique();
            }
            if a.optional_elements {
                agg = agg.optional_elements();
            }
            TypeDescriptor::Aggregate(agg)
        }
        TypeDescriptor::Select(s) => TypeDescriptor::Select(SelectType {
            name: canonical_type(&s.name),
            alternatives: s.alternatives.iter().map(|a| canonical_type(a)).collect(),
        }),
        TypeDescriptor::Entity(mut e) => {
            e.name = canonical_type(&e.name);
            e.supertypes = e.supertypes.iter().map(|s| canonical_type(s)).collect();
            for attr in &mut e.attributes {
                attr.name = canonical_attr(&attr.name);
                attr.type_name = canonical_type(&attr.type_name);
                if let AttrKind::Inverse { entity, attribute } = &mut attr.kind {
                    *entity = canonical_type(entity);
                    *attribute = canonical_attr(attribute);
                }
            }
            for rule in &mut e.unique_rules {
                rule.attributes = rule.attributes.iter().map(|a| canonical_attr(a)).collect();
            }
            TypeDescriptor::Entity(e)
        }
    }
}

/// Builder for an entity definition.
pub struct EntityBuilder<'a> {
    builder: &'a mut RegistryBuilder,
    def: EntityDef,
}

impl<'a> EntityBuilder<'a> {
    /// Add a supertype by name. Order of calls is declaration order.
    pub fn subtype_of(mut self, supertype: impl Into<String>) -> Self {
        self.def.supertypes.push(supertype.into());
        self
    }

    /// Add an attribute.
    pub fn attr(mut self, attr: AttrDef) -> Self {
        self.def.attributes.push(attr);
        self
    }

    /// Add a domain rule (`WHERE name: expr`).
    pub fn where_rule(mut self, name: impl Into<String>, expr: Expr) -> Self {
        self.def.where_rules.push(WhereRule::new(name, expr));
        self
    }

    /// Add a uniqueness rule over one or more attributes.
    pub fn unique<I, S>(mut self, name: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.unique_rules.push(UniqueRule {
            name: name.into(),
            attributes: attributes.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Mark as abstract.
    pub fn abstract_entity(mut self) -> Self {
        self.def.is_abstract = true;
        self
    }

    /// Finish building this entity.
    pub fn done(self) -> RegistryResult<String> {
        self.builder.register(TypeDescriptor::Entity(self.def))
    }
}

/// Builder for a global rule definition.
pub struct GlobalRuleBuilder<'a> {
    builder: &'a mut RegistryBuilder,
    rule: GlobalRule,
}

impl<'a> GlobalRuleBuilder<'a> {
    /// Bind an entity extent; the rule body sees it as a variable named after the entity.
    pub fn for_entity(mut self, entity: impl Into<String>) -> Self {
        self.rule.entities.push(canonical_type(&entity.into()));
        self
    }

    pub fn where_rule(mut self, name: impl Into<String>, expr: Expr) -> Self {
        self.rule.where_rules.push(WhereRule::new(name, expr));
        self
    }

    /// Finish building this rule.
    pub fn done(self) -> RegistryResult<String> {
        if self
            .builder
            .global_rules
            .iter()
            .any(|r| r.name == self.rule.name)
        {
            return Err(RegistryError::DuplicateType(self.rule.name));
        }
        let name = self.rule.name.clone();
        self.builder.global_rules.push(self.rule);
        Ok(name)
    }
}
