//! Schema definition types.

use crate::Expr;
use express_core::AggregateKind;

/// Built-in simple types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimpleKind {
    Integer,
    Real,
    Number,
    String,
    Boolean,
    Logical,
    Binary,
}

impl SimpleKind {
    pub const ALL: [SimpleKind; 7] = [
        SimpleKind::Integer,
        SimpleKind::Real,
        SimpleKind::Number,
        SimpleKind::String,
        SimpleKind::Boolean,
        SimpleKind::Logical,
        SimpleKind::Binary,
    ];

    /// Keyword spelling, also the registered type name.
    pub fn name(&self) -> &'static str {
        match self {
            SimpleKind::Integer => "INTEGER",
            SimpleKind::Real => "REAL",
            SimpleKind::Number => "NUMBER",
            SimpleKind::String => "STRING",
            SimpleKind::Boolean => "BOOLEAN",
            SimpleKind::Logical => "LOGICAL",
            SimpleKind::Binary => "BINARY",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        SimpleKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }
}

/// A renaming/refinement of another type (`TYPE label = STRING;`).
#[derive(Debug, Clone, PartialEq)]
pub struct DefinedType {
    pub name: String,
    pub base: String,
}

/// An enumeration type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumerationType {
    pub name: String,
    pub items: Vec<String>,
}

impl EnumerationType {
    /// Check whether `item` is one of the enumeration items.
    pub fn has_item(&self, item: &str) -> bool {
        self.items.iter().any(|i| i.eq_ignore_ascii_case(item))
    }
}

/// Aggregation type with cardinality bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateType {
    /// Canonical spelling, e.g. `ARRAY [1:3] OF REAL`.
    pub name: String,
    pub kind: AggregateKind,
    pub element_type: String,
    pub lower: u64,
    /// `None` means unbounded (`?`).
    pub upper: Option<u64>,
    pub unique: bool,
    /// Elements may be undefined (`ARRAY OF OPTIONAL`).
    pub optional_elements: bool,
}

impl AggregateType {
    pub fn new(
        kind: AggregateKind,
        element_type: impl Into<String>,
        lower: u64,
        upper: Option<u64>,
    ) -> Self {
        let mut agg = Self {
            name: String::new(),
            kind,
            element_type: crate::canonical_type(&element_type.into()),
            lower,
            upper,
            unique: kind == AggregateKind::Set,
            optional_elements: false,
        };
        agg.name = agg.spelling();
        agg
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self.name = self.spelling();
        self
    }

    pub fn optional_elements(mut self) -> Self {
        self.optional_elements = true;
        self.name = self.spelling();
        self
    }

    /// Whether `len` lies within the bounds.
    pub fn admits_len(&self, len: usize) -> bool {
        let len = len as u64;
        len >= self.lower && self.upper.map(|u| len <= u).unwrap_or(true)
    }

    /// Human-readable bound range, e.g. `[1:?]`.
    pub fn bounds(&self) -> String {
        match self.upper {
            Some(u) => format!("[{}:{}]", self.lower, u),
            None => format!("[{}:?]", self.lower),
        }
    }

    fn spelling(&self) -> String {
        let mut s = format!("{} {} OF ", self.kind.name(), self.bounds());
        if self.optional_elements {
            s.push_str("OPTIONAL ");
        }
        if self.unique && self.kind != AggregateKind::Set {
            s.push_str("UNIQUE ");
        }
        s.push_str(&self.element_type);
        s
    }
}

/// A named union of alternative types.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectType {
    pub name: String,
    /// Alternatives in declaration order.
    pub alternatives: Vec<String>,
}

/// How an attribute obtains its value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrKind {
    /// Stored in an instance slot.
    Explicit,
    /// Computed from an expression over SELF.
    Derived(Expr),
    /// Computed from the reverse index: instances of `entity` whose `attribute` refers to SELF.
    Inverse { entity: String, attribute: String },
    /// Refines the type of an inherited explicit attribute.
    Redeclared,
}

/// Attribute definition within an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrDef {
    /// Attribute name (canonical lowercase).
    pub name: String,
    /// Declared type name.
    pub type_name: String,
    pub kind: AttrKind,
    /// Whether this attribute may be left undefined.
    pub optional: bool,
}

impl AttrDef {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: crate::canonical_attr(&name.into()),
            type_name: type_name.into(),
            kind: AttrKind::Explicit,
            optional: false,
        }
    }

    pub fn derived(name: impl Into<String>, type_name: impl Into<String>, expr: Expr) -> Self {
        Self {
            kind: AttrKind::Derived(expr),
            ..Self::new(name, type_name)
        }
    }

    pub fn inverse(
        name: impl Into<String>,
        type_name: impl Into<String>,
        entity: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            kind: AttrKind::Inverse {
                entity: crate::canonical_type(&entity.into()),
                attribute: crate::canonical_attr(&attribute.into()),
            },
            ..Self::new(name, type_name)
        }
    }

    pub fn redeclared(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            kind: AttrKind::Redeclared,
            ..Self::new(name, type_name)
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Whether the attribute occupies an instance slot.
    pub fn is_stored(&self) -> bool {
        matches!(self.kind, AttrKind::Explicit | AttrKind::Redeclared)
    }
}

/// A named boolean constraint (`WHERE wr1: ...`).
#[derive(Debug, Clone, PartialEq)]
pub struct WhereRule {
    pub name: String,
    pub expr: Expr,
}

impl WhereRule {
    pub fn new(name: impl Into<String>, expr: Expr) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }
}

/// Joint uniqueness of attribute values across an entity's extent (`UNIQUE ur1: a, b;`).
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueRule {
    pub name: String,
    pub attributes: Vec<String>,
}

/// Entity definition.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDef {
    /// Entity name (canonical uppercase).
    pub name: String,
    /// Direct supertypes in declaration order.
    pub supertypes: Vec<String>,
    /// Own attributes in declaration order.
    pub attributes: Vec<AttrDef>,
    pub where_rules: Vec<WhereRule>,
    pub unique_rules: Vec<UniqueRule>,
    /// Whether this entity cannot be instantiated directly.
    pub is_abstract: bool,
}

impl EntityDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
            attributes: Vec::new(),
            where_rules: Vec::new(),
            unique_rules: Vec::new(),
            is_abstract: false,
        }
    }

    /// Get an own attribute definition by name.
    pub fn get_attr(&self, name: &str) -> Option<&AttrDef> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// A schema-level rule over the extents of one or more entities.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalRule {
    pub name: String,
    /// Entities whose extents are bound as variables named after them.
    pub entities: Vec<String>,
    pub where_rules: Vec<WhereRule>,
}

/// A registered type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Simple(SimpleKind),
    Defined(DefinedType),
    Enumeration(EnumerationType),
    Aggregate(AggregateType),
    Select(SelectType),
    Entity(EntityDef),
}

impl TypeDescriptor {
    /// The descriptor's identity within the schema.
    pub fn name(&self) -> &str {
        match self {
            TypeDescriptor::Simple(kind) => kind.name(),
            TypeDescriptor::Defined(d) => &d.name,
            TypeDescriptor::Enumeration(e) => &e.name,
            TypeDescriptor::Aggregate(a) => &a.name,
            TypeDescriptor::Select(s) => &s.name,
            TypeDescriptor::Entity(e) => &e.name,
        }
    }

    /// Whether the name is schema-qualified in TYPEOF results.
    pub fn is_named(&self) -> bool {
        !matches!(
            self,
            TypeDescriptor::Simple(_) | TypeDescriptor::Aggregate(_)
        )
    }

    pub fn as_entity(&self) -> Option<&EntityDef> {
        match self {
            TypeDescriptor::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_select(&self) -> Option<&SelectType> {
        match self {
            TypeDescriptor::Select(s) => Some(s),
            _ => None,
        }
    }

    /// Type names this descriptor refers to.
    pub(crate) fn references(&self) -> Vec<&str> {
        match self {
            TypeDescriptor::Simple(_) | TypeDescriptor::Enumeration(_) => Vec::new(),
            TypeDescriptor::Defined(d) => vec![d.base.as_str()],
            TypeDescriptor::Aggregate(a) => vec![a.element_type.as_str()],
            TypeDescriptor::Select(s) => s.alternatives.iter().map(|a| a.as_str()).collect(),
            TypeDescriptor::Entity(e) => {
                let mut refs: Vec<&str> = e.supertypes.iter().map(|s| s.as_str()).collect();
                for attr in &e.attributes {
                    refs.push(attr.type_name.as_str());
                    if let AttrKind::Inverse { entity, .. } = &attr.kind {
                        refs.push(entity.as_str());
                    }
                }
                refs
            }
        }
    }
}
