//! Value types for instance attributes.
//!
//! Values are the data stored in instance slots. The runtime supports the
//! EXPRESS simple types (INTEGER, REAL, STRING, BOOLEAN, LOGICAL, BINARY),
//! enumerations, defined-type wrappers, aggregates (ARRAY/LIST/SET/BAG),
//! select wrappers and entity references.

use crate::InstanceId;
use indexmap::IndexMap;
use std::fmt;

/// Three-valued EXPRESS LOGICAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Logical {
    False,
    Unknown,
    True,
}

impl Logical {
    pub fn and(self, other: Logical) -> Logical {
        self.min(other)
    }

    pub fn or(self, other: Logical) -> Logical {
        self.max(other)
    }

    pub fn not(self) -> Logical {
        match self {
            Logical::False => Logical::True,
            Logical::Unknown => Logical::Unknown,
            Logical::True => Logical::False,
        }
    }

    pub fn xor(self, other: Logical) -> Logical {
        match (self, other) {
            (Logical::Unknown, _) | (_, Logical::Unknown) => Logical::Unknown,
            (a, b) => Logical::from(a != b),
        }
    }

    /// Returns true only for TRUE.
    pub fn is_true(self) -> bool {
        self == Logical::True
    }

    /// Returns true only for FALSE.
    pub fn is_false(self) -> bool {
        self == Logical::False
    }
}

impl From<bool> for Logical {
    fn from(b: bool) -> Self {
        if b {
            Logical::True
        } else {
            Logical::False
        }
    }
}

impl fmt::Display for Logical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logical::False => write!(f, ".F."),
            Logical::Unknown => write!(f, ".U."),
            Logical::True => write!(f, ".T."),
        }
    }
}

/// The four aggregation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    Array,
    List,
    Set,
    Bag,
}

impl AggregateKind {
    /// Keyword spelling of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            AggregateKind::Array => "ARRAY",
            AggregateKind::List => "LIST",
            AggregateKind::Set => "SET",
            AggregateKind::Bag => "BAG",
        }
    }

    /// Whether element order is significant.
    pub fn is_ordered(&self) -> bool {
        matches!(self, AggregateKind::Array | AggregateKind::List)
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An aggregate value: its kind, the element type it was built for and its items.
///
/// `element_type` is `None` for raw sequences that have not yet been coerced
/// into a declared aggregate type.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateValue {
    pub kind: AggregateKind,
    pub element_type: Option<String>,
    pub items: Vec<Value>,
}

impl AggregateValue {
    pub fn new(kind: AggregateKind, items: Vec<Value>) -> Self {
        Self {
            kind,
            element_type: None,
            items,
        }
    }

    pub fn with_element_type(mut self, element_type: impl Into<String>) -> Self {
        self.element_type = Some(element_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 1-based element access, as used by EXPRESS index expressions.
    pub fn get(&self, index: i64) -> Option<&Value> {
        if index < 1 {
            return None;
        }
        self.items.get((index - 1) as usize)
    }

    /// Index of the first pair of equal elements, if any.
    pub fn first_duplicate(&self) -> Option<(usize, usize)> {
        for (i, a) in self.items.iter().enumerate() {
            for (j, b) in self.items.iter().enumerate().skip(i + 1) {
                if a == b {
                    return Some((i, j));
                }
            }
        }
        None
    }
}

/// A value that can be stored in an attribute slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicitly absent (EXPRESS indeterminate `?`).
    Undefined,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit floating point.
    Real(f64),
    /// UTF-8 string.
    String(String),
    /// Boolean value.
    Boolean(bool),
    /// Three-valued logical.
    Logical(Logical),
    /// Raw octets of a BINARY value.
    Binary(Vec<u8>),
    /// Enumeration item; `type_name` is filled in by coercion.
    Enumeration {
        type_name: Option<String>,
        item: String,
    },
    /// A value wrapped in a defined type (`TYPE label = STRING`).
    Defined { type_name: String, value: Box<Value> },
    /// ARRAY / LIST / SET / BAG.
    Aggregate(AggregateValue),
    /// A select value together with the alternative it resolved to.
    Select { type_name: String, value: Box<Value> },
    /// Reference to an entity instance.
    EntityRef(InstanceId),
}

impl Value {
    /// Build an untyped LIST from items.
    pub fn list(items: Vec<Value>) -> Self {
        Value::Aggregate(AggregateValue::new(AggregateKind::List, items))
    }

    /// Build an untyped ARRAY from items.
    pub fn array(items: Vec<Value>) -> Self {
        Value::Aggregate(AggregateValue::new(AggregateKind::Array, items))
    }

    /// Build an untyped SET from items.
    pub fn set(items: Vec<Value>) -> Self {
        Value::Aggregate(AggregateValue::new(AggregateKind::Set, items))
    }

    /// Build an untyped BAG from items.
    pub fn bag(items: Vec<Value>) -> Self {
        Value::Aggregate(AggregateValue::new(AggregateKind::Bag, items))
    }

    /// Build an untyped enumeration literal.
    pub fn enumeration(item: impl Into<String>) -> Self {
        Value::Enumeration {
            type_name: None,
            item: item.into(),
        }
    }

    /// Wrap a value in a defined type.
    pub fn defined(type_name: impl Into<String>, value: Value) -> Self {
        Value::Defined {
            type_name: type_name.into(),
            value: Box::new(value),
        }
    }

    /// Wrap a value in a select type.
    pub fn select(type_name: impl Into<String>, value: Value) -> Self {
        Value::Select {
            type_name: type_name.into(),
            value: Box::new(value),
        }
    }

    /// Returns true if this is the undefined value.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Strip defined-type and select wrappers.
    pub fn underlying(&self) -> &Value {
        match self {
            Value::Defined { value, .. } | Value::Select { value, .. } => value.underlying(),
            other => other,
        }
    }

    /// Get as integer if the underlying value is an Integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self.underlying() {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as a number, widening integers.
    pub fn as_number(&self) -> Option<f64> {
        match self.underlying() {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Get as string reference if the underlying value is a String.
    pub fn as_str(&self) -> Option<&str> {
        match self.underlying() {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as logical; BOOLEAN values map onto TRUE/FALSE.
    pub fn as_logical(&self) -> Option<Logical> {
        match self.underlying() {
            Value::Boolean(b) => Some(Logical::from(*b)),
            Value::Logical(l) => Some(*l),
            _ => None,
        }
    }

    /// Get the referenced instance, looking through wrappers.
    pub fn as_entity_ref(&self) -> Option<InstanceId> {
        match self.underlying() {
            Value::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as aggregate, looking through wrappers.
    pub fn as_aggregate(&self) -> Option<&AggregateValue> {
        match self.underlying() {
            Value::Aggregate(agg) => Some(agg),
            _ => None,
        }
    }

    /// Collect every entity reference reachable through aggregates and wrappers.
    pub fn entity_refs(&self) -> Vec<InstanceId> {
        let mut refs = Vec::new();
        self.collect_refs(&mut refs);
        refs
    }

    fn collect_refs(&self, refs: &mut Vec<InstanceId>) {
        match self {
            Value::EntityRef(id) => refs.push(*id),
            Value::Aggregate(agg) => {
                for item in &agg.items {
                    item.collect_refs(refs);
                }
            }
            Value::Defined { value, .. } | Value::Select { value, .. } => value.collect_refs(refs),
            _ => {}
        }
    }

    /// Returns the category name of this value.
    pub fn category(&self) -> &'static str {
        match self {
            Value::Undefined => "Undefined",
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::String(_) => "STRING",
            Value::Boolean(_) => "BOOLEAN",
            Value::Logical(_) => "LOGICAL",
            Value::Binary(_) => "BINARY",
            Value::Enumeration { .. } => "ENUMERATION",
            Value::Defined { .. } => "DEFINED",
            Value::Aggregate(agg) => agg.kind.name(),
            Value::Select { .. } => "SELECT",
            Value::EntityRef(_) => "ENTITY",
        }
    }

    /// Compare values for ordering. Returns None for incomparable values.
    pub fn partial_cmp_value(&self, other: &Value) -> Option<std::cmp::Ordering> {
        match (self.underlying(), other.underlying()) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Binary(a), Value::Binary(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Logical(a), Value::Logical(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "?"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{:?}", r),
            Value::String(s) => write!(f, "'{}'", s),
            Value::Boolean(b) => write!(f, "{}", Logical::from(*b)),
            Value::Logical(l) => write!(f, "{}", l),
            Value::Binary(bytes) => {
                write!(f, "\"")?;
                for b in bytes {
                    write!(f, "{:02X}", b)?;
                }
                write!(f, "\"")
            }
            Value::Enumeration { item, .. } => write!(f, ".{}.", item),
            Value::Defined { type_name, value } | Value::Select { type_name, value } => {
                write!(f, "{}({})", type_name, value)
            }
            Value::Aggregate(agg) => {
                write!(f, "(")?;
                for (i, item) in agg.items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::EntityRef(id) => write!(f, "{}", id),
        }
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Logical> for Value {
    fn from(l: Logical) -> Self {
        Value::Logical(l)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<InstanceId> for Value {
    fn from(id: InstanceId) -> Self {
        Value::EntityRef(id)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::list(items)
    }
}

/// Ordered attribute storage (declaration order is significant).
pub type Attributes = IndexMap<String, Value>;

/// Helper macro to create attribute maps.
#[macro_export]
macro_rules! attrs {
    () => {
        $crate::Attributes::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        {
            let mut map = $crate::Attributes::new();
            $(
                map.insert($key.to_string(), $crate::Value::from($value));
            )+
            map
        }
    };
}
