//! Express Registry
//!
//! The type descriptor registry: every simple, defined, enumeration,
//! aggregate, select and entity type of a schema, plus the rules attached to
//! them. Built once through [`RegistryBuilder`] and immutable afterwards.
//!
//! At build time the registry also precomputes, per entity, the flattened
//! attribute [`EntityLayout`], and per named type its transitive type closure
//! (the set TYPEOF reports).

mod builder;
mod closure;
mod error;
mod expr;
mod layout;
mod registry;
mod types;

pub use builder::*;
pub use closure::*;
pub use error::*;
pub use expr::*;
pub use layout::*;
pub use registry::*;
pub use types::*;

/// Canonical spelling of a type name: uppercase, schema qualifier stripped.
///
/// Aggregate spellings (`LIST [1:?] OF POINT`) contain whitespace and are
/// only upper-cased.
pub fn canonical_type(name: &str) -> String {
    let name = name.trim();
    let unqualified = if name.contains(char::is_whitespace) {
        name
    } else {
        name.rsplit('.').next().unwrap_or(name)
    };
    unqualified.to_ascii_uppercase()
}

/// Canonical spelling of an attribute name: lowercase.
pub fn canonical_attr(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_type_strips_schema_prefix() {
        assert_eq!(canonical_type("index_attribute.shape_aspect"), "SHAPE_ASPECT");
        assert_eq!(canonical_type("Point"), "POINT");
        assert_eq!(canonical_type("LIST [1:?] OF point"), "LIST [1:?] OF POINT");
    }

    #[test]
    fn test_canonical_attr_lowercases() {
        assert_eq!(canonical_attr(" Of_Shape "), "of_shape");
    }
}
