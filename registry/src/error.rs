//! Registry construction errors.

use express_core::ErrorKind;
use thiserror::Error;

/// Errors that can occur during registry construction.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Duplicate type name: {0}")]
    DuplicateType(String),

    #[error("Unknown type {name} referenced by {context}")]
    UnknownType { name: String, context: String },

    #[error("Attribute {attr} of {entity} is contributed by both {first} and {second}")]
    AttributeCollision {
        entity: String,
        attr: String,
        first: String,
        second: String,
    },

    #[error("Inheritance cycle detected involving entity: {0}")]
    InheritanceCycle(String),

    #[error("{entity} redeclares {attr}, which no supertype declares")]
    UnknownRedeclaration { entity: String, attr: String },

    #[error("{0} is not an entity")]
    NotAnEntity(String),

    #[error("Invalid bounds {lower}..{upper} for {name}")]
    InvalidBounds { name: String, lower: u64, upper: u64 },
}

impl RegistryError {
    pub fn unknown_type(name: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnknownType {
            name: name.into(),
            context: context.into(),
        }
    }

    pub fn attribute_collision(
        entity: impl Into<String>,
        attr: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self::AttributeCollision {
            entity: entity.into(),
            attr: attr.into(),
            first: first.into(),
            second: second.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::DuplicateType(_) => ErrorKind::DuplicateType,
            RegistryError::UnknownType { .. } | RegistryError::NotAnEntity(_) => {
                ErrorKind::UnknownType
            }
            RegistryError::AttributeCollision { .. } => ErrorKind::AttributeCollision,
            RegistryError::InheritanceCycle(_) => ErrorKind::InheritanceCycle,
            RegistryError::UnknownRedeclaration { .. } => ErrorKind::UnknownAttribute,
            RegistryError::InvalidBounds { .. } => ErrorKind::BoundViolation,
        }
    }
}

/// Result type for registry construction.
pub type RegistryResult<T> = Result<T, RegistryError>;
