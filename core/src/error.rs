//! Error classification shared by every crate.
//!
//! Each crate keeps its own error enum; `ErrorKind` is the flat,
//! crate-independent category callers match on.

use std::fmt;
use thiserror::Error;

use crate::InstanceId;

/// Category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A non-optional attribute was absent or undefined.
    MissingMandatoryAttribute,
    /// A value does not belong to the declared type.
    TypeMismatch,
    /// A raw value could not be wrapped into the declared representation.
    CoercionError,
    /// Aggregate size outside its declared bounds.
    BoundViolation,
    /// Duplicate elements in a unique aggregate.
    UniquenessViolation,
    /// Value is not one of a select type's alternatives.
    SelectMismatch,
    /// Reference to a type the registry does not know.
    UnknownType,
    /// A type name was registered twice.
    DuplicateType,
    /// A declared rule evaluated to FALSE.
    RuleViolation,
    /// The recursion depth guard was exceeded.
    CycleDetected,
    /// Attribute name not present on the entity.
    UnknownAttribute,
    /// Write to a derived or inverse attribute.
    ReadonlyAttribute,
    /// Positional construction with the wrong number of values.
    ArityMismatch,
    /// Construction of an abstract entity.
    AbstractEntity,
    /// Two supertype chains contribute the same attribute name.
    AttributeCollision,
    /// An entity is (transitively) its own supertype.
    InheritanceCycle,
    /// Referenced instance is not in the pool.
    InstanceNotFound,
    /// Instance cannot be destroyed while other instances reference it.
    InstanceReferenced,
    /// A rule expression could not be evaluated.
    Evaluation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Errors raised by the instance pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Instance not found.
    #[error("Instance not found: {0}")]
    InstanceNotFound(InstanceId),

    /// Entity is not known to the registry.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// Attribute is not a stored slot of the instance.
    #[error("Attribute not found: {attr} on entity {entity}")]
    AttributeNotFound { entity: String, attr: String },

    /// Cannot destroy an instance that is still referenced.
    #[error("Cannot destroy {id}: referenced by {referencers:?}")]
    InstanceReferenced {
        id: InstanceId,
        referencers: Vec<InstanceId>,
    },
}

impl PoolError {
    pub fn attribute_not_found(entity: impl Into<String>, attr: impl Into<String>) -> Self {
        Self::AttributeNotFound {
            entity: entity.into(),
            attr: attr.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PoolError::InstanceNotFound(_) => ErrorKind::InstanceNotFound,
            PoolError::UnknownEntity(_) => ErrorKind::UnknownType,
            PoolError::AttributeNotFound { .. } => ErrorKind::UnknownAttribute,
            PoolError::InstanceReferenced { .. } => ErrorKind::InstanceReferenced,
        }
    }
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;
