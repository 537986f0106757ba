//! Mutation error types.

use express_core::{ErrorKind, PoolError};
use express_typecheck::TypeError;
use thiserror::Error;

/// Result type for mutation operations.
pub type MutationResult<T> = Result<T, MutationError>;

/// Errors that can occur during mutation execution.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("Unknown entity: {name}")]
    UnknownType { name: String },

    #[error("Cannot instantiate abstract entity: {name}")]
    AbstractEntity { name: String },

    #[error("Invalid arity: expected {expected}, got {actual} values for entity {entity}")]
    ArityMismatch {
        entity: String,
        expected: usize,
        actual: usize,
    },

    #[error("Missing mandatory attribute: {attr} on entity {entity}")]
    MissingMandatoryAttribute { entity: String, attr: String },

    #[error("Invalid value for {entity}.{attr}: {error}")]
    InvalidAttribute {
        entity: String,
        attr: String,
        #[source]
        error: TypeError,
    },

    #[error("Unknown attribute: {attr} on entity {entity}")]
    UnknownAttribute { entity: String, attr: String },

    #[error("Cannot modify readonly attribute: {attr} on entity {entity}")]
    ReadonlyAttribute { entity: String, attr: String },

    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl MutationError {
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType { name: name.into() }
    }

    pub fn abstract_entity(name: impl Into<String>) -> Self {
        Self::AbstractEntity { name: name.into() }
    }

    pub fn arity_mismatch(entity: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ArityMismatch {
            entity: entity.into(),
            expected,
            actual,
        }
    }

    pub fn missing_mandatory(entity: impl Into<String>, attr: impl Into<String>) -> Self {
        Self::MissingMandatoryAttribute {
            entity: entity.into(),
            attr: attr.into(),
        }
    }

    pub fn invalid_attribute(
        entity: impl Into<String>,
        attr: impl Into<String>,
        error: TypeError,
    ) -> Self {
        Self::InvalidAttribute {
            entity: entity.into(),
            attr: attr.into(),
            error,
        }
    }

    pub fn unknown_attribute(entity: impl Into<String>, attr: impl Into<String>) -> Self {
        Self::UnknownAttribute {
            entity: entity.into(),
            attr: attr.into(),
        }
    }

    pub fn readonly_attribute(entity: impl Into<String>, attr: impl Into<String>) -> Self {
        Self::ReadonlyAttribute {
            entity: entity.into(),
            attr: attr.into(),
        }
    }

    /// Category of the failure. Invalid values report the checker's category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MutationError::UnknownType { .. } => ErrorKind::UnknownType,
            MutationError::AbstractEntity { .. } => ErrorKind::AbstractEntity,
            MutationError::ArityMismatch { .. } => ErrorKind::ArityMismatch,
            MutationError::MissingMandatoryAttribute { .. } => {
                ErrorKind::MissingMandatoryAttribute
            }
            MutationError::InvalidAttribute { error, .. } => error.kind(),
            MutationError::UnknownAttribute { .. } => ErrorKind::UnknownAttribute,
            MutationError::ReadonlyAttribute { .. } => ErrorKind::ReadonlyAttribute,
            MutationError::Pool(e) => e.kind(),
        }
    }
}
