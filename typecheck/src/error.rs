//! Type checking errors.

use express_core::ErrorKind;
use thiserror::Error;

/// Why a value does not conform to a declared type.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Bound violation: {type_name} does not admit {len} elements")]
    BoundViolation { type_name: String, len: usize },

    #[error("Uniqueness violation: elements {first} and {second} of {type_name} are equal")]
    UniquenessViolation {
        type_name: String,
        first: usize,
        second: usize,
    },

    #[error("Select mismatch: {found} is not an alternative of {select}")]
    SelectMismatch { select: String, found: String },

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Cannot coerce {found} into {type_name}")]
    CoercionError { type_name: String, found: String },

    #[error("Nesting exceeds depth {0}")]
    CycleDetected(usize),
}

impl TypeError {
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn coercion(type_name: impl Into<String>, found: impl Into<String>) -> Self {
        Self::CoercionError {
            type_name: type_name.into(),
            found: found.into(),
        }
    }

    pub fn select_mismatch(select: impl Into<String>, found: impl Into<String>) -> Self {
        Self::SelectMismatch {
            select: select.into(),
            found: found.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TypeError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            TypeError::BoundViolation { .. } => ErrorKind::BoundViolation,
            TypeError::UniquenessViolation { .. } => ErrorKind::UniquenessViolation,
            TypeError::SelectMismatch { .. } => ErrorKind::SelectMismatch,
            TypeError::UnknownType(_) => ErrorKind::UnknownType,
            TypeError::CoercionError { .. } => ErrorKind::CoercionError,
            TypeError::CycleDetected(_) => ErrorKind::CycleDetected,
        }
    }
}

/// Result type for checking and coercion.
pub type CheckResult<T> = Result<T, TypeError>;
