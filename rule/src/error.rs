//! Rule evaluation error types.

use express_core::{ErrorKind, InstanceId};
use thiserror::Error;

/// Result type for rule operations.
pub type RuleResult<T> = Result<T, RuleError>;

/// Errors that can occur while evaluating a rule expression.
///
/// These are evaluation failures, not rule violations: a rule that evaluates
/// to FALSE is reported as a `RuleViolation`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuleError {
    #[error("Unbound variable '{name}'")]
    UnboundVariable { name: String },

    #[error("Unknown attribute '{attr}' on entity '{entity}'")]
    UnknownAttribute { entity: String, attr: String },

    #[error("Instance not found: {0}")]
    InstanceNotFound(InstanceId),

    #[error("type error: {message}")]
    TypeError { message: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid LIKE pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Maximum derivation depth ({depth}) exceeded")]
    MaxDepthExceeded { depth: usize },
}

impl RuleError {
    pub fn unbound_variable(name: impl Into<String>) -> Self {
        Self::UnboundVariable { name: name.into() }
    }

    pub fn unknown_attribute(entity: impl Into<String>, attr: impl Into<String>) -> Self {
        Self::UnknownAttribute {
            entity: entity.into(),
            attr: attr.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError {
            message: message.into(),
        }
    }

    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    pub fn max_depth_exceeded(depth: usize) -> Self {
        Self::MaxDepthExceeded { depth }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RuleError::UnknownAttribute { .. } => ErrorKind::UnknownAttribute,
            RuleError::InstanceNotFound(_) => ErrorKind::InstanceNotFound,
            RuleError::MaxDepthExceeded { .. } => ErrorKind::CycleDetected,
            _ => ErrorKind::Evaluation,
        }
    }
}
