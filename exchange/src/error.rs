//! Exchange error types.

use express_core::{ErrorKind, InstanceId, PoolError};
use express_mutation::MutationError;
use express_rule::RuleError;
use express_typecheck::TypeError;
use thiserror::Error;

/// Exchange errors.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Construction, write or destruction failed.
    #[error("mutation error: {0}")]
    Mutation(#[from] MutationError),

    /// Value does not conform to a type.
    #[error("type error: {0}")]
    Type(#[from] TypeError),

    /// Expression could not be evaluated.
    #[error("rule error: {0}")]
    Rule(#[from] RuleError),

    /// Pool lookup failed.
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),
}

impl ExchangeError {
    pub fn instance_not_found(id: InstanceId) -> Self {
        Self::Pool(PoolError::InstanceNotFound(id))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExchangeError::Mutation(e) => e.kind(),
            ExchangeError::Type(e) => e.kind(),
            ExchangeError::Rule(e) => e.kind(),
            ExchangeError::Pool(e) => e.kind(),
        }
    }
}

/// Result type for exchange operations.
pub type ExchangeResult<T> = Result<T, ExchangeError>;
