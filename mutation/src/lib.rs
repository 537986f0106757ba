//! Express Mutation
//!
//! Validated write operations on an instance pool.
//!
//! Responsibilities:
//! - Check mandatory attributes and coerce every written value
//! - Register an instance only once all of its slots pass
//! - Keep derived and inverse attributes read-only
//! - Refuse to destroy instances that are still referenced
//!
//! # Module Structure
//!
//! - `executor` - Main MutationExecutor that coordinates operations
//! - `ops/` - Individual operation implementations (construct, set, destroy)
//! - `validation` - Shared slot validation helpers
//! - `error` - Error types for mutation failures

mod error;
mod executor;
mod ops;
mod validation;

pub use error::{MutationError, MutationResult};
pub use executor::MutationExecutor;
