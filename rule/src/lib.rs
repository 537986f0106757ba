//! Express Rule
//!
//! Evaluate rule expressions and validate instances against their rules.
//!
//! Responsibilities:
//! - Evaluate expressions with three-valued logic
//! - Provide the built-in function library (SIZEOF, USEDIN, TYPEOF, ...)
//! - Resolve explicit, derived and inverse attributes
//! - Run where, unique and global rules and report violations

mod binding;
pub mod builtins;
mod error;
mod eval;
mod like;
mod query;
mod validator;
mod violation;

pub use binding::Bindings;
pub use error::{RuleError, RuleResult};
pub use eval::Evaluator;
pub use query::Query;
pub use validator::Validator;
pub use violation::{RuleKind, RuleViolation, ViolationCause};

/// Maximum nesting of derived attribute evaluation.
pub const MAX_DEPTH: usize = 100;
