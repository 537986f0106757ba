//! Express Type Checker
//!
//! Structural and nominal compatibility of values with declared types, the
//! coercion applied on every attribute write, and the type-name sets TYPEOF
//! reports.

mod checker;
mod coerce;
mod error;
mod options;

pub use checker::*;
pub use error::*;
pub use options::*;

/// Default recursion guard for nested aggregates and entity descent.
pub const MAX_DEPTH: usize = 64;
