//! Mutation operation implementations.
//!
//! Each operation (CONSTRUCT, SET, DESTROY) is implemented
//! in its own module.

mod construct;
mod destroy;
mod set;

pub use construct::{execute_construct, execute_construct_named};
pub use destroy::execute_destroy;
pub use set::execute_set;
