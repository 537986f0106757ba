//! Express Instance Pool
//!
//! This crate provides the live instance storage of one exchange structure:
//! - Instance storage keyed by pool-unique identity
//! - Entity index: find instances by entity (extents include subtypes)
//! - Reverse-reference index: find the instances referencing a target
//!   through a given attribute role (the basis of USEDIN and inverses)

mod index;
mod pool;

pub use index::*;
pub use pool::*;
