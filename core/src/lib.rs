//! Express Core Types
//!
//! This crate provides the foundational types used throughout the runtime:
//! - Identity types (InstanceId)
//! - Value types (the Value enum with scalars, aggregates, selects and references)
//! - Instance structure (flattened attribute record)
//! - The shared error classification (ErrorKind)

mod entity;
mod error;
mod id;
mod value;

pub use entity::*;
pub use error::*;
pub use id::*;
pub use value::*;
