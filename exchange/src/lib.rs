//! Express Exchange
//!
//! An owned data-exchange structure: one schema, one instance pool.
//!
//! Responsibilities:
//! - Guard the pool so reverse-index updates are never observed half done
//! - Route construction and attribute writes through the type checker
//! - Answer validation and builtin queries over a consistent snapshot

mod error;
mod exchange;

pub use error::{ExchangeError, ExchangeResult};
pub use exchange::Exchange;
