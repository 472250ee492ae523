//! NoSQL backend implementations
//!
//! - MongoDB via the official driver (feature `mongodb`)
//! - An in-memory document store with MongoDB query semantics

pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongodb;
