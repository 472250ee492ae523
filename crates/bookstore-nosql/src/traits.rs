//! NoSQL backend traits
//!
//! - `NoSQLBackend`: lifecycle shared by every backend (type, health check, close)
//! - `DocumentBackend`: the document-store capability set (find, update, delete,
//!   aggregate, index management, plan explanation)

mod base;
mod document;

pub use base::NoSQLBackend;
pub use document::DocumentBackend;
