//! MongoDB backend built on the official driver

mod connection;
mod explain;

pub use connection::{MongoDBBackend, MongoDBBackendBuilder};
pub use explain::parse_execution_stats;
