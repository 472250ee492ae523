//! # Bookstore NoSQL
//!
//! Document-store abstraction used by the bookstore query runner.
//!
//! ## Features
//!
//! - **Backend traits**: `NoSQLBackend` for lifecycle, `DocumentBackend` for
//!   queries, updates, aggregation, index management and `explain`
//! - **MongoDB backend**: official async driver (feature `mongodb`, on by default)
//! - **In-memory backend**: the same query language evaluated in process
//! - **Unified errors**: every failure surfaces as [`NoSQLError`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "mongodb")]
//! # async fn example() -> bookstore_nosql::Result<()> {
//! use bookstore_nosql::backends::mongodb::MongoDBBackend;
//! use bookstore_nosql::traits::{DocumentBackend, NoSQLBackend};
//! use bson::doc;
//!
//! let db = MongoDBBackend::connect("mongodb://localhost:27017", "plp_bookstore").await?;
//! let count = db.count_documents("books", doc! { "genre": "Fiction" }).await?;
//! println!("{count} fiction titles");
//! db.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{NoSQLError, Result};
pub use traits::{DocumentBackend, NoSQLBackend};
pub use types::{Document, ExplainStats, FindOptions, IndexModel, NoSQLBackendType, UpdateResult};
