//! # Bookstore Queries
//!
//! CRUD, filter, aggregation and index examples run in a fixed order against a
//! `books` collection, with every result printed.
//!
//! ## Crates
//!
//! - [`nosql`]: backend traits, the MongoDB backend (feature `mongodb`) and an
//!   in-memory backend with the same query language
//! - [`conf`]: layered settings (defaults, `bookstore.toml`, `BOOKSTORE_*`,
//!   overrides)
//! - [`runner`]: the standard plan, the runner, seeding and the console report
//!
//! ## Feature Flags
//!
//! - `mongodb` (default) - MongoDB driver backend
//!
//! ## Quick Example
//!
//! ```rust
//! use bookstore::prelude::*;
//! use bookstore::nosql::backends::memory::InMemoryBackend;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = InMemoryBackend::new("plp_bookstore");
//! seed_collection(&backend, "books", false).await?;
//!
//! let runner = Runner::new(Arc::new(backend), "books");
//! let mut records: Vec<StepRecord> = Vec::new();
//! runner.run(&standard_plan(), &mut records).await?;
//! assert_eq!(records.len(), 22);
//! # Ok(())
//! # }
//! ```

pub use bookstore_conf as conf;
pub use bookstore_nosql as nosql;
pub use bookstore_runner as runner;

pub mod prelude {
	pub use bookstore_conf::{BackendKind, Settings, SettingsBuilder};
	pub use bookstore_nosql::{
		Document, DocumentBackend, FindOptions, IndexModel, NoSQLBackend, NoSQLError,
	};
	pub use bookstore_runner::seed::seed_collection;
	pub use bookstore_runner::{
		Book, ConsolePrinter, Operation, RunError, Runner, Section, Step, StepOutput, StepRecord,
		StepSink, run_session, standard_plan,
	};
}
