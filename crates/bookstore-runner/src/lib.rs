//! # Bookstore Runner
//!
//! Runs a fixed plan of CRUD, query, aggregation and index operations against
//! a `books` collection and reports each result.
//!
//! ## Overview
//!
//! - [`steps`]: the plan as data ([`Step`], [`Operation`], [`standard_plan`])
//! - [`runner`]: executes steps and hands [`StepRecord`]s to a [`StepSink`]
//! - [`report`]: the console sink
//! - [`seed`] and [`fixtures`]: the ten sample books
//! - [`backend`]: opens the backend selected by the settings
//!
//! ## Example
//!
//! ```rust
//! use bookstore_runner::{run_session, standard_plan, StepRecord};
//! use bookstore_nosql::backends::memory::InMemoryBackend;
//! use bookstore_nosql::DocumentBackend;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = InMemoryBackend::new("plp_bookstore");
//! bookstore_runner::seed::seed_collection(&backend, "books", false).await?;
//!
//! let mut records: Vec<StepRecord> = Vec::new();
//! let connect = async { Ok(Arc::new(backend) as Arc<dyn DocumentBackend>) };
//! let completed = run_session(connect, "books", &standard_plan(), &mut records).await?;
//! assert_eq!(completed, 22);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod book;
pub mod fixtures;
pub mod report;
pub mod runner;
pub mod seed;
pub mod steps;

pub use book::Book;
pub use report::ConsolePrinter;
pub use runner::{RunError, Runner, StepOutput, StepRecord, StepSink, run_session};
pub use steps::{FindView, Operation, Section, Step, standard_plan};
