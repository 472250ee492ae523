//! Executes a plan against a document backend
//!
//! The runner owns nothing but a backend handle and a collection name. Each
//! step yields a [`StepRecord`] that is handed to a [`StepSink`] immediately,
//! so everything produced before a failure has already been reported when the
//! error surfaces.

use bookstore_nosql::{
	Document, DocumentBackend, ExplainStats, IndexModel, NoSQLBackendType, NoSQLError,
};
use bson::Bson;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::steps::{FindView, Operation, Section, Step};

/// Run failure
///
/// Both variants abort the run. [`RunError::Connectivity`] means the store
/// could not be reached or went away; [`RunError::Operation`] means it
/// rejected a request.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
	#[error("{0}")]
	Connectivity(#[source] NoSQLError),

	#[error("{step}: {source}")]
	Operation {
		step: String,
		#[source]
		source: NoSQLError,
	},
}

impl RunError {
	fn from_step(step: &Step, source: NoSQLError) -> Self {
		if source.is_connectivity() {
			RunError::Connectivity(source)
		} else {
			RunError::Operation {
				step: step.label.to_string(),
				source,
			}
		}
	}
}

/// Result of one step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput {
	/// Documents from a find or an aggregation, or `{ title, price }` rows
	Documents(Vec<Document>),
	Titles(Vec<String>),
	Modified(u64),
	Deleted(u64),
	IndexCreated { name: String, compound: bool },
	Explained {
		subject: &'static str,
		stats: ExplainStats,
		report_index: bool,
	},
	Indexes(Vec<IndexModel>),
	Count(u64),
}

/// A step together with what it produced
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
	pub section: Section,
	/// 1-based position within the section
	pub number: usize,
	pub label: &'static str,
	pub output: StepOutput,
	pub elapsed: Duration,
}

impl StepRecord {
	/// Whether this is the first step reported under its section
	pub fn opens_section(&self) -> bool {
		self.number == 1
	}
}

/// Receives run events in order
///
/// Only [`StepSink::record`] is required; the lifecycle hooks default to
/// doing nothing.
pub trait StepSink {
	fn connected(&mut self, _backend: NoSQLBackendType) {}

	fn record(&mut self, record: StepRecord);

	fn failed(&mut self, _error: &RunError) {}

	fn closed(&mut self) {}
}

impl StepSink for Vec<StepRecord> {
	fn record(&mut self, record: StepRecord) {
		self.push(record);
	}
}

/// Runs steps one at a time against a single collection
pub struct Runner {
	backend: Arc<dyn DocumentBackend>,
	collection: String,
}

impl Runner {
	pub fn new(backend: Arc<dyn DocumentBackend>, collection: impl Into<String>) -> Self {
		Self {
			backend,
			collection: collection.into(),
		}
	}

	/// Issue the store call for `operation` and shape its result.
	pub async fn execute(&self, operation: &Operation) -> Result<StepOutput, NoSQLError> {
		let backend = self.backend.as_ref();
		let collection = self.collection.as_str();

		let output = match operation {
			Operation::Find {
				filter,
				options,
				view,
			} => {
				let documents = backend
					.find_many(collection, filter.clone(), options.clone())
					.await?;
				match view {
					FindView::Documents => StepOutput::Documents(documents),
					FindView::TitlePrice => {
						StepOutput::Documents(documents.iter().map(title_and_price).collect())
					}
					FindView::Titles => StepOutput::Titles(documents.iter().map(title_of).collect()),
				}
			}
			Operation::Count { filter } => {
				StepOutput::Count(backend.count_documents(collection, filter.clone()).await?)
			}
			Operation::UpdateOne { filter, update } => {
				let result = backend
					.update_one(collection, filter.clone(), update.clone())
					.await?;
				StepOutput::Modified(result.modified_count)
			}
			Operation::DeleteOne { filter } => {
				StepOutput::Deleted(backend.delete_one(collection, filter.clone()).await?)
			}
			Operation::Aggregate { pipeline } => {
				StepOutput::Documents(backend.aggregate(collection, pipeline.clone()).await?)
			}
			Operation::CreateIndex { model } => {
				let name = backend.create_index(collection, model.clone()).await?;
				StepOutput::IndexCreated {
					name,
					compound: model.keys.len() > 1,
				}
			}
			Operation::Explain {
				filter,
				subject,
				report_index,
			} => StepOutput::Explained {
				subject: *subject,
				stats: backend.explain_find(collection, filter.clone()).await?,
				report_index: *report_index,
			},
			Operation::ListIndexes => StepOutput::Indexes(backend.list_indexes(collection).await?),
		};
		Ok(output)
	}

	/// Run `plan` in order, stopping at the first failure.
	///
	/// Returns the number of steps completed.
	pub async fn run(&self, plan: &[Step], sink: &mut dyn StepSink) -> Result<usize, RunError> {
		let mut section = None;
		let mut number = 0;

		for (completed, step) in plan.iter().enumerate() {
			if section != Some(step.section) {
				section = Some(step.section);
				number = 0;
			}
			number += 1;

			let started = Instant::now();
			let output = self
				.execute(&step.operation)
				.await
				.map_err(|e| RunError::from_step(step, e))?;
			let elapsed = started.elapsed();

			tracing::debug!(
				step = completed + 1,
				label = step.label,
				kind = step.operation.kind(),
				elapsed_ms = elapsed.as_millis() as u64,
				"step completed"
			);

			sink.record(StepRecord {
				section: step.section,
				number,
				label: step.label,
				output,
				elapsed,
			});
		}
		Ok(plan.len())
	}
}

fn title_of(document: &Document) -> String {
	match document.get("title") {
		Some(Bson::String(title)) => title.clone(),
		Some(other) => other.to_string(),
		None => String::new(),
	}
}

fn title_and_price(document: &Document) -> Document {
	let mut row = Document::new();
	for field in ["title", "price"] {
		if let Some(value) = document.get(field) {
			row.insert(field, value.clone());
		}
	}
	row
}

/// Connect, run `plan` and release the connection.
///
/// The backend is closed exactly once on every path that obtained one. A
/// failure is reported to the sink before the close, and a close failure is
/// only logged.
pub async fn run_session<F>(
	connect: F,
	collection: &str,
	plan: &[Step],
	sink: &mut dyn StepSink,
) -> Result<usize, RunError>
where
	F: Future<Output = Result<Arc<dyn DocumentBackend>, NoSQLError>>,
{
	let backend = match connect.await {
		Ok(backend) => backend,
		Err(e) => {
			let error = RunError::Connectivity(e);
			sink.failed(&error);
			sink.closed();
			return Err(error);
		}
	};
	sink.connected(backend.backend_type());

	let runner = Runner::new(Arc::clone(&backend), collection);
	let result = runner.run(plan, sink).await;
	if let Err(error) = &result {
		tracing::error!(error = %error, "run aborted");
		sink.failed(error);
	}

	match backend.close().await {
		Ok(()) => tracing::info!(collection, "connection closed"),
		Err(e) => tracing::warn!(error = %e, "failed to close connection"),
	}
	sink.closed();

	result
}
