//! Console rendering of step records
//!
//! Documents are printed as pretty relaxed extended JSON. Errors go to the
//! error stream; everything else goes to the output stream.

use bookstore_nosql::{Document, IndexModel, NoSQLBackendType};
use bson::Bson;
use serde_json::Value;
use std::io::{self, Stderr, Stdout, Write};

use crate::runner::{RunError, StepOutput, StepRecord, StepSink};
use crate::steps::Step;

fn document_json(document: &Document) -> Value {
	Bson::Document(document.clone()).into_relaxed_extjson()
}

fn index_json(index: &IndexModel) -> Value {
	let mut descriptor = Document::new();
	descriptor.insert("key", index.keys.clone());
	descriptor.insert("name", index.effective_name());
	if index.unique {
		descriptor.insert("unique", true);
	}
	document_json(&descriptor)
}

fn pretty(value: &Value) -> String {
	// serializing a `Value` only fails for non-string map keys, which it cannot hold
	serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Render the result part of a step, without a trailing newline
pub fn render_output(output: &StepOutput) -> String {
	match output {
		StepOutput::Documents(documents) => {
			pretty(&Value::Array(documents.iter().map(document_json).collect()))
		}
		StepOutput::Titles(titles) => pretty(&Value::from(titles.clone())),
		StepOutput::Modified(n) => format!("Modified {} document(s)", n),
		StepOutput::Deleted(n) => format!("Deleted {} document(s)", n),
		StepOutput::IndexCreated { name, compound } => {
			if *compound {
				format!("Created compound index: {}", name)
			} else {
				format!("Created index: {}", name)
			}
		}
		StepOutput::Explained {
			subject,
			stats,
			report_index,
		} => {
			let mut lines = vec![
				format!("Execution stats for {} query:", subject),
				format!("- Documents examined: {}", stats.docs_examined),
				format!("- Documents returned: {}", stats.docs_returned),
				format!("- Execution time: {}ms", stats.execution_time_millis),
			];
			if *report_index {
				lines.push(format!(
					"- Index used: {}",
					stats.index_name.as_deref().unwrap_or("No index")
				));
			}
			lines.join("\n")
		}
		StepOutput::Indexes(indexes) => {
			pretty(&Value::Array(indexes.iter().map(index_json).collect()))
		}
		StepOutput::Count(n) => n.to_string(),
	}
}

/// Render a record, including its section heading when it opens one
pub fn render_record(record: &StepRecord) -> String {
	let mut text = String::new();

	if record.opens_section() {
		text.push_str(&format!("\n=== {} ===\n\n", record.section.title()));
		if let Some(preamble) = record.section.preamble() {
			text.push_str(preamble);
			text.push('\n');
		}
	}

	if record.section.is_numbered() {
		if !record.opens_section() {
			text.push('\n');
		}
		text.push_str(&format!(
			"{}. {}:\n{}\n",
			record.number,
			record.label,
			render_output(&record.output)
		));
	} else {
		match &record.output {
			StepOutput::Count(n) => text.push_str(&format!("\n{}: {}\n", record.label, n)),
			other => text.push_str(&format!(
				"\n{}:\n{}\n",
				record.label,
				render_output(other)
			)),
		}
	}
	text
}

/// List a plan without running it
///
/// ```
/// use bookstore_runner::report::render_plan;
/// use bookstore_runner::standard_plan;
///
/// let listing = render_plan(&standard_plan());
/// assert!(listing.starts_with("TASK 2: BASIC CRUD OPERATIONS\n"));
/// ```
pub fn render_plan(plan: &[Step]) -> String {
	let mut text = String::new();
	let mut section = None;
	let mut number = 0;

	for step in plan {
		if section != Some(step.section) {
			if section.is_some() {
				text.push('\n');
			}
			section = Some(step.section);
			number = 0;
			text.push_str(step.section.title());
			text.push('\n');
		}
		number += 1;
		text.push_str(&format!(
			"{:>3}. {} [{}]\n       {}\n",
			number,
			step.label,
			step.operation.kind(),
			step.operation
		));
	}
	text
}

/// Line announcing a successful connection
pub fn connected_line(backend: NoSQLBackendType) -> &'static str {
	match backend {
		NoSQLBackendType::MongoDB => "Connected to MongoDB server",
		NoSQLBackendType::Memory => "Connected to in-memory store",
	}
}

/// [`StepSink`] that prints the run as it happens
pub struct ConsolePrinter<O = Stdout, E = Stderr> {
	out: O,
	err: E,
}

impl ConsolePrinter {
	/// Print to stdout, errors to stderr
	pub fn new() -> Self {
		Self::with_writers(io::stdout(), io::stderr())
	}
}

impl Default for ConsolePrinter {
	fn default() -> Self {
		Self::new()
	}
}

impl<O: Write, E: Write> ConsolePrinter<O, E> {
	pub fn with_writers(out: O, err: E) -> Self {
		Self { out, err }
	}

	pub fn into_writers(self) -> (O, E) {
		(self.out, self.err)
	}

	fn print(&mut self, text: &str) {
		if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
			tracing::warn!(error = %e, "failed to write report");
		}
	}
}

impl<O: Write, E: Write> StepSink for ConsolePrinter<O, E> {
	fn connected(&mut self, backend: NoSQLBackendType) {
		self.print(&format!("{}\n", connected_line(backend)));
	}

	fn record(&mut self, record: StepRecord) {
		self.print(&render_record(&record));
	}

	fn failed(&mut self, error: &RunError) {
		if let Err(e) = writeln!(self.err, "Error occurred: {}", error) {
			tracing::warn!(error = %e, "failed to write error report");
		}
	}

	fn closed(&mut self) {
		self.print("\nConnection closed\n");
	}
}
