//! Sort, skip, limit and projection over matched documents

use bson::{Bson, Document};

use super::compare::{NULL, compare};
use super::path::{lookup, remove_path, set_path};
use crate::error::{NoSQLError, Result};
use crate::types::{FindOptions, direction_of};

/// Apply cursor modifiers in server order: sort, skip, limit, projection.
pub(crate) fn apply(mut docs: Vec<Document>, options: &FindOptions) -> Result<Vec<Document>> {
	if let Some(sort) = &options.sort {
		sort_documents(&mut docs, sort)?;
	}

	let skip = options.skip.unwrap_or(0) as usize;
	let docs = docs.into_iter().skip(skip);
	// a negative limit behaves like its absolute value; 0 means none
	let docs: Vec<Document> = match options.limit.map(i64::unsigned_abs) {
		Some(limit) if limit > 0 => docs.take(limit as usize).collect(),
		_ => docs.collect(),
	};

	match &options.projection {
		Some(projection) if !projection.is_empty() => docs
			.into_iter()
			.map(|doc| project(doc, projection))
			.collect(),
		_ => Ok(docs),
	}
}

/// Stable sort by a `{ field: 1 | -1, ... }` specification.
pub(crate) fn sort_documents(docs: &mut [Document], spec: &Document) -> Result<()> {
	let keys = spec
		.iter()
		.map(|(field, direction)| {
			direction_of(direction).map(|d| (field.as_str(), d)).ok_or_else(|| {
				NoSQLError::InvalidOperation(format!(
					"invalid sort direction {} for field '{}'",
					direction, field
				))
			})
		})
		.collect::<Result<Vec<_>>>()?;

	if keys.is_empty() {
		return Ok(());
	}

	docs.sort_by(|a, b| {
		keys.iter()
			.map(|(field, direction)| {
				let ord = compare(
					lookup(a, field).unwrap_or(&NULL),
					lookup(b, field).unwrap_or(&NULL),
				);
				if *direction < 0 { ord.reverse() } else { ord }
			})
			.find(|ord| ord.is_ne())
			.unwrap_or(std::cmp::Ordering::Equal)
	});
	Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum Mode {
	Include,
	Exclude,
}

/// Apply a find projection.
///
/// Inclusion mode keeps the listed fields in document order plus `_id` unless
/// `_id: 0`; exclusion mode drops the listed fields. Mixing the two (other
/// than for `_id`) is rejected.
pub(crate) fn project(doc: Document, spec: &Document) -> Result<Document> {
	let mut keep_id = true;
	let mut mode = None;
	let mut fields = Vec::new();

	for (field, flag) in spec {
		let include = flag_value(field, flag)?;
		if field == "_id" {
			keep_id = include;
			continue;
		}
		let field_mode = if include { Mode::Include } else { Mode::Exclude };
		match mode {
			None => mode = Some(field_mode),
			Some(current) if current != field_mode => {
				return Err(NoSQLError::InvalidOperation(format!(
					"cannot mix inclusion and exclusion in projection (field '{}')",
					field
				)));
			}
			_ => {}
		}
		fields.push(field.as_str());
	}

	match mode {
		Some(Mode::Include) => {
			let mut out = Document::new();
			if keep_id && let Some(id) = doc.get("_id") {
				out.insert("_id", id.clone());
			}
			for (key, value) in &doc {
				if key != "_id" && fields.contains(&key.as_str()) {
					out.insert(key.clone(), value.clone());
				}
			}
			for path in fields.iter().filter(|f| f.contains('.')) {
				if let Some(value) = lookup(&doc, path) {
					set_path(&mut out, path, value.clone())?;
				}
			}
			Ok(out)
		}
		Some(Mode::Exclude) | None => {
			let mut out = doc;
			for path in fields {
				remove_path(&mut out, path);
			}
			if !keep_id {
				out.remove("_id");
			}
			Ok(out)
		}
	}
}

fn flag_value(field: &str, flag: &Bson) -> Result<bool> {
	match flag {
		Bson::Boolean(b) => Ok(*b),
		Bson::Int32(n) => Ok(*n != 0),
		Bson::Int64(n) => Ok(*n != 0),
		Bson::Double(f) => Ok(*f != 0.0),
		other => Err(NoSQLError::UnsupportedFeature(format!(
			"projection expression {} for field '{}'",
			other, field
		))),
	}
}
