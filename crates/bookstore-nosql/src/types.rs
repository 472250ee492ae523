//! Shared value types for document backends

use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::error::{NoSQLError, Result};

pub use bson::Document;

/// Which engine sits behind a backend handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoSQLBackendType {
	MongoDB,
	Memory,
}

impl std::fmt::Display for NoSQLBackendType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			NoSQLBackendType::MongoDB => write!(f, "MongoDB"),
			NoSQLBackendType::Memory => write!(f, "in-memory"),
		}
	}
}

/// Cursor modifiers for `find_many`
///
/// Applied in the order filter, sort, skip, limit, projection.
///
/// # Example
///
/// ```
/// use bookstore_nosql::types::FindOptions;
/// use bson::doc;
///
/// let options = FindOptions::new().sort(doc! { "price": 1 }).skip(5).limit(5);
/// assert_eq!(options.skip, Some(5));
/// assert_eq!(options.limit, Some(5));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
	pub projection: Option<Document>,
	pub sort: Option<Document>,
	pub skip: Option<u64>,
	pub limit: Option<i64>,
}

impl FindOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn projection(mut self, projection: Document) -> Self {
		self.projection = Some(projection);
		self
	}

	pub fn sort(mut self, sort: Document) -> Self {
		self.sort = Some(sort);
		self
	}

	pub fn skip(mut self, skip: u64) -> Self {
		self.skip = Some(skip);
		self
	}

	pub fn limit(mut self, limit: i64) -> Self {
		self.limit = Some(limit);
		self
	}
}

/// Outcome of an update call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateResult {
	pub matched_count: u64,
	/// Documents whose stored value actually changed
	pub modified_count: u64,
}

impl UpdateResult {
	pub fn new(matched_count: u64, modified_count: u64) -> Self {
		Self {
			matched_count,
			modified_count,
		}
	}
}

/// Index descriptor, used both to create an index and to describe one
#[derive(Debug, Clone, PartialEq)]
pub struct IndexModel {
	/// Ordered key specification, e.g. `{ author: 1, published_year: -1 }`
	pub keys: Document,
	pub name: Option<String>,
	pub unique: bool,
}

impl IndexModel {
	/// Create a new index model builder.
	pub fn builder() -> IndexModelBuilder {
		IndexModelBuilder::default()
	}

	/// The name MongoDB assigns when none is given: `field_dir` pairs joined by `_`.
	///
	/// ```
	/// use bookstore_nosql::types::IndexModel;
	/// use bson::doc;
	///
	/// let model = IndexModel::builder()
	///     .keys(doc! { "author": 1, "published_year": -1 })
	///     .build();
	/// assert_eq!(model.generated_name(), "author_1_published_year_-1");
	/// ```
	pub fn generated_name(&self) -> String {
		self.keys
			.iter()
			.map(|(field, direction)| format!("{}_{}", field, render_direction(direction)))
			.collect::<Vec<_>>()
			.join("_")
	}

	/// Explicit name if set, otherwise the generated one.
	pub fn effective_name(&self) -> String {
		self.name.clone().unwrap_or_else(|| self.generated_name())
	}

	/// Field names of the key, in key order.
	pub fn fields(&self) -> impl Iterator<Item = &str> {
		self.keys.keys().map(String::as_str)
	}

	/// Reject empty keys and directions other than `1` / `-1`.
	pub fn validate(&self) -> Result<()> {
		if self.keys.is_empty() {
			return Err(NoSQLError::InvalidOperation(
				"index key specification must not be empty".to_string(),
			));
		}
		for (field, direction) in &self.keys {
			match direction_of(direction) {
				Some(_) => {}
				None => {
					return Err(NoSQLError::UnsupportedFeature(format!(
						"index direction {} for field '{}'",
						direction, field
					)));
				}
			}
		}
		Ok(())
	}
}

/// Builder for [`IndexModel`]
#[derive(Debug, Default)]
pub struct IndexModelBuilder {
	keys: Document,
	name: Option<String>,
	unique: bool,
}

impl IndexModelBuilder {
	pub fn keys(mut self, keys: Document) -> Self {
		self.keys = keys;
		self
	}

	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn unique(mut self, unique: bool) -> Self {
		self.unique = unique;
		self
	}

	/// Build the index model.
	pub fn build(self) -> IndexModel {
		IndexModel {
			keys: self.keys,
			name: self.name,
			unique: self.unique,
		}
	}
}

/// Sort/index direction encoded as `1` or `-1` in any numeric BSON type.
pub fn direction_of(value: &Bson) -> Option<i32> {
	let n = match value {
		Bson::Int32(n) => *n as i64,
		Bson::Int64(n) => *n,
		Bson::Double(f) if f.fract() == 0.0 => *f as i64,
		_ => return None,
	};
	match n {
		1 => Some(1),
		-1 => Some(-1),
		_ => None,
	}
}

fn render_direction(value: &Bson) -> String {
	match direction_of(value) {
		Some(d) => d.to_string(),
		None => match value {
			Bson::String(s) => s.clone(),
			other => other.to_string(),
		},
	}
}

/// Execution statistics for a single `find` plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplainStats {
	/// Winning plan's top stage, e.g. `COLLSCAN` or `IXSCAN`
	pub stage: String,
	pub docs_examined: u64,
	pub docs_returned: u64,
	pub execution_time_millis: u64,
	/// Index used by the winning plan, `None` for a collection scan
	pub index_name: Option<String>,
}
