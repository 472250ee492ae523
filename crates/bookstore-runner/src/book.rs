//! Book documents

use bookstore_nosql::{Document, NoSQLError};
use serde::{Deserialize, Serialize};

/// One entry of the `books` collection
///
/// The store is schemaless; this type only describes the documents the
/// runner seeds and expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
	pub title: String,
	pub author: String,
	pub genre: String,
	pub published_year: i32,
	pub price: f64,
	pub pages: i32,
	pub in_stock: bool,
}

impl Book {
	pub fn new(
		title: impl Into<String>,
		author: impl Into<String>,
		genre: impl Into<String>,
		published_year: i32,
		price: f64,
		pages: i32,
		in_stock: bool,
	) -> Self {
		Self {
			title: title.into(),
			author: author.into(),
			genre: genre.into(),
			published_year,
			price,
			pages,
			in_stock,
		}
	}

	pub fn to_document(&self) -> Result<Document, NoSQLError> {
		Ok(bson::to_document(self)?)
	}

	/// Read a stored book; extra fields such as `_id` are ignored.
	pub fn from_document(document: Document) -> Result<Self, NoSQLError> {
		Ok(bson::from_document(document)?)
	}
}
