//! In-memory document backend
//!
//! A process-local store that evaluates the same query language as the
//! MongoDB backend: filters, cursor modifiers, operator updates, aggregation
//! pipelines, indexes and `explain`. Useful for running the query plan
//! without a server and for tests.
//!
//! # Example
//!
//! ```
//! use bookstore_nosql::backends::memory::InMemoryBackend;
//! use bookstore_nosql::traits::DocumentBackend;
//! use bson::doc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> bookstore_nosql::Result<()> {
//! let backend = InMemoryBackend::new("plp_bookstore");
//! backend.insert_one("books", doc! { "title": "The Hobbit", "pages": 310 }).await?;
//!
//! let long = backend.count_documents("books", doc! { "pages": { "$gt": 300 } }).await?;
//! assert_eq!(long, 1);
//! # Ok(())
//! # }
//! ```

mod aggregation;
mod compare;
mod cursor;
mod filter;
mod path;
mod planner;
mod update;

use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{NoSQLError, Result};
use crate::traits::{DocumentBackend, NoSQLBackend};
use crate::types::{ExplainStats, FindOptions, IndexModel, NoSQLBackendType, UpdateResult};

/// Implicit index on `_id`; unique without carrying the flag, as servers list it
const ID_INDEX: &str = "_id_";

#[derive(Debug, Clone)]
struct CollectionState {
	documents: Vec<Document>,
	/// Creation order; `_id_` is always first
	indexes: Vec<IndexModel>,
}

impl CollectionState {
	fn new() -> Self {
		Self {
			documents: Vec::new(),
			indexes: vec![
				IndexModel::builder()
					.keys(doc! { "_id": 1 })
					.name(ID_INDEX)
					.build(),
			],
		}
	}

	fn find_position(&self, filter: &Document) -> Result<Option<usize>> {
		for (position, doc) in self.documents.iter().enumerate() {
			if filter::matches(doc, filter)? {
				return Ok(Some(position));
			}
		}
		Ok(None)
	}

	/// Reject `candidate` if it collides with another document on a unique index.
	fn check_unique(&self, candidate: &Document, skip: Option<usize>) -> Result<()> {
		let enforced = self
			.indexes
			.iter()
			.filter(|i| i.unique || i.name.as_deref() == Some(ID_INDEX));
		for index in enforced {
			let key = index_key(index, candidate);
			let duplicate = self
				.documents
				.iter()
				.enumerate()
				.filter(|(position, _)| Some(*position) != skip)
				.any(|(_, existing)| {
					index_key(index, existing)
						.iter()
						.zip(&key)
						.all(|(a, b)| compare::values_equal(a, b))
				});
			if duplicate {
				return Err(NoSQLError::DatabaseError(format!(
					"E11000 duplicate key error index: {} dup key: {:?}",
					index.effective_name(),
					key
				)));
			}
		}
		Ok(())
	}
}

fn index_key(index: &IndexModel, doc: &Document) -> Vec<Bson> {
	index
		.fields()
		.map(|field| path::lookup(doc, field).cloned().unwrap_or(Bson::Null))
		.collect()
}

/// In-memory implementation of [`DocumentBackend`]
///
/// Collections are created implicitly by the first write. After
/// [`NoSQLBackend::close`] every call fails with `ConnectionError`.
pub struct InMemoryBackend {
	database_name: String,
	collections: RwLock<HashMap<String, CollectionState>>,
	closed: AtomicBool,
}

impl InMemoryBackend {
	/// Create an empty store standing in for `database`
	pub fn new(database: impl Into<String>) -> Self {
		Self {
			database_name: database.into(),
			collections: RwLock::new(HashMap::new()),
			closed: AtomicBool::new(false),
		}
	}

	/// Name of the database this backend stands in for
	pub fn database_name(&self) -> &str {
		&self.database_name
	}

	/// Copy of a collection's documents in natural order.
	///
	/// Readable after close, for inspecting the final state.
	pub fn documents(&self, collection: &str) -> Vec<Document> {
		self.collections
			.read()
			.get(collection)
			.map(|c| c.documents.clone())
			.unwrap_or_default()
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::Acquire)
	}

	fn ensure_open(&self) -> Result<()> {
		if self.is_closed() {
			return Err(NoSQLError::ConnectionError(
				"in-memory backend has been closed".to_string(),
			));
		}
		Ok(())
	}

	/// Run `f` against a snapshot of a collection's documents.
	fn read<T>(&self, collection: &str, f: impl FnOnce(&[Document]) -> Result<T>) -> Result<T> {
		self.ensure_open()?;
		let collections = self.collections.read();
		match collections.get(collection) {
			Some(state) => f(&state.documents),
			None => f(&[]),
		}
	}

	fn insert_into(state: &mut CollectionState, mut document: Document) -> Result<String> {
		let id = match document.get("_id").cloned() {
			Some(id) => id,
			None => {
				let id = Bson::ObjectId(ObjectId::new());
				let mut with_id = doc! { "_id": id.clone() };
				for (key, value) in document {
					with_id.insert(key, value);
				}
				document = with_id;
				id
			}
		};
		state.check_unique(&document, None)?;
		state.documents.push(document);
		Ok(match id {
			Bson::ObjectId(oid) => oid.to_hex(),
			Bson::String(s) => s,
			other => other.to_string(),
		})
	}
}

#[async_trait]
impl NoSQLBackend for InMemoryBackend {
	fn backend_type(&self) -> NoSQLBackendType {
		NoSQLBackendType::Memory
	}

	async fn health_check(&self) -> Result<()> {
		self.ensure_open()
	}

	async fn close(&self) -> Result<()> {
		if !self.closed.swap(true, Ordering::AcqRel) {
			tracing::debug!(database = %self.database_name, "in-memory backend closed");
		}
		Ok(())
	}

	fn as_any(&self) -> &dyn std::any::Any {
		self
	}
}

#[async_trait]
impl DocumentBackend for InMemoryBackend {
	async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>> {
		self.read(collection, |docs| {
			for doc in docs {
				if filter::matches(doc, &filter)? {
					return Ok(Some(doc.clone()));
				}
			}
			Ok(None)
		})
	}

	async fn find_many(
		&self,
		collection: &str,
		filter: Document,
		options: FindOptions,
	) -> Result<Vec<Document>> {
		let matched = self.read(collection, |docs| {
			let mut matched = Vec::new();
			for doc in docs {
				if filter::matches(doc, &filter)? {
					matched.push(doc.clone());
				}
			}
			Ok(matched)
		})?;
		cursor::apply(matched, &options)
	}

	async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64> {
		self.read(collection, |docs| {
			let mut count = 0;
			for doc in docs {
				if filter::matches(doc, &filter)? {
					count += 1;
				}
			}
			Ok(count)
		})
	}

	async fn insert_one(&self, collection: &str, document: Document) -> Result<String> {
		self.ensure_open()?;
		let mut collections = self.collections.write();
		let state = collections
			.entry(collection.to_string())
			.or_insert_with(CollectionState::new);
		Self::insert_into(state, document)
	}

	async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<Vec<String>> {
		self.ensure_open()?;
		let mut collections = self.collections.write();
		let state = collections
			.entry(collection.to_string())
			.or_insert_with(CollectionState::new);

		// ordered: stop at the first failure, keeping earlier inserts
		let mut ids = Vec::with_capacity(documents.len());
		for document in documents {
			ids.push(Self::insert_into(state, document)?);
		}
		tracing::debug!(collection, inserted = ids.len(), "inserted documents");
		Ok(ids)
	}

	async fn update_one(
		&self,
		collection: &str,
		filter: Document,
		update: Document,
	) -> Result<UpdateResult> {
		self.ensure_open()?;
		let mut collections = self.collections.write();
		let Some(state) = collections.get_mut(collection) else {
			// validate the update even when nothing matches
			update::apply_update(&mut Document::new(), &update)?;
			return Ok(UpdateResult::default());
		};

		let Some(position) = state.find_position(&filter)? else {
			update::apply_update(&mut Document::new(), &update)?;
			return Ok(UpdateResult::default());
		};

		let mut updated = state.documents[position].clone();
		let changed = update::apply_update(&mut updated, &update)?;
		if changed {
			state.check_unique(&updated, Some(position))?;
			state.documents[position] = updated;
		}
		Ok(UpdateResult::new(1, u64::from(changed)))
	}

	async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64> {
		self.ensure_open()?;
		let mut collections = self.collections.write();
		let Some(state) = collections.get_mut(collection) else {
			return Ok(0);
		};
		match state.find_position(&filter)? {
			Some(position) => {
				state.documents.remove(position);
				Ok(1)
			}
			None => Ok(0),
		}
	}

	async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> Result<Vec<Document>> {
		let docs = self.read(collection, |docs| Ok(docs.to_vec()))?;
		aggregation::run_pipeline(docs, &pipeline)
	}

	async fn create_index(&self, collection: &str, index: IndexModel) -> Result<String> {
		index.validate()?;
		self.ensure_open()?;
		let mut collections = self.collections.write();
		let state = collections
			.entry(collection.to_string())
			.or_insert_with(CollectionState::new);

		let name = index.effective_name();
		if let Some(existing) = state.indexes.iter().find(|i| i.effective_name() == name) {
			if existing.keys == index.keys && existing.unique == index.unique {
				return Ok(name);
			}
			return Err(NoSQLError::DatabaseError(format!(
				"an index named {} already exists with different options",
				name
			)));
		}
		if let Some(existing) = state.indexes.iter().find(|i| i.keys == index.keys) {
			if existing.unique == index.unique && index.name.is_none() {
				return Ok(existing.effective_name());
			}
			return Err(NoSQLError::DatabaseError(format!(
				"an index with the same key pattern already exists as {}",
				existing.effective_name()
			)));
		}

		if index.unique {
			let mut seen = CollectionState {
				documents: Vec::new(),
				indexes: vec![index.clone()],
			};
			for doc in &state.documents {
				seen.check_unique(doc, None)?;
				seen.documents.push(doc.clone());
			}
		}

		state.indexes.push(IndexModel {
			name: Some(name.clone()),
			..index
		});
		tracing::debug!(collection, index = %name, "created index");
		Ok(name)
	}

	async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexModel>> {
		self.ensure_open()?;
		self.collections
			.read()
			.get(collection)
			.map(|state| state.indexes.clone())
			.ok_or_else(|| NoSQLError::NotFound(format!("ns does not exist: {}", collection)))
	}

	async fn explain_find(&self, collection: &str, filter: Document) -> Result<ExplainStats> {
		self.ensure_open()?;
		let collections = self.collections.read();
		match collections.get(collection) {
			Some(state) => planner::explain(&state.documents, &state.indexes, &filter),
			None => planner::explain(&[], &[], &filter),
		}
	}

	async fn drop_collection(&self, collection: &str) -> Result<()> {
		self.ensure_open()?;
		self.collections.write().remove(collection);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn backend() -> InMemoryBackend {
		InMemoryBackend::new("plp_bookstore")
	}

	#[rstest]
	#[tokio::test]
	async fn test_insert_assigns_object_id_first(backend: InMemoryBackend) {
		let id = backend
			.insert_one("books", doc! { "title": "The Hobbit" })
			.await
			.unwrap();

		let stored = backend.documents("books");
		assert_eq!(stored.len(), 1);
		let first_key = stored[0].keys().next().unwrap();
		assert_eq!(first_key, "_id");
		assert_eq!(stored[0].get_object_id("_id").unwrap().to_hex(), id);
	}

	#[rstest]
	#[tokio::test]
	async fn test_duplicate_id_is_rejected(backend: InMemoryBackend) {
		backend
			.insert_one("books", doc! { "_id": "b1", "title": "1984" })
			.await
			.unwrap();
		let err = backend
			.insert_one("books", doc! { "_id": "b1", "title": "Animal Farm" })
			.await
			.unwrap_err();
		assert!(matches!(err, NoSQLError::DatabaseError(_)));
		assert_eq!(backend.documents("books").len(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_id_index_listed_without_unique_flag(backend: InMemoryBackend) {
		backend
			.insert_one("books", doc! { "_id": "b1", "title": "1984" })
			.await
			.unwrap();

		let indexes = backend.list_indexes("books").await.unwrap();
		assert_eq!(indexes[0].effective_name(), "_id_");
		assert!(!indexes[0].unique);

		// still enforced
		let err = backend
			.insert_one("books", doc! { "_id": "b1", "title": "Animal Farm" })
			.await
			.unwrap_err();
		assert!(matches!(err, NoSQLError::DatabaseError(_)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_update_reports_match_and_modification(backend: InMemoryBackend) {
		backend
			.insert_one("books", doc! { "title": "1984", "price": 10.0 })
			.await
			.unwrap();

		let first = backend
			.update_one("books", doc! { "title": "1984" }, doc! { "$set": { "price": 13.99 } })
			.await
			.unwrap();
		assert_eq!((first.matched_count, first.modified_count), (1, 1));

		let again = backend
			.update_one("books", doc! { "title": "1984" }, doc! { "$set": { "price": 13.99 } })
			.await
			.unwrap();
		assert_eq!((again.matched_count, again.modified_count), (1, 0));

		let missing = backend
			.update_one("books", doc! { "title": "Dune" }, doc! { "$set": { "price": 1 } })
			.await
			.unwrap();
		assert_eq!((missing.matched_count, missing.modified_count), (0, 0));
	}

	#[rstest]
	#[tokio::test]
	async fn test_update_without_operators_fails_even_without_match(backend: InMemoryBackend) {
		let err = backend
			.update_one("books", doc! { "title": "Dune" }, doc! { "price": 1 })
			.await
			.unwrap_err();
		assert!(matches!(err, NoSQLError::InvalidOperation(_)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_delete_absent_document_is_zero(backend: InMemoryBackend) {
		backend.insert_one("books", doc! { "title": "1984" }).await.unwrap();
		assert_eq!(backend.delete_one("books", doc! { "title": "Test Book" }).await.unwrap(), 0);
		assert_eq!(backend.delete_one("books", doc! { "title": "1984" }).await.unwrap(), 1);
		assert_eq!(backend.delete_one("nowhere", doc! {}).await.unwrap(), 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_indexes_are_listed_in_creation_order(backend: InMemoryBackend) {
		backend.insert_one("books", doc! { "title": "1984" }).await.unwrap();
		let title = backend
			.create_index("books", IndexModel::builder().keys(doc! { "title": 1 }).build())
			.await
			.unwrap();
		let again = backend
			.create_index("books", IndexModel::builder().keys(doc! { "title": 1 }).build())
			.await
			.unwrap();
		assert_eq!(title, "title_1");
		assert_eq!(again, "title_1");

		let names: Vec<String> = backend
			.list_indexes("books")
			.await
			.unwrap()
			.iter()
			.map(IndexModel::effective_name)
			.collect();
		assert_eq!(names, ["_id_", "title_1"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_unique_index_over_duplicates_fails(backend: InMemoryBackend) {
		backend
			.insert_many("books", vec![doc! { "author": "George Orwell" }, doc! { "author": "George Orwell" }])
			.await
			.unwrap();
		let err = backend
			.create_index(
				"books",
				IndexModel::builder().keys(doc! { "author": 1 }).unique(true).build(),
			)
			.await
			.unwrap_err();
		assert!(matches!(err, NoSQLError::DatabaseError(_)));
		assert_eq!(backend.list_indexes("books").await.unwrap().len(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_list_indexes_on_missing_collection(backend: InMemoryBackend) {
		let err = backend.list_indexes("books").await.unwrap_err();
		assert!(matches!(err, NoSQLError::NotFound(_)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_closed_backend_refuses_calls(backend: InMemoryBackend) {
		backend.insert_one("books", doc! { "title": "1984" }).await.unwrap();
		backend.close().await.unwrap();
		backend.close().await.unwrap();

		let err = backend.count_documents("books", doc! {}).await.unwrap_err();
		assert!(err.is_connectivity());
		assert!(backend.health_check().await.is_err());
		assert_eq!(backend.documents("books").len(), 1);
	}
}
