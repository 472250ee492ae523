//! Document-oriented database trait

use async_trait::async_trait;

use super::NoSQLBackend;
use crate::error::Result;
use crate::types::{Document, ExplainStats, FindOptions, IndexModel, UpdateResult};

/// Trait for document-oriented NoSQL databases
///
/// Every method addresses one collection of the backend's current database by
/// name. Filters, updates and pipelines use MongoDB query-language documents.
///
/// # Example
///
/// ```rust,ignore
/// use bookstore_nosql::traits::DocumentBackend;
/// use bookstore_nosql::types::FindOptions;
/// use bson::doc;
///
/// async fn cheapest(db: &dyn DocumentBackend) -> bookstore_nosql::Result<Vec<bson::Document>> {
///     let options = FindOptions::new().sort(doc! { "price": 1 }).limit(3);
///     db.find_many("books", doc! {}, options).await
/// }
/// ```
#[async_trait]
pub trait DocumentBackend: NoSQLBackend {
	/// Finds the first document matching the filter in natural order
	async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>>;

	/// Finds all documents matching the filter, realized eagerly into a vector
	///
	/// # Arguments
	///
	/// * `collection` - The name of the collection to search
	/// * `filter` - The filter criteria as a document
	/// * `options` - Projection, sort, skip and limit modifiers
	async fn find_many(
		&self,
		collection: &str,
		filter: Document,
		options: FindOptions,
	) -> Result<Vec<Document>>;

	/// Counts documents matching the filter
	async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64>;

	/// Inserts a single document and returns its `_id` rendered as a string
	async fn insert_one(&self, collection: &str, document: Document) -> Result<String>;

	/// Inserts documents in order and returns their ids
	async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<Vec<String>>;

	/// Updates the first document matching the filter
	///
	/// `update` must consist of update operators such as `$set`.
	///
	/// # Example
	///
	/// ```rust,ignore
	/// let result = db.update_one(
	///     "books",
	///     doc! { "title": "1984" },
	///     doc! { "$set": { "price": 13.99 } },
	/// ).await?;
	/// assert!(result.modified_count <= 1);
	/// ```
	async fn update_one(
		&self,
		collection: &str,
		filter: Document,
		update: Document,
	) -> Result<UpdateResult>;

	/// Deletes the first document matching the filter
	///
	/// Returns the number of documents deleted (0 or 1). A filter matching nothing
	/// is not an error.
	async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64>;

	/// Executes an aggregation pipeline
	///
	/// # Example
	///
	/// ```rust,ignore
	/// let results = db.aggregate("books", vec![
	///     doc! { "$group": {
	///         "_id": "$genre",
	///         "averagePrice": { "$avg": "$price" },
	///     }},
	///     doc! { "$sort": { "averagePrice": -1 } },
	/// ]).await?;
	/// ```
	async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> Result<Vec<Document>>;

	/// Builds an index and returns its name
	async fn create_index(&self, collection: &str, index: IndexModel) -> Result<String>;

	/// Enumerates the indexes of a collection, `_id_` included
	async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexModel>>;

	/// Reports execution statistics for `find(filter)`
	async fn explain_find(&self, collection: &str, filter: Document) -> Result<ExplainStats>;

	/// Drops a collection with its indexes; dropping a missing collection succeeds
	async fn drop_collection(&self, collection: &str) -> Result<()>;
}
