//! MongoDB connection and backend implementation
//!
//! This module provides the MongoDB database backend that implements
//! the `DocumentBackend` and `NoSQLBackend` traits.
//!
//! # Example
//!
//! ```rust,no_run
//! use bookstore_nosql::backends::mongodb::MongoDBBackend;
//! use bookstore_nosql::traits::DocumentBackend;
//! use bson::doc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = MongoDBBackend::builder()
//!     .url("mongodb://localhost:27017")
//!     .database("plp_bookstore")
//!     .build()
//!     .await?;
//!
//! let fiction = backend
//!     .find_many("books", doc! { "genre": "Fiction" }, Default::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::stream::TryStreamExt;
use mongodb::{Client, Collection, Database};
use std::sync::atomic::{AtomicBool, Ordering};

use super::explain::parse_execution_stats;
use crate::error::{NoSQLError, Result};
use crate::traits::{DocumentBackend, NoSQLBackend};
use crate::types::{ExplainStats, FindOptions, IndexModel, NoSQLBackendType, UpdateResult};

/// MongoDB backend implementation
///
/// Holds one driver client bound to one database. The handle is exclusively
/// owned by its creator and released with [`NoSQLBackend::close`].
pub struct MongoDBBackend {
	client: Client,
	database_name: String,
	closed: AtomicBool,
}

/// Builder for configuring MongoDB connections
///
/// # Example
///
/// ```rust,no_run
/// use bookstore_nosql::backends::mongodb::MongoDBBackendBuilder;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MongoDBBackendBuilder::new()
///     .url("mongodb://localhost:27017")
///     .database("plp_bookstore")
///     .app_name("bookstore")
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct MongoDBBackendBuilder {
	url: String,
	database: String,
	app_name: Option<String>,
	client: Option<Client>,
}

impl Default for MongoDBBackendBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl MongoDBBackendBuilder {
	/// Create a new builder pointing at a local server and the `test` database
	pub fn new() -> Self {
		Self {
			url: "mongodb://localhost:27017".to_string(),
			database: "test".to_string(),
			app_name: None,
			client: None,
		}
	}

	/// Set the MongoDB connection URL
	pub fn url(mut self, url: impl Into<String>) -> Self {
		self.url = url.into();
		self
	}

	/// Set the database name
	pub fn database(mut self, database: impl Into<String>) -> Self {
		self.database = database.into();
		self
	}

	/// Application name reported to the server in the connection handshake
	pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
		self.app_name = Some(app_name.into());
		self
	}

	/// Reuse an already constructed driver client instead of parsing `url`
	pub fn client(mut self, client: Client) -> Self {
		self.client = Some(client);
		self
	}

	/// Build the MongoDB backend
	///
	/// The driver connects lazily, so a successful build says nothing about
	/// reachability; use [`MongoDBBackend::connect`] for a verified handle.
	pub async fn build(self) -> Result<MongoDBBackend> {
		use mongodb::options::ClientOptions;

		let client = match self.client {
			Some(client) => client,
			None => {
				let mut options = ClientOptions::parse(&self.url)
					.await
					.map_err(|e| NoSQLError::ConnectionError(e.to_string()))?;

				if let Some(app_name) = self.app_name {
					options.app_name = Some(app_name);
				}

				Client::with_options(options)
					.map_err(|e| NoSQLError::ConnectionError(e.to_string()))?
			}
		};

		Ok(MongoDBBackend {
			client,
			database_name: self.database,
			closed: AtomicBool::new(false),
		})
	}
}

impl MongoDBBackend {
	/// Create a builder for configuring the MongoDB connection
	pub fn builder() -> MongoDBBackendBuilder {
		MongoDBBackendBuilder::new()
	}

	/// Build a backend for `url`/`database` and ping the server.
	///
	/// Fails with `ConnectionError` when the server cannot be reached.
	pub async fn connect(url: &str, database: &str) -> Result<Self> {
		let backend = Self::builder().url(url).database(database).build().await?;
		backend.health_check().await?;
		tracing::info!(database, "connected to MongoDB");
		Ok(backend)
	}

	/// Name of the database this backend addresses
	pub fn database_name(&self) -> &str {
		&self.database_name
	}

	/// Get the MongoDB database instance
	pub fn database(&self) -> Database {
		self.client.database(&self.database_name)
	}

	fn collection(&self, name: &str) -> Result<Collection<Document>> {
		self.ensure_open()?;
		Ok(self.database().collection::<Document>(name))
	}

	fn ensure_open(&self) -> Result<()> {
		if self.closed.load(Ordering::Acquire) {
			return Err(NoSQLError::ConnectionError(
				"MongoDB client has been closed".to_string(),
			));
		}
		Ok(())
	}
}

fn render_id(id: Bson) -> String {
	match id {
		Bson::ObjectId(oid) => oid.to_hex(),
		Bson::String(s) => s,
		other => other.to_string(),
	}
}

#[async_trait]
impl NoSQLBackend for MongoDBBackend {
	fn backend_type(&self) -> NoSQLBackendType {
		NoSQLBackendType::MongoDB
	}

	async fn health_check(&self) -> Result<()> {
		self.ensure_open()?;
		self.database()
			.run_command(doc! { "ping": 1 })
			.await
			.map_err(|e| NoSQLError::ConnectionError(format!("Health check failed: {}", e)))?;
		Ok(())
	}

	async fn close(&self) -> Result<()> {
		if self.closed.swap(true, Ordering::AcqRel) {
			return Ok(());
		}
		self.client.clone().shutdown().await;
		tracing::info!(database = %self.database_name, "MongoDB client shut down");
		Ok(())
	}

	fn as_any(&self) -> &dyn std::any::Any {
		self
	}
}

#[async_trait]
impl DocumentBackend for MongoDBBackend {
	async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>> {
		let coll = self.collection(collection)?;
		Ok(coll.find_one(filter).await?)
	}

	async fn find_many(
		&self,
		collection: &str,
		filter: Document,
		options: FindOptions,
	) -> Result<Vec<Document>> {
		let coll = self.collection(collection)?;

		let mut mongo_options = mongodb::options::FindOptions::default();
		mongo_options.limit = options.limit;
		mongo_options.skip = options.skip;
		mongo_options.sort = options.sort;
		mongo_options.projection = options.projection;

		let cursor = coll.find(filter).with_options(mongo_options).await?;
		Ok(cursor.try_collect().await?)
	}

	async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64> {
		let coll = self.collection(collection)?;
		Ok(coll.count_documents(filter).await?)
	}

	async fn insert_one(&self, collection: &str, document: Document) -> Result<String> {
		let coll = self.collection(collection)?;
		let result = coll.insert_one(document).await?;
		Ok(render_id(result.inserted_id))
	}

	async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<Vec<String>> {
		if documents.is_empty() {
			return Ok(Vec::new());
		}
		let coll = self.collection(collection)?;
		let result = coll.insert_many(documents).await?;

		// inserted_ids is keyed by input position
		let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
		ids.sort_by_key(|(position, _)| *position);
		Ok(ids.into_iter().map(|(_, id)| render_id(id)).collect())
	}

	async fn update_one(
		&self,
		collection: &str,
		filter: Document,
		update: Document,
	) -> Result<UpdateResult> {
		let coll = self.collection(collection)?;
		let result = coll.update_one(filter, update).await?;

		Ok(UpdateResult::new(result.matched_count, result.modified_count))
	}

	async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64> {
		let coll = self.collection(collection)?;
		let result = coll.delete_one(filter).await?;
		Ok(result.deleted_count)
	}

	async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> Result<Vec<Document>> {
		let coll = self.collection(collection)?;
		let cursor = coll.aggregate(pipeline).await?;
		Ok(cursor.try_collect().await?)
	}

	async fn create_index(&self, collection: &str, index: IndexModel) -> Result<String> {
		index.validate()?;
		let coll = self.collection(collection)?;

		let options = mongodb::options::IndexOptions::builder()
			.name(index.name.clone())
			.unique(index.unique.then_some(true))
			.build();
		let model = mongodb::IndexModel::builder()
			.keys(index.keys)
			.options(options)
			.build();

		let result = coll.create_index(model).await?;
		Ok(result.index_name)
	}

	async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexModel>> {
		let coll = self.collection(collection)?;
		let models: Vec<mongodb::IndexModel> = coll.list_indexes().await?.try_collect().await?;

		Ok(models
			.into_iter()
			.map(|model| {
				let (name, unique) = model
					.options
					.map(|o| (o.name, o.unique.unwrap_or(false)))
					.unwrap_or((None, false));
				IndexModel {
					keys: model.keys,
					name,
					unique,
				}
			})
			.collect())
	}

	async fn explain_find(&self, collection: &str, filter: Document) -> Result<ExplainStats> {
		self.ensure_open()?;
		let command = doc! {
			"explain": { "find": collection, "filter": filter },
			"verbosity": "executionStats",
		};
		let response = self.database().run_command(command).await?;
		parse_execution_stats(&response)
	}

	async fn drop_collection(&self, collection: &str) -> Result<()> {
		let coll = self.collection(collection)?;
		coll.drop().await?;
		Ok(())
	}
}
