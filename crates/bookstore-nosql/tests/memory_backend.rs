//! In-memory Backend Tests
//!
//! Exercises the backend through `dyn DocumentBackend`, the way callers hold it.

use bookstore_nosql::backends::memory::InMemoryBackend;
use bookstore_nosql::traits::{DocumentBackend, NoSQLBackend};
use bookstore_nosql::types::{FindOptions, IndexModel, NoSQLBackendType};
use bookstore_nosql::NoSQLError;
use bson::{Document, doc};
use rstest::*;
use std::sync::Arc;

#[fixture]
async fn books() -> Arc<dyn DocumentBackend> {
	let backend = InMemoryBackend::new("plp_bookstore");
	backend
		.insert_many(
			"books",
			vec![
				doc! { "title": "Pride and Prejudice", "author": "Jane Austen", "genre": "Romance", "published_year": 1813, "price": 7.99, "pages": 432, "in_stock": true },
				doc! { "title": "The Hobbit", "author": "J.R.R. Tolkien", "genre": "Fantasy", "published_year": 1937, "price": 14.99, "pages": 310, "in_stock": true },
				doc! { "title": "Brave New World", "author": "Aldous Huxley", "genre": "Dystopian", "published_year": 1932, "price": 11.50, "pages": 311, "in_stock": false },
				doc! { "title": "The Midnight Library", "author": "Matt Haig", "genre": "Fiction", "published_year": 2020, "price": 15.99, "pages": 304, "in_stock": true },
			],
		)
		.await
		.expect("seed");
	Arc::new(backend)
}

fn titles(docs: &[Document]) -> Vec<&str> {
	docs.iter().map(|d| d.get_str("title").unwrap()).collect()
}

#[rstest]
#[tokio::test]
async fn test_backend_type(#[future] books: Arc<dyn DocumentBackend>) {
	let db = books.await;
	assert_eq!(db.backend_type(), NoSQLBackendType::Memory);
	assert!(db.as_any().downcast_ref::<InMemoryBackend>().is_some());
}

#[rstest]
#[tokio::test]
async fn test_projection_sort_and_pagination(#[future] books: Arc<dyn DocumentBackend>) {
	let db = books.await;

	// Act
	let page = db
		.find_many(
			"books",
			doc! {},
			FindOptions::new()
				.projection(doc! { "title": 1, "price": 1, "_id": 0 })
				.sort(doc! { "price": -1 })
				.skip(1)
				.limit(2),
		)
		.await
		.unwrap();

	// Assert
	assert_eq!(
		page,
		vec![
			doc! { "title": "The Hobbit", "price": 14.99 },
			doc! { "title": "Brave New World", "price": 11.50 },
		]
	);
}

#[rstest]
#[tokio::test]
async fn test_counts(#[future] books: Arc<dyn DocumentBackend>) {
	let db = books.await;

	let long = db
		.count_documents("books", doc! { "pages": { "$gt": 310 } })
		.await
		.unwrap();
	let classics = db
		.count_documents("books", doc! { "published_year": { "$gte": 1800, "$lte": 1950 } })
		.await
		.unwrap();
	let with_the = db
		.count_documents("books", doc! { "title": { "$regex": "the", "$options": "i" } })
		.await
		.unwrap();

	assert_eq!((long, classics, with_the), (2, 3, 2));
}

#[rstest]
#[tokio::test]
async fn test_in_stock_after_2010(#[future] books: Arc<dyn DocumentBackend>) {
	let db = books.await;
	let found = db
		.find_many(
			"books",
			doc! { "in_stock": true, "published_year": { "$gt": 2010 } },
			FindOptions::default(),
		)
		.await
		.unwrap();
	assert_eq!(titles(&found), ["The Midnight Library"]);
}

#[rstest]
#[tokio::test]
async fn test_explain_uses_compound_index(#[future] books: Arc<dyn DocumentBackend>) {
	let db = books.await;
	let name = db
		.create_index(
			"books",
			IndexModel::builder()
				.keys(doc! { "author": 1, "published_year": -1 })
				.build(),
		)
		.await
		.unwrap();

	let stats = db
		.explain_find(
			"books",
			doc! { "author": "Jane Austen", "published_year": { "$lt": 1900 } },
		)
		.await
		.unwrap();

	assert_eq!(name, "author_1_published_year_-1");
	assert_eq!(stats.index_name.as_deref(), Some(name.as_str()));
	assert_eq!(stats.docs_examined, 1);
	assert_eq!(stats.docs_returned, 1);
}

#[rstest]
#[tokio::test]
async fn test_malformed_requests_are_reported(#[future] books: Arc<dyn DocumentBackend>) {
	let db = books.await;

	let filter = db.find_one("books", doc! { "price": { "$near": 10 } }).await;
	let pipeline = db
		.aggregate("books", vec![doc! { "$facet": { "a": [] } }])
		.await;
	let index = db
		.create_index("books", IndexModel::builder().keys(doc! {}).build())
		.await;

	assert!(matches!(filter, Err(NoSQLError::InvalidOperation(_))));
	assert!(matches!(pipeline, Err(NoSQLError::UnsupportedFeature(_))));
	assert!(matches!(index, Err(NoSQLError::InvalidOperation(_))));
}

#[rstest]
#[tokio::test]
async fn test_drop_collection(#[future] books: Arc<dyn DocumentBackend>) {
	let db = books.await;
	db.drop_collection("books").await.unwrap();
	db.drop_collection("books").await.unwrap();
	assert_eq!(db.count_documents("books", doc! {}).await.unwrap(), 0);
}
