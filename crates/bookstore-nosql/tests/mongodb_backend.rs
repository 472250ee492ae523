//! MongoDB Backend Tests
//!
//! Runs the document operations against a real server in a container.

#![cfg(feature = "mongodb")]

use bookstore_nosql::backends::mongodb::MongoDBBackend;
use bookstore_nosql::traits::{DocumentBackend, NoSQLBackend};
use bookstore_nosql::types::{FindOptions, IndexModel};
use bson::doc;
use rstest::*;
use testcontainers::{
	ContainerAsync, GenericImage, ImageExt,
	core::{IntoContainerPort, WaitFor},
	runners::AsyncRunner,
};

const COLLECTION: &str = "books";

async fn try_start_mongodb_container()
-> Result<(ContainerAsync<GenericImage>, String), Box<dyn std::error::Error>> {
	let mongo = GenericImage::new("mongo", "7.0")
		.with_exposed_port(27017.tcp())
		.with_wait_for(WaitFor::message_on_stdout("Waiting for connections"))
		.with_startup_timeout(std::time::Duration::from_secs(60))
		.start()
		.await?;

	let port = mongo.get_host_port_ipv4(27017).await?;
	Ok((mongo, format!("mongodb://127.0.0.1:{}", port)))
}

/// MongoDB backend fixture
///
/// Starts a MongoDB 7.0 container and connects a backend to `plp_bookstore`.
#[fixture]
async fn mongodb() -> (ContainerAsync<GenericImage>, MongoDBBackend) {
	let (container, url) = try_start_mongodb_container()
		.await
		.expect("Failed to start MongoDB container");

	let backend = MongoDBBackend::connect(&url, "plp_bookstore")
		.await
		.expect("Failed to connect to MongoDB");
	backend
		.insert_many(
			COLLECTION,
			vec![
				doc! { "title": "1984", "author": "George Orwell", "published_year": 1949, "price": 10.0 },
				doc! { "title": "Animal Farm", "author": "George Orwell", "published_year": 1945, "price": 8.5 },
				doc! { "title": "The Road", "author": "Cormac McCarthy", "published_year": 2006, "price": 13.49 },
			],
		)
		.await
		.expect("Failed to seed books");

	(container, backend)
}

#[rstest]
#[tokio::test]
#[ignore = "Requires Docker for MongoDB testcontainer"]
async fn test_find_update_delete(
	#[future] mongodb: (ContainerAsync<GenericImage>, MongoDBBackend),
) {
	let (_container, db) = mongodb.await;

	// Act
	let orwell = db
		.find_many(
			COLLECTION,
			doc! { "author": "George Orwell" },
			FindOptions::new().sort(doc! { "price": 1 }),
		)
		.await
		.unwrap();
	let updated = db
		.update_one(COLLECTION, doc! { "title": "1984" }, doc! { "$set": { "price": 13.99 } })
		.await
		.unwrap();
	let deleted = db
		.delete_one(COLLECTION, doc! { "title": "Test Book" })
		.await
		.unwrap();

	// Assert
	let titles: Vec<&str> = orwell.iter().map(|d| d.get_str("title").unwrap()).collect();
	assert_eq!(titles, ["Animal Farm", "1984"]);
	assert_eq!(updated.modified_count, 1);
	assert_eq!(deleted, 0);

	db.close().await.unwrap();
}

#[rstest]
#[tokio::test]
#[ignore = "Requires Docker for MongoDB testcontainer"]
async fn test_index_and_explain(
	#[future] mongodb: (ContainerAsync<GenericImage>, MongoDBBackend),
) {
	let (_container, db) = mongodb.await;

	let name = db
		.create_index(COLLECTION, IndexModel::builder().keys(doc! { "title": 1 }).build())
		.await
		.unwrap();
	assert_eq!(name, "title_1");

	let stats = db
		.explain_find(COLLECTION, doc! { "title": "1984" })
		.await
		.unwrap();
	assert_eq!(stats.docs_returned, 1);
	assert_eq!(stats.docs_examined, 1);
	assert_eq!(stats.index_name.as_deref(), Some("title_1"));

	let names: Vec<String> = db
		.list_indexes(COLLECTION)
		.await
		.unwrap()
		.iter()
		.map(IndexModel::effective_name)
		.collect();
	assert!(names.contains(&"_id_".to_string()));
	assert!(names.contains(&"title_1".to_string()));

	db.close().await.unwrap();
}

#[rstest]
#[tokio::test]
#[ignore = "Requires Docker for MongoDB testcontainer"]
async fn test_aggregation_pipeline(
	#[future] mongodb: (ContainerAsync<GenericImage>, MongoDBBackend),
) {
	let (_container, db) = mongodb.await;

	let results = db
		.aggregate(
			COLLECTION,
			vec![
				doc! { "$group": { "_id": "$author", "bookCount": { "$sum": 1 } } },
				doc! { "$sort": { "bookCount": -1 } },
				doc! { "$limit": 1 },
			],
		)
		.await
		.unwrap();

	assert_eq!(results, vec![doc! { "_id": "George Orwell", "bookCount": 2 }]);

	db.close().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_server_is_a_connectivity_error() {
	// nothing listens on port 1
	let result = MongoDBBackend::builder()
		.url("mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200")
		.database("plp_bookstore")
		.build()
		.await
		.unwrap()
		.health_check()
		.await;

	let err = result.unwrap_err();
	assert!(err.is_connectivity(), "{:?}", err);
}
