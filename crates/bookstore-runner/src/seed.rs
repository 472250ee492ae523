//! Loading the sample books into a collection

use bookstore_nosql::{DocumentBackend, NoSQLError};

use crate::fixtures::sample_documents;

/// Insert the sample books into `collection`
///
/// With `reset`, the collection (and its indexes) is dropped first. Returns
/// the number of documents inserted.
pub async fn seed_collection(
	backend: &dyn DocumentBackend,
	collection: &str,
	reset: bool,
) -> Result<usize, NoSQLError> {
	if reset {
		backend.drop_collection(collection).await?;
		tracing::info!(collection, "dropped collection");
	}

	let ids = backend
		.insert_many(collection, sample_documents()?)
		.await?;
	tracing::info!(collection, inserted = ids.len(), "seeded sample books");
	Ok(ids.len())
}

#[cfg(test)]
mod tests {
	use super::*;
	use bookstore_nosql::backends::memory::InMemoryBackend;
	use bson::doc;

	#[tokio::test]
	async fn test_seed_twice_without_reset_duplicates() {
		let backend = InMemoryBackend::new("plp_bookstore");

		assert_eq!(seed_collection(&backend, "books", false).await.unwrap(), 10);
		assert_eq!(seed_collection(&backend, "books", false).await.unwrap(), 10);

		let count = backend.count_documents("books", doc! {}).await.unwrap();
		assert_eq!(count, 20);
	}

	#[tokio::test]
	async fn test_seed_with_reset_replaces() {
		let backend = InMemoryBackend::new("plp_bookstore");
		backend
			.insert_one("books", doc! { "title": "Test Book" })
			.await
			.unwrap();

		seed_collection(&backend, "books", true).await.unwrap();

		assert_eq!(backend.count_documents("books", doc! {}).await.unwrap(), 10);
		assert_eq!(
			backend
				.count_documents("books", doc! { "title": "Test Book" })
				.await
				.unwrap(),
			0
		);
	}
}
