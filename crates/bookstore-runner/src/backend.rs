//! Opening a backend from [`Settings`]

use bookstore_conf::{BackendKind, Settings};
use bookstore_nosql::backends::memory::InMemoryBackend;
use bookstore_nosql::{DocumentBackend, NoSQLError};
use std::sync::Arc;

use crate::seed::seed_collection;

/// Open the backend `settings` selects and verify it is reachable.
///
/// The in-memory backend starts empty, or holds the sample books when
/// `seed_memory` is set.
pub async fn connect(settings: &Settings) -> Result<Arc<dyn DocumentBackend>, NoSQLError> {
	match settings.backend {
		BackendKind::Mongodb => connect_mongodb(settings).await,
		BackendKind::Memory => {
			let backend = InMemoryBackend::new(settings.database.clone());
			if settings.seed_memory {
				seed_collection(&backend, &settings.collection, false).await?;
			}
			tracing::info!(database = %settings.database, "using in-memory store");
			Ok(Arc::new(backend))
		}
	}
}

#[cfg(feature = "mongodb")]
async fn connect_mongodb(settings: &Settings) -> Result<Arc<dyn DocumentBackend>, NoSQLError> {
	use bookstore_nosql::NoSQLBackend;
	use bookstore_nosql::backends::mongodb::MongoDBBackend;

	let mut builder = MongoDBBackend::builder()
		.url(settings.mongodb_uri.as_str())
		.database(settings.database.as_str());
	if let Some(app_name) = &settings.app_name {
		builder = builder.app_name(app_name.as_str());
	}

	let backend = builder.build().await?;
	backend.health_check().await?;
	tracing::info!(
		uri = %settings.mongodb_uri,
		database = %settings.database,
		"connected to MongoDB"
	);
	Ok(Arc::new(backend))
}

#[cfg(not(feature = "mongodb"))]
async fn connect_mongodb(_settings: &Settings) -> Result<Arc<dyn DocumentBackend>, NoSQLError> {
	Err(NoSQLError::UnsupportedFeature(
		"built without the `mongodb` feature; use the memory backend".to_string(),
	))
}
