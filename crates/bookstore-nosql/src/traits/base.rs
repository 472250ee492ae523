use async_trait::async_trait;

use crate::error::Result;
use crate::types::NoSQLBackendType;

/// Lifecycle operations every backend supports
#[async_trait]
pub trait NoSQLBackend: Send + Sync {
	fn backend_type(&self) -> NoSQLBackendType;

	/// Round-trip to the store; fails with `ConnectionError` when unreachable.
	async fn health_check(&self) -> Result<()>;

	/// Release the underlying connection.
	///
	/// Calls made after `close` fail with `ConnectionError`. Closing twice is a
	/// no-op.
	async fn close(&self) -> Result<()>;

	fn as_any(&self) -> &dyn std::any::Any;
}
