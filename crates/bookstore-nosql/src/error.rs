//! NoSQL error types
//!
//! Every backend reports failures through [`NoSQLError`]. Callers that only care
//! whether the store is reachable can use [`NoSQLError::is_connectivity`].

/// Result type for NoSQL operations
pub type Result<T> = std::result::Result<T, NoSQLError>;

/// Unified error type for document-store operations
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NoSQLError {
	/// The store could not be reached, or the handle was already closed
	#[error("Connection error: {0}")]
	ConnectionError(String),

	/// The store rejected or failed to run a command
	#[error("Execution error: {0}")]
	ExecutionError(String),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Serialization error: {0}")]
	SerializationError(String),

	/// Malformed filter, update, sort or projection document
	#[error("Invalid operation: {0}")]
	InvalidOperation(String),

	#[error("Authentication error: {0}")]
	AuthenticationError(String),

	/// Server-side failure such as a duplicate key
	#[error("Database error: {0}")]
	DatabaseError(String),

	/// Operator or stage the backend does not implement
	#[error("Unsupported feature: {0}")]
	UnsupportedFeature(String),
}

impl NoSQLError {
	/// Whether this error means the store itself is unreachable.
	///
	/// # Examples
	///
	/// ```
	/// use bookstore_nosql::error::NoSQLError;
	///
	/// assert!(NoSQLError::ConnectionError("server selection".into()).is_connectivity());
	/// assert!(!NoSQLError::InvalidOperation("$foo".into()).is_connectivity());
	/// ```
	pub fn is_connectivity(&self) -> bool {
		matches!(
			self,
			NoSQLError::ConnectionError(_) | NoSQLError::AuthenticationError(_)
		)
	}
}

impl From<serde_json::Error> for NoSQLError {
	fn from(err: serde_json::Error) -> Self {
		NoSQLError::SerializationError(err.to_string())
	}
}

impl From<bson::ser::Error> for NoSQLError {
	fn from(err: bson::ser::Error) -> Self {
		NoSQLError::SerializationError(err.to_string())
	}
}

impl From<bson::de::Error> for NoSQLError {
	fn from(err: bson::de::Error) -> Self {
		NoSQLError::SerializationError(err.to_string())
	}
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for NoSQLError {
	fn from(err: mongodb::error::Error) -> Self {
		use mongodb::error::ErrorKind;

		match *err.kind {
			ErrorKind::Authentication { .. } => NoSQLError::AuthenticationError(err.to_string()),
			ErrorKind::InvalidArgument { .. } => NoSQLError::InvalidOperation(err.to_string()),
			ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } | ErrorKind::DnsResolve { .. } => {
				NoSQLError::ConnectionError(err.to_string())
			}
			ErrorKind::Shutdown => NoSQLError::ConnectionError(err.to_string()),
			ErrorKind::Command(_) | ErrorKind::Write(_) => {
				NoSQLError::ExecutionError(err.to_string())
			}
			_ => NoSQLError::DatabaseError(err.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(NoSQLError::ConnectionError("refused".into()), true)]
	#[case(NoSQLError::AuthenticationError("bad password".into()), true)]
	#[case(NoSQLError::ExecutionError("boom".into()), false)]
	#[case(NoSQLError::InvalidOperation("unknown operator: $foo".into()), false)]
	#[case(NoSQLError::UnsupportedFeature("$lookup".into()), false)]
	fn test_connectivity_classification(#[case] err: NoSQLError, #[case] expected: bool) {
		assert_eq!(err.is_connectivity(), expected);
	}

	#[test]
	fn test_display_prefixes() {
		let err = NoSQLError::DatabaseError("E11000 duplicate key".to_string());
		assert_eq!(err.to_string(), "Database error: E11000 duplicate key");
	}
}
