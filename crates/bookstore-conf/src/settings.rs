//! Runner settings

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::builder::SettingsBuilder;
use crate::sources::{DefaultSource, EnvSource, OverrideSource, TomlFileSource};

/// Prefix for environment overrides, e.g. `BOOKSTORE_DATABASE`
pub const ENV_PREFIX: &str = "BOOKSTORE_";

/// Config file read when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "bookstore.toml";

/// Settings error
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error(transparent)]
	Source(#[from] crate::sources::SourceError),

	#[error("Invalid settings: {0}")]
	Invalid(String),
}

/// Which document store the runner talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
	#[default]
	Mongodb,
	Memory,
}

impl fmt::Display for BackendKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			BackendKind::Mongodb => write!(f, "mongodb"),
			BackendKind::Memory => write!(f, "memory"),
		}
	}
}

impl FromStr for BackendKind {
	type Err = SettingsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"mongodb" | "mongo" => Ok(BackendKind::Mongodb),
			"memory" | "in-memory" => Ok(BackendKind::Memory),
			other => Err(SettingsError::Invalid(format!(
				"unknown backend '{}', expected 'mongodb' or 'memory'",
				other
			))),
		}
	}
}

/// Connection target and run options
///
/// # Examples
///
/// ```
/// use bookstore_conf::Settings;
///
/// let settings = Settings::default();
/// assert_eq!(settings.mongodb_uri, "mongodb://localhost:27017");
/// assert_eq!(settings.database, "plp_bookstore");
/// assert_eq!(settings.collection, "books");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub mongodb_uri: String,
	pub database: String,
	pub collection: String,
	pub backend: BackendKind,
	/// Pre-load the sample books when the in-memory backend is used
	#[serde(deserialize_with = "lenient_bool")]
	pub seed_memory: bool,
	/// Application name sent in the MongoDB handshake
	pub app_name: Option<String>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			mongodb_uri: "mongodb://localhost:27017".to_string(),
			database: "plp_bookstore".to_string(),
			collection: "books".to_string(),
			backend: BackendKind::Mongodb,
			seed_memory: true,
			app_name: None,
		}
	}
}

/// Accepts a boolean, or a string such as `yes` or `off` from the environment.
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
	match Value::deserialize(deserializer)? {
		Value::Bool(b) => Ok(b),
		Value::String(s) => match s.trim().to_lowercase().as_str() {
			"true" | "yes" | "on" | "1" => Ok(true),
			"false" | "no" | "off" | "0" => Ok(false),
			_ => Err(serde::de::Error::custom(format!(
				"expected a boolean, found '{}'",
				s
			))),
		},
		other => Err(serde::de::Error::custom(format!(
			"expected a boolean, found {}",
			other
		))),
	}
}

impl Settings {
	pub fn builder() -> SettingsBuilder {
		SettingsBuilder::new()
	}

	/// Built-in defaults as a configuration source
	pub fn defaults_source() -> DefaultSource {
		let defaults = Settings::default();
		DefaultSource::new()
			.with_value("mongodb_uri", Value::String(defaults.mongodb_uri))
			.with_value("database", Value::String(defaults.database))
			.with_value("collection", Value::String(defaults.collection))
			.with_value("backend", Value::String(defaults.backend.to_string()))
			.with_value("seed_memory", Value::Bool(defaults.seed_memory))
	}

	/// Assemble settings from defaults, the config file (`path`, or
	/// `bookstore.toml` in the working directory), `BOOKSTORE_*` environment
	/// variables and `overrides`, in increasing priority.
	pub fn load(path: Option<&Path>, overrides: OverrideSource) -> Result<Self, SettingsError> {
		let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
		if !path.exists() && path != Path::new(DEFAULT_CONFIG_FILE) {
			return Err(SettingsError::Invalid(format!(
				"config file {} does not exist",
				path.display()
			)));
		}

		SettingsBuilder::new()
			.add_source(Self::defaults_source())
			.add_source(TomlFileSource::new(path))
			.add_source(EnvSource::new().with_prefix(ENV_PREFIX))
			.add_source(overrides)
			.build()
	}

	/// Reject values the store would refuse anyway.
	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.backend == BackendKind::Mongodb
			&& !(self.mongodb_uri.starts_with("mongodb://")
				|| self.mongodb_uri.starts_with("mongodb+srv://"))
		{
			return Err(SettingsError::Invalid(format!(
				"mongodb_uri must start with mongodb:// or mongodb+srv://, got '{}'",
				self.mongodb_uri
			)));
		}

		const FORBIDDEN_IN_DATABASE: &[char] = &['/', '\\', '.', ' ', '"', '$'];
		if self.database.is_empty() || self.database.contains(FORBIDDEN_IN_DATABASE) {
			return Err(SettingsError::Invalid(format!(
				"invalid database name '{}'",
				self.database
			)));
		}

		if self.collection.is_empty()
			|| self.collection.contains('$')
			|| self.collection.starts_with("system.")
		{
			return Err(SettingsError::Invalid(format!(
				"invalid collection name '{}'",
				self.collection
			)));
		}
		Ok(())
	}
}
