//! Configuration sources for layered settings
//!
//! Sources are merged in priority order
//! (overrides > environment variables > config file > defaults).

use indexmap::IndexMap;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync {
	/// Load configuration from this source
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError>;

	/// Get the priority of this source (higher = more important)
	fn priority(&self) -> u8;

	/// Get a description of this source
	fn description(&self) -> String;
}

/// Error type for configuration sources
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Parse error: {0}")]
	Parse(String),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

/// Environment variable configuration source
///
/// Keys are matched against the prefix, stripped of it and lowercased, so
/// `BOOKSTORE_MONGODB_URI` becomes `mongodb_uri`. Values stay strings; typed
/// fields interpret them when the settings are deserialized.
pub struct EnvSource {
	prefix: Option<String>,
	vars: Option<Vec<(String, String)>>,
}

impl EnvSource {
	/// Create a source reading the process environment
	///
	/// # Examples
	///
	/// ```
	/// use bookstore_conf::sources::EnvSource;
	///
	/// let source = EnvSource::new().with_prefix("BOOKSTORE_");
	/// ```
	pub fn new() -> Self {
		Self {
			prefix: None,
			vars: None,
		}
	}

	/// Set a prefix filter for environment variables
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());
		self
	}

	/// Read from the given pairs instead of the process environment
	///
	/// # Examples
	///
	/// ```
	/// use bookstore_conf::sources::{ConfigSource, EnvSource};
	///
	/// let source = EnvSource::new()
	///     .with_prefix("BOOKSTORE_")
	///     .with_vars([("BOOKSTORE_DATABASE", "staging"), ("HOME", "/root")]);
	/// let config = source.load().unwrap();
	/// assert_eq!(config.len(), 1);
	/// assert_eq!(config["database"], "staging");
	/// ```
	pub fn with_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		self.vars = Some(
			vars.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		);
		self
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for EnvSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		let vars: Box<dyn Iterator<Item = (String, String)>> = match &self.vars {
			Some(vars) => Box::new(vars.iter().cloned()),
			None => Box::new(std::env::vars()),
		};

		let mut config = IndexMap::new();
		for (key, value) in vars {
			let clean_key = match &self.prefix {
				Some(prefix) => match key.strip_prefix(prefix.as_str()) {
					Some(rest) => rest,
					None => continue,
				},
				None => key.as_str(),
			};
			if clean_key.is_empty() {
				continue;
			}
			config.insert(clean_key.to_lowercase(), Value::String(value));
		}

		Ok(config)
	}

	fn priority(&self) -> u8 {
		100
	}

	fn description(&self) -> String {
		match &self.prefix {
			Some(prefix) => format!("Environment variables (prefix: {})", prefix),
			None => "Environment variables".to_string(),
		}
	}
}

/// TOML file configuration source
///
/// A missing file contributes nothing.
pub struct TomlFileSource {
	path: PathBuf,
}

impl TomlFileSource {
	/// Create a new TOML file configuration source
	///
	/// # Examples
	///
	/// ```
	/// use bookstore_conf::sources::TomlFileSource;
	///
	/// let source = TomlFileSource::new("bookstore.toml");
	/// ```
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl ConfigSource for TomlFileSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		if !self.path.exists() {
			tracing::debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(IndexMap::new());
		}

		let content = fs::read_to_string(&self.path)?;
		let toml_value: toml::Value = toml::from_str(&content)?;

		// TOML -> JSON so every source shares one value type
		let json_value = serde_json::to_value(&toml_value)?;
		let map = json_value
			.as_object()
			.ok_or_else(|| SourceError::Parse("Expected table at root".to_string()))?;

		Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
	}

	fn priority(&self) -> u8 {
		50
	}

	fn description(&self) -> String {
		format!("TOML file: {}", self.path.display())
	}
}

/// Default values configuration source
pub struct DefaultSource {
	values: IndexMap<String, Value>,
}

impl DefaultSource {
	/// Create an empty default values source
	///
	/// # Examples
	///
	/// ```
	/// use bookstore_conf::sources::DefaultSource;
	/// use serde_json::Value;
	///
	/// let source = DefaultSource::new()
	///     .with_value("database", Value::String("plp_bookstore".into()))
	///     .with_value("seed_memory", Value::Bool(true));
	/// ```
	pub fn new() -> Self {
		Self {
			values: IndexMap::new(),
		}
	}

	/// Add a default value for a configuration key
	pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
		self.values.insert(key.into(), value);
		self
	}
}

impl Default for DefaultSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for DefaultSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		Ok(self.values.clone())
	}

	fn priority(&self) -> u8 {
		0
	}

	fn description(&self) -> String {
		"Default values".to_string()
	}
}

/// Explicit values that beat every other source, e.g. command-line flags
#[derive(Debug, Clone, Default)]
pub struct OverrideSource {
	values: IndexMap<String, Value>,
}

impl OverrideSource {
	pub fn new() -> Self {
		Self::default()
	}

	/// Set `key` when `value` is present; `None` leaves lower layers in effect.
	pub fn set_opt(mut self, key: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
		if let Some(value) = value {
			self.values.insert(key.into(), value.into());
		}
		self
	}

	pub fn set(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.set_opt(key, Some(value))
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}

impl ConfigSource for OverrideSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		Ok(self.values.clone())
	}

	fn priority(&self) -> u8 {
		200
	}

	fn description(&self) -> String {
		"Explicit overrides".to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::io::Write;
	use tempfile::TempDir;

	#[rstest]
	#[case("007")]
	#[case("2024")]
	#[case("on")]
	#[case("mongodb://db:27017")]
	fn test_env_values_are_kept_verbatim(#[case] raw: &str) {
		let source = EnvSource::new()
			.with_prefix("BOOKSTORE_")
			.with_vars([("BOOKSTORE_DATABASE", raw)]);

		let config = source.load().unwrap();

		assert_eq!(config["database"], Value::String(raw.to_string()));
	}

	#[test]
	fn test_env_source_strips_prefix_and_lowercases() {
		let source = EnvSource::new().with_prefix("BOOKSTORE_").with_vars([
			("BOOKSTORE_MONGODB_URI", "mongodb://db:27017"),
			("BOOKSTORE_SEED_MEMORY", "false"),
			("BOOKSTORE_", "ignored"),
			("PATH", "/usr/bin"),
		]);

		let config = source.load().unwrap();

		assert_eq!(config.len(), 2);
		assert_eq!(
			config.get("mongodb_uri").unwrap(),
			&Value::String("mongodb://db:27017".to_string())
		);
		assert_eq!(
			config.get("seed_memory").unwrap(),
			&Value::String("false".to_string())
		);
	}

	#[test]
	fn test_toml_source() {
		let temp_dir = TempDir::new().unwrap();
		let config_path = temp_dir.path().join("bookstore.toml");

		let mut file = fs::File::create(&config_path).unwrap();
		writeln!(
			file,
			r#"
database = "staging"
seed_memory = false
"#
		)
		.unwrap();

		let config = TomlFileSource::new(&config_path).load().unwrap();

		assert_eq!(
			config.get("database").unwrap(),
			&Value::String("staging".to_string())
		);
		assert_eq!(config.get("seed_memory").unwrap(), &Value::Bool(false));
	}

	#[test]
	fn test_missing_toml_file_is_empty() {
		let temp_dir = TempDir::new().unwrap();
		let source = TomlFileSource::new(temp_dir.path().join("absent.toml"));
		assert!(source.load().unwrap().is_empty());
	}

	#[test]
	fn test_malformed_toml_is_an_error() {
		let temp_dir = TempDir::new().unwrap();
		let config_path = temp_dir.path().join("bookstore.toml");
		fs::write(&config_path, "database = [unterminated").unwrap();

		let err = TomlFileSource::new(&config_path).load().unwrap_err();
		assert!(matches!(err, SourceError::Toml(_)));
	}

	#[test]
	fn test_override_source_skips_unset_values() {
		let source = OverrideSource::new()
			.set_opt("database", Some("cli_db"))
			.set_opt("collection", None::<String>);

		let config = source.load().unwrap();
		assert_eq!(config.len(), 1);
		assert_eq!(config["database"], Value::String("cli_db".to_string()));
	}

	#[test]
	fn test_source_priority() {
		assert_eq!(OverrideSource::new().priority(), 200);
		assert_eq!(EnvSource::new().priority(), 100);
		assert_eq!(TomlFileSource::new("test.toml").priority(), 50);
		assert_eq!(DefaultSource::new().priority(), 0);
	}
}
