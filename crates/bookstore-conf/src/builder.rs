//! Merging configuration sources into [`Settings`]

use indexmap::IndexMap;
use serde_json::Value;

use crate::settings::{Settings, SettingsError};
use crate::sources::ConfigSource;

/// Collects sources and merges them by priority
///
/// Higher-priority sources override lower ones key by key; sources with equal
/// priority apply in the order they were added.
///
/// # Examples
///
/// ```
/// use bookstore_conf::builder::SettingsBuilder;
/// use bookstore_conf::sources::OverrideSource;
/// use bookstore_conf::Settings;
///
/// let settings = SettingsBuilder::new()
///     .add_source(Settings::defaults_source())
///     .add_source(OverrideSource::new().set("collection", "novels"))
///     .build()
///     .unwrap();
///
/// assert_eq!(settings.collection, "novels");
/// assert_eq!(settings.database, "plp_bookstore");
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl SettingsBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a configuration source
	pub fn add_source(mut self, source: impl ConfigSource + 'static) -> Self {
		self.sources.push(Box::new(source));
		self
	}

	/// Merge every source into one key/value map
	pub fn build_merged(&self) -> Result<IndexMap<String, Value>, SettingsError> {
		let mut ordered: Vec<&dyn ConfigSource> = self.sources.iter().map(|s| s.as_ref()).collect();
		ordered.sort_by_key(|s| s.priority());

		let mut merged = IndexMap::new();
		for source in ordered {
			let values = source.load()?;
			tracing::debug!(
				source = %source.description(),
				keys = values.len(),
				"loaded configuration source"
			);
			merged.extend(values);
		}
		Ok(merged)
	}

	/// Merge, deserialize and validate
	pub fn build(self) -> Result<Settings, SettingsError> {
		let merged = self.build_merged()?;
		let object: serde_json::Map<String, Value> = merged.into_iter().collect();
		let settings: Settings = serde_json::from_value(Value::Object(object))
			.map_err(|e| SettingsError::Invalid(e.to_string()))?;
		settings.validate()?;
		Ok(settings)
	}
}
