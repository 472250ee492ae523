//! # Bookstore Settings
//!
//! Layered configuration for the bookstore query runner.
//!
//! Values are merged from, in increasing priority:
//!
//! 1. Built-in defaults (`mongodb://localhost:27017`, `plp_bookstore`, `books`)
//! 2. A TOML file (`bookstore.toml` unless another path is given)
//! 3. `BOOKSTORE_*` environment variables
//! 4. Explicit overrides such as command-line flags
//!
//! ## Example config file
//!
//! ```toml
//! mongodb_uri = "mongodb://db.internal:27017"
//! database = "plp_bookstore"
//! collection = "books"
//! backend = "mongodb"
//! app_name = "bookstore"
//! ```

pub mod builder;
pub mod settings;
pub mod sources;

pub use builder::SettingsBuilder;
pub use settings::{BackendKind, DEFAULT_CONFIG_FILE, ENV_PREFIX, Settings, SettingsError};
pub use sources::{ConfigSource, DefaultSource, EnvSource, OverrideSource, SourceError, TomlFileSource};
