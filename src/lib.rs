//! Bind YAML/JSON files and environment variables into typed configuration.
//!
//! ```no_run
//! use configbind::config::{Configurable, Field, Shape};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct AppConfig {
//!     name: String,
//!     port: u16,
//! }
//!
//! impl Configurable for AppConfig {
//!     fn shape() -> Shape {
//!         Shape::new()
//!             .field(Field::string("name").required())
//!             .field(Field::unsigned("port").default(8080))
//!     }
//! }
//!
//! // Loads config.yml, then config.<environment>.yml, then applies
//! // CONFIGBIND_NAME / CONFIGBIND_PORT overrides.
//! let config: AppConfig = configbind::load(&["config.yml"])?;
//! # Ok::<(), configbind::ConfigError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;

pub use config::{ConfigLoader, Configurable, Environment, LoaderOptions, persist, save};
pub use error::{ConfigError, Result};

use std::path::Path;

/// The active environment, classified from the process environment.
pub fn environment() -> Environment {
    ConfigLoader::default().environment()
}

/// Load `T` from the given files with default options.
pub fn load<T: Configurable, P: AsRef<Path>>(files: &[P]) -> Result<T> {
    ConfigLoader::default().load(files)
}
