//! Error types for configuration loading, binding and persistence.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, binding or saving configuration.
///
/// Every variant aborts the enclosing call; nothing is retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration file could not be parsed.
    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// The file extension does not map to a supported format.
    #[error("unsupported configuration format: {path} (expected .yaml, .yml or .json)")]
    UnsupportedFormat { path: PathBuf },

    /// An environment, file or default value cannot be coerced into the field's type.
    #[error("invalid value for {field}: {value:?} is not a valid {expected}")]
    TypeMismatch {
        field: String,
        value: String,
        expected: &'static str,
    },

    /// A required field was not supplied by any source.
    #[error("{field} is required")]
    RequiredFieldMissing { field: String },

    /// A file key matched no field while strict binding was enabled.
    #[error("unknown configuration key: {path}")]
    UnknownKey { path: String },

    /// None of the requested files exist and the loader was told to require them.
    #[error("no configuration files found (requested: {})", display_paths(.requested))]
    NoConfigFiles { requested: Vec<PathBuf> },

    /// The value could not be serialized for persistence.
    #[error("failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// The bound tree does not fit the target type.
    #[error("bound configuration does not match target type: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub fn type_mismatch(field: &str, value: impl Into<String>, expected: &'static str) -> Self {
        Self::TypeMismatch {
            field: field.to_string(),
            value: value.into(),
            expected,
        }
    }

    pub fn required(field: &str) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
        }
    }

    /// Dotted path of the field the error is about, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::TypeMismatch { field, .. } | Self::RequiredFieldMissing { field } => Some(field),
            Self::UnknownKey { path } => Some(path),
            _ => None,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
