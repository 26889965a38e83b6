//! Source decoders and encoders.
//!
//! The format is chosen purely by file extension: `.yaml`/`.yml` map to YAML,
//! `.json` to JSON. Anything else is rejected before the file is touched.

use super::value::ValueTree;
use crate::error::{ConfigError, Result};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// Select a format from a path's extension (ASCII case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            Some("json") => Ok(Format::Json),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Parse raw bytes into a value tree.
    ///
    /// Empty or whitespace-only input decodes to `Null`. The error string is
    /// the underlying parser's message.
    pub fn decode(self, bytes: &[u8]) -> std::result::Result<ValueTree, String> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(ValueTree::Null);
        }

        match self {
            Format::Yaml => {
                let mut value: serde_yaml::Value =
                    serde_yaml::from_slice(bytes).map_err(|e| e.to_string())?;
                value.apply_merge().map_err(|e| e.to_string())?;
                Ok(ValueTree::from(value))
            }
            Format::Json => serde_json::from_slice::<serde_json::Value>(bytes)
                .map(ValueTree::from)
                .map_err(|e| e.to_string()),
        }
    }

    /// Serialize a value in this format.
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> std::result::Result<String, String> {
        match self {
            Format::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
            Format::Json => serde_json::to_string_pretty(value)
                .map(|mut s| {
                    s.push('\n');
                    s
                })
                .map_err(|e| e.to_string()),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Yaml => write!(f, "yaml"),
            Format::Json => write!(f, "json"),
        }
    }
}

/// Decode bytes read from `path`, attributing parse failures to that path.
pub fn decode(bytes: &[u8], path: &Path) -> Result<ValueTree> {
    let format = Format::from_path(path)?;
    format.decode(bytes).map_err(|message| ConfigError::Decode {
        path: path.to_path_buf(),
        message,
    })
}

/// Read and decode a configuration file.
pub fn decode_file(path: &Path) -> Result<ValueTree> {
    // Reject the extension before touching the filesystem.
    Format::from_path(path)?;
    let bytes = std::fs::read(path)?;
    decode(&bytes, path)
}
