//! Configuration file resolution.
//!
//! Each requested path expands into the base file followed by its
//! environment-qualified variant (`config.yml` -> `config.production.yml`).
//! Candidates that do not exist are skipped; a missing optional file is
//! expected, not an error.

use super::environment::Environment;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Qualifier used for example files (`config.example.yml`).
pub const EXAMPLE_QUALIFIER: &str = "example";

/// Why a file was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSource {
    /// The requested path itself
    Base,
    /// The environment-qualified variant of a requested path
    Environment,
    /// An example file standing in for a missing requested path
    Example,
}

impl fmt::Display for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSource::Base => write!(f, "base"),
            FileSource::Environment => write!(f, "environment"),
            FileSource::Example => write!(f, "example"),
        }
    }
}

/// A file selected for loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub source: FileSource,
}

/// Expands requested paths into the ordered list of files to load.
#[derive(Debug, Clone)]
pub struct FileResolver {
    environment: Environment,
    example_fallback: bool,
}

impl FileResolver {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            example_fallback: false,
        }
    }

    /// Use `stem.example.ext` when a requested file is missing.
    pub fn with_example_fallback(mut self, enabled: bool) -> Self {
        self.example_fallback = enabled;
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Resolve requested paths, preserving their order.
    pub fn resolve<P: AsRef<Path>>(&self, requested: &[P]) -> Vec<ResolvedFile> {
        let mut files = Vec::new();

        for path in requested {
            let path = path.as_ref();

            if path.is_file() {
                files.push(ResolvedFile {
                    path: path.to_path_buf(),
                    source: FileSource::Base,
                });
            } else if let Some(example) = self.example_for(path) {
                warn!(
                    missing = %path.display(),
                    example = %example.display(),
                    "Configuration file not found, using example file"
                );
                files.push(ResolvedFile {
                    path: example,
                    source: FileSource::Example,
                });
            } else {
                debug!(path = %path.display(), "Skipping missing configuration file");
            }

            let variant = qualified_path(path, self.environment.as_str());
            if variant.is_file() {
                files.push(ResolvedFile {
                    path: variant,
                    source: FileSource::Environment,
                });
            } else {
                debug!(path = %variant.display(), "No environment override file");
            }
        }

        files
    }

    /// Resolve requested paths and return only the file paths.
    pub fn resolve_paths<P: AsRef<Path>>(&self, requested: &[P]) -> Vec<PathBuf> {
        self.resolve(requested)
            .into_iter()
            .map(|file| file.path)
            .collect()
    }

    fn example_for(&self, path: &Path) -> Option<PathBuf> {
        if !self.example_fallback {
            return None;
        }
        let example = qualified_path(path, EXAMPLE_QUALIFIER);
        example.is_file().then_some(example)
    }
}

/// Resolve requested paths for an environment, without example fallback.
pub fn resolve_files<P: AsRef<Path>>(environment: &Environment, requested: &[P]) -> Vec<PathBuf> {
    FileResolver::new(environment.clone()).resolve_paths(requested)
}

/// Insert `qualifier` before the extension: `dir/config.yml` -> `dir/config.<qualifier>.yml`.
///
/// A path without an extension gets `.<qualifier>` appended.
pub fn qualified_path(path: &Path, qualifier: &str) -> PathBuf {
    let Some(stem) = path.file_stem() else {
        return path.to_path_buf();
    };

    let mut name = OsString::from(stem);
    name.push(".");
    name.push(qualifier);
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}
