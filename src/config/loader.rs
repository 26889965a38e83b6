//! Configuration loader.
//!
//! Runs the whole pipeline for one call: classify the environment, resolve
//! files, decode and merge them, then bind the merged tree against the target
//! shape. The loader keeps no state between calls; every `load` takes its own
//! view of the options and the environment snapshot.

use super::binder::{BindContext, Bound, EnvPrefix, bind};
use super::environment::{Environment, classify_environment, current_program};
use super::files::{FileResolver, ResolvedFile};
use super::format::decode_file;
use super::merge::merge;
use super::shape::{Configurable, Shape};
use super::value::ValueTree;
use super::vars::{DEBUG_MODE_VAR, ENV_PREFIX_VAR, EnvSnapshot, VERBOSE_MODE_VAR};
use crate::error::{ConfigError, Result};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix for derived variable names when none is configured.
pub const DEFAULT_ENV_PREFIX: &str = "CONFIGBIND";

/// Options controlling a loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Explicit environment name; overrides `CONFIGBIND_ENV`.
    pub environment: Option<String>,
    /// Prefix for derived variable names; `-` disables environment overrides.
    pub env_prefix: Option<String>,
    /// Log loaded files and the final configuration at info level.
    pub debug: bool,
    /// Like `debug`, plus the origin of every field.
    pub verbose: bool,
    /// Reject file keys that match no field.
    pub strict: bool,
    /// Use `stem.example.ext` when a requested file is missing.
    pub example_fallback: bool,
    /// Fail when none of the requested files exist.
    pub require_files: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            environment: None,
            env_prefix: None,
            debug: false,
            verbose: false,
            strict: false,
            example_fallback: true,
            require_files: false,
        }
    }
}

impl LoaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Turn off environment variable overrides entirely.
    pub fn disable_env(self) -> Self {
        self.env_prefix(EnvPrefix::DISABLED_SENTINEL)
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn example_fallback(mut self, enabled: bool) -> Self {
        self.example_fallback = enabled;
        self
    }

    pub fn require_files(mut self, required: bool) -> Self {
        self.require_files = required;
        self
    }
}

/// Decoded and merged sources, before binding.
#[derive(Debug, Clone)]
pub struct MergedSources {
    pub environment: Environment,
    pub files: Vec<ResolvedFile>,
    pub tree: ValueTree,
}

/// A loaded configuration together with how it was produced.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub config: T,
    pub environment: Environment,
    pub files: Vec<ResolvedFile>,
    pub bound: Bound,
}

/// Loads typed configuration from files and environment variables.
///
/// A loader built with [`ConfigLoader::new`] reads the process environment
/// afresh on every call, so variables changed between loads are picked up.
/// [`ConfigLoader::with_snapshot`] pins the variables instead.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    options: LoaderOptions,
    vars: Option<EnvSnapshot>,
    program: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(LoaderOptions::default())
    }
}

impl ConfigLoader {
    /// Create a loader reading the current process environment.
    pub fn new(options: LoaderOptions) -> Self {
        Self {
            options,
            vars: None,
            program: current_program(),
        }
    }

    /// Create a loader reading variables from `vars` instead of the process.
    pub fn with_snapshot(options: LoaderOptions, vars: EnvSnapshot) -> Self {
        Self {
            vars: Some(vars),
            ..Self::new(options)
        }
    }

    /// Override the program path used for test-run detection.
    pub fn with_program(mut self, program: Option<PathBuf>) -> Self {
        self.program = program;
        self
    }

    /// Options as given, before environment toggles are applied.
    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Variables the next call will see.
    pub fn vars(&self) -> Cow<'_, EnvSnapshot> {
        match &self.vars {
            Some(vars) => Cow::Borrowed(vars),
            None => Cow::Owned(EnvSnapshot::capture()),
        }
    }

    /// Options with `CONFIGBIND_DEBUG_MODE` and `CONFIGBIND_VERBOSE_MODE`
    /// from the current variables applied.
    pub fn effective_options(&self) -> LoaderOptions {
        self.options_for(&self.vars())
    }

    fn options_for(&self, vars: &EnvSnapshot) -> LoaderOptions {
        let mut options = self.options.clone();
        if vars.flag(DEBUG_MODE_VAR) {
            options.debug = true;
        }
        if vars.flag(VERBOSE_MODE_VAR) {
            options.verbose = true;
        }
        options
    }

    /// The active environment.
    pub fn environment(&self) -> Environment {
        self.environment_for(&self.vars())
    }

    fn environment_for(&self, vars: &EnvSnapshot) -> Environment {
        classify_environment(
            self.options.environment.as_deref(),
            vars,
            self.program.as_deref(),
        )
    }

    /// Prefix for derived variable names: option, then `CONFIGBIND_ENV_PREFIX`,
    /// then `CONFIGBIND`.
    pub fn env_prefix(&self) -> EnvPrefix {
        self.env_prefix_for(&self.vars())
    }

    fn env_prefix_for(&self, vars: &EnvSnapshot) -> EnvPrefix {
        let prefix = self
            .options
            .env_prefix
            .as_deref()
            .or_else(|| vars.non_empty(ENV_PREFIX_VAR))
            .unwrap_or(DEFAULT_ENV_PREFIX);
        EnvPrefix::parse(prefix)
    }

    /// Files that would be loaded for `requested`, in load order.
    pub fn resolve_files<P: AsRef<Path>>(&self, requested: &[P]) -> Vec<ResolvedFile> {
        FileResolver::new(self.environment())
            .with_example_fallback(self.options.example_fallback)
            .resolve(requested)
    }

    /// Resolve, decode and merge the requested files.
    pub fn merge_files<P: AsRef<Path>>(&self, requested: &[P]) -> Result<MergedSources> {
        let vars = self.vars();
        self.merge_with(&vars, &self.options_for(&vars), requested)
    }

    fn merge_with<P: AsRef<Path>>(
        &self,
        vars: &EnvSnapshot,
        options: &LoaderOptions,
        requested: &[P],
    ) -> Result<MergedSources> {
        let environment = self.environment_for(vars);
        let files = FileResolver::new(environment.clone())
            .with_example_fallback(options.example_fallback)
            .resolve(requested);

        if files.is_empty() && options.require_files && !requested.is_empty() {
            return Err(ConfigError::NoConfigFiles {
                requested: requested.iter().map(|p| p.as_ref().to_path_buf()).collect(),
            });
        }

        let mut trees = Vec::with_capacity(files.len());
        for file in &files {
            if options.debug || options.verbose {
                info!(path = %file.path.display(), source = %file.source, "Loading configuration file");
            } else {
                debug!(path = %file.path.display(), source = %file.source, "Loading configuration file");
            }
            trees.push(decode_file(&file.path)?);
        }

        Ok(MergedSources {
            environment,
            files,
            tree: merge(trees),
        })
    }

    /// Load files and bind them against an explicit shape.
    pub fn load_shape<P: AsRef<Path>>(
        &self,
        shape: &Shape,
        requested: &[P],
    ) -> Result<(MergedSources, Bound)> {
        let vars = self.vars();
        self.load_shape_with(&vars, &self.options_for(&vars), shape, requested)
    }

    fn load_shape_with<P: AsRef<Path>>(
        &self,
        vars: &EnvSnapshot,
        options: &LoaderOptions,
        shape: &Shape,
        requested: &[P],
    ) -> Result<(MergedSources, Bound)> {
        let sources = self.merge_with(vars, options, requested)?;
        let ctx = BindContext::new(vars, self.env_prefix_for(vars)).strict(options.strict);
        let bound = bind(shape, &sources.tree, &ctx)?;

        if options.verbose {
            for (path, origin) in &bound.origins {
                info!(field = %path, origin = %origin, "Resolved configuration field");
            }
        }

        Ok((sources, bound))
    }

    /// Load a typed configuration and report how it was produced.
    ///
    /// The variables are read once per call; every stage sees the same view.
    pub fn load_report<T: Configurable, P: AsRef<Path>>(&self, requested: &[P]) -> Result<Loaded<T>> {
        let vars = self.vars();
        let options = self.options_for(&vars);
        let (sources, bound) = self.load_shape_with(&vars, &options, &T::shape(), requested)?;
        let config: T = bound.deserialize()?;

        if options.debug || options.verbose {
            info!(
                environment = %sources.environment,
                configuration = %bound.tree.to_json(),
                "Configuration loaded"
            );
        } else {
            debug!(
                environment = %sources.environment,
                files = sources.files.len(),
                "Configuration loaded"
            );
        }

        Ok(Loaded {
            config,
            environment: sources.environment,
            files: sources.files,
            bound,
        })
    }

    /// Load a typed configuration from the requested files and the environment.
    ///
    /// On failure nothing is returned; the caller's existing value, if any, is
    /// untouched.
    pub fn load<T: Configurable, P: AsRef<Path>>(&self, requested: &[P]) -> Result<T> {
        self.load_report(requested).map(|loaded| loaded.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::shape::Field;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Db {
        host: String,
        port: u16,
    }

    impl Configurable for Db {
        fn shape() -> Shape {
            Shape::new()
                .field(Field::string("host").default("localhost"))
                .field(Field::unsigned("port").default(5432))
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct App {
        name: String,
        db: Db,
    }

    impl Configurable for App {
        fn shape() -> Shape {
            Shape::new()
                .field(Field::string("name").required())
                .field(Field::nested::<Db>("db"))
        }
    }

    fn loader(vars: EnvSnapshot) -> ConfigLoader {
        ConfigLoader::with_snapshot(LoaderOptions::new().environment("test"), vars)
    }

    #[test]
    fn test_env_prefix_resolution() {
        let l = loader(EnvSnapshot::empty());
        assert_eq!(l.env_prefix(), EnvPrefix::new(DEFAULT_ENV_PREFIX));

        let l = loader(EnvSnapshot::empty().with(ENV_PREFIX_VAR, "SVC"));
        assert_eq!(l.env_prefix(), EnvPrefix::new("SVC"));

        let l = ConfigLoader::with_snapshot(
            LoaderOptions::new().env_prefix("APP"),
            EnvSnapshot::empty().with(ENV_PREFIX_VAR, "SVC"),
        );
        assert_eq!(l.env_prefix(), EnvPrefix::new("APP"));

        let l = ConfigLoader::with_snapshot(LoaderOptions::new().disable_env(), EnvSnapshot::empty());
        assert_eq!(l.env_prefix(), EnvPrefix::Disabled);
    }

    #[test]
    fn test_debug_and_verbose_flags_from_snapshot() {
        let vars = EnvSnapshot::empty()
            .with(DEBUG_MODE_VAR, "1")
            .with(VERBOSE_MODE_VAR, "");
        let l = loader(vars);
        assert!(!l.options().debug);
        assert!(l.effective_options().debug);
        assert!(!l.effective_options().verbose);
    }

    #[test]
    fn test_process_environment_read_per_call() {
        let l = ConfigLoader::new(LoaderOptions::new().environment("test"));
        assert!(matches!(l.vars(), Cow::Owned(_)));

        let pinned = loader(EnvSnapshot::empty());
        assert!(matches!(pinned.vars(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_environment_from_options() {
        let l = loader(EnvSnapshot::empty().with("CONFIGBIND_ENV", "production"));
        assert_eq!(l.environment(), Environment::test());

        let l = ConfigLoader::with_snapshot(
            LoaderOptions::new(),
            EnvSnapshot::empty().with("CONFIGBIND_ENV", "production"),
        );
        assert_eq!(l.environment().as_str(), "production");
    }

    #[test]
    fn test_load_with_env_override_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("app.yml"), "name: svc\ndb:\n  host: a\n").unwrap();
        std::fs::write(temp.path().join("app.test.yml"), "db:\n  port: 6000\n").unwrap();

        let app: App = loader(EnvSnapshot::empty())
            .load(&[temp.path().join("app.yml")])
            .unwrap();
        assert_eq!(
            app,
            App {
                name: "svc".into(),
                db: Db { host: "a".into(), port: 6000 },
            }
        );
    }

    #[test]
    fn test_later_files_override_earlier() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("first.json");
        let second = temp.path().join("second.yaml");
        std::fs::write(&first, r#"{"name": "one", "db": {"host": "h1", "port": 1}}"#).unwrap();
        std::fs::write(&second, "name: two\n").unwrap();

        let report = loader(EnvSnapshot::empty())
            .load_report::<App, _>(&[&first, &second])
            .unwrap();
        assert_eq!(report.config.name, "two");
        assert_eq!(report.config.db.host, "h1");
        assert_eq!(report.files.len(), 2);
    }

    #[test]
    fn test_missing_files_yield_defaults() {
        let temp = TempDir::new().unwrap();
        let vars = EnvSnapshot::empty().with("CONFIGBIND_NAME", "env-name");
        let app: App = loader(vars).load(&[temp.path().join("config.yml")]).unwrap();
        assert_eq!(app.name, "env-name");
        assert_eq!(app.db, Db { host: "localhost".into(), port: 5432 });
    }

    #[test]
    fn test_require_files() {
        let temp = TempDir::new().unwrap();
        let l = ConfigLoader::with_snapshot(
            LoaderOptions::new().environment("test").require_files(true),
            EnvSnapshot::empty(),
        );
        let err = l.merge_files(&[temp.path().join("config.yml")]).unwrap_err();
        assert!(matches!(err, ConfigError::NoConfigFiles { .. }));
    }

    #[test]
    fn test_decode_error_aborts_load() {
        let temp = TempDir::new().unwrap();
        let bad = temp.path().join("bad.yaml");
        std::fs::write(&bad, "name: [unclosed\n").unwrap();
        let err = loader(EnvSnapshot::empty()).load::<App, _>(&[&bad]).unwrap_err();
        assert!(matches!(err, ConfigError::Decode { .. }));
    }

    #[test]
    fn test_unsupported_requested_file_fails() {
        let temp = TempDir::new().unwrap();
        let ini = temp.path().join("config.ini");
        std::fs::write(&ini, "name=x\n").unwrap();
        let err = loader(EnvSnapshot::empty()).load::<App, _>(&[&ini]).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }
}
