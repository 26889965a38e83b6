//! Active environment classification.
//!
//! Precedence: explicit name > `CONFIGBIND_ENV` > test-run detection >
//! `development`.

use super::vars::{ENV_VAR, EnvSnapshot};
use regex_lite::Regex;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

/// Set by cargo-nextest for every test process it spawns.
const NEXTEST_VAR: &str = "NEXTEST_RUN_ID";

/// Named runtime context, such as `development`, `test` or `production`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Environment(String);

impl Environment {
    pub const DEVELOPMENT: &'static str = "development";
    pub const TEST: &'static str = "test";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn development() -> Self {
        Self::new(Self::DEVELOPMENT)
    }

    pub fn test() -> Self {
        Self::new(Self::TEST)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::development()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Environment {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Determine the active environment.
///
/// `program` is the path of the running executable (usually `argv[0]`); it is
/// only used for test-run detection.
pub fn classify_environment(
    explicit: Option<&str>,
    vars: &EnvSnapshot,
    program: Option<&Path>,
) -> Environment {
    if let Some(name) = explicit.filter(|n| !n.is_empty()) {
        return Environment::new(name);
    }

    if let Some(name) = vars.non_empty(ENV_VAR) {
        return Environment::new(name);
    }

    if vars.non_empty(NEXTEST_VAR).is_some() || program.is_some_and(is_test_harness) {
        return Environment::test();
    }

    Environment::development()
}

/// Whether a program path looks like a cargo test harness binary:
/// `target/<profile>/deps/<crate>-<16 hex digits>`.
pub fn is_test_harness(program: &Path) -> bool {
    static HARNESS: OnceLock<Option<Regex>> = OnceLock::new();
    let harness = HARNESS.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+-[0-9a-f]{16}(\.exe)?$").ok());

    let in_deps = program
        .parent()
        .and_then(|p| p.file_name())
        .is_some_and(|d| d == "deps");

    in_deps
        && program
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| harness.as_ref().is_some_and(|re| re.is_match(n)))
}

/// Path of the running executable, as reported by the first argument.
pub(crate) fn current_program() -> Option<std::path::PathBuf> {
    std::env::args_os().next().map(std::path::PathBuf::from)
}
