//! Snapshot of process environment variables.
//!
//! The classifier, loader and binder read variables from an [`EnvSnapshot`]
//! instead of calling `std::env::var` at arbitrary depths, so tests can inject
//! their own values without touching the real process environment.

use std::collections::HashMap;

/// Name of the variable selecting the active environment.
pub const ENV_VAR: &str = "CONFIGBIND_ENV";
/// Enables debug output when set to any non-empty value.
pub const DEBUG_MODE_VAR: &str = "CONFIGBIND_DEBUG_MODE";
/// Enables verbose output when set to any non-empty value.
pub const VERBOSE_MODE_VAR: &str = "CONFIGBIND_VERBOSE_MODE";
/// Default prefix for per-field override variables.
pub const ENV_PREFIX_VAR: &str = "CONFIGBIND_ENV_PREFIX";

/// Immutable copy of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid unicode are skipped.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// An empty snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add or replace a variable.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Raw lookup, including empty values.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Lookup that treats empty values as unset.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Whether a toggle variable is set to a non-empty value.
    pub fn flag(&self, key: &str) -> bool {
        self.non_empty(key).is_some()
    }
}

impl<K, V> FromIterator<(K, V)> for EnvSnapshot
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_values_count_as_unset() {
        let vars = EnvSnapshot::from_iter([("A", ""), ("B", "1")]);
        assert_eq!(vars.get("A"), Some(""));
        assert_eq!(vars.non_empty("A"), None);
        assert!(!vars.flag("A"));
        assert!(vars.flag("B"));
        assert!(!vars.flag("C"));
    }

    #[test]
    fn test_with_overrides_existing() {
        let vars = EnvSnapshot::empty().with("X", "1").with("X", "2");
        assert_eq!(vars.get("X"), Some("2"));
    }
}
