//! Untyped value tree produced by the source decoders.
//!
//! Both YAML and JSON documents are normalized into [`ValueTree`] before
//! merging, so the merge engine and binder never see format-specific types.

use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use std::collections::BTreeMap;
use std::fmt;

/// A leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Integer(i64),
    /// Integer above `i64::MAX`; smaller non-negative values are always `Integer`.
    Unsigned(u64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    /// Integer scalar for a `u64`, keeping the `Integer` form whenever it fits.
    pub fn unsigned(value: u64) -> Self {
        i64::try_from(value)
            .map(Scalar::Integer)
            .unwrap_or(Scalar::Unsigned(value))
    }

    /// Human-readable kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Scalar::String(_) => "string",
            Scalar::Integer(_) | Scalar::Unsigned(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::Bool(_) => "bool",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => write!(f, "{}", s),
            Scalar::Integer(i) => write!(f, "{}", i),
            Scalar::Unsigned(u) => write!(f, "{}", u),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Generic decoded configuration value.
///
/// `Null` means "not specified": it is what YAML `~`, empty YAML values and
/// JSON `null` decode to, and the merge engine never lets it override data.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ValueTree {
    #[default]
    Null,
    Scalar(Scalar),
    Sequence(Vec<ValueTree>),
    Mapping(BTreeMap<String, ValueTree>),
}

impl ValueTree {
    /// An empty mapping, the starting point of every merge.
    pub fn empty() -> Self {
        ValueTree::Mapping(BTreeMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ValueTree::Null)
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, ValueTree>> {
        match self {
            ValueTree::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            ValueTree::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a key in a mapping, preferring an exact match and falling back
    /// to an ASCII case-insensitive one.
    ///
    /// Returns the key as stored together with its value.
    pub fn lookup(&self, key: &str) -> Option<(&str, &ValueTree)> {
        let map = self.as_mapping()?;
        if let Some((k, v)) = map.get_key_value(key) {
            return Some((k.as_str(), v));
        }
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Follow a dotted path (`db.host`) through nested mappings.
    pub fn pointer(&self, path: &str) -> Option<&ValueTree> {
        path.split('.')
            .try_fold(self, |node, segment| node.as_mapping()?.get(segment))
    }

    /// Human-readable kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ValueTree::Null => "null",
            ValueTree::Scalar(s) => s.kind_name(),
            ValueTree::Sequence(_) => "sequence",
            ValueTree::Mapping(_) => "mapping",
        }
    }

    /// Convert into a `serde_json::Value` for deserialization into typed structs.
    pub fn to_json(&self) -> JsonValue {
        match self {
            ValueTree::Null => JsonValue::Null,
            ValueTree::Scalar(Scalar::String(s)) => JsonValue::String(s.clone()),
            ValueTree::Scalar(Scalar::Integer(i)) => JsonValue::from(*i),
            ValueTree::Scalar(Scalar::Unsigned(u)) => JsonValue::from(*u),
            ValueTree::Scalar(Scalar::Float(x)) => serde_json::Number::from_f64(*x)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            ValueTree::Scalar(Scalar::Bool(b)) => JsonValue::Bool(*b),
            ValueTree::Sequence(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
            ValueTree::Mapping(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Short single-line rendering used in error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            ValueTree::Scalar(s) => s.to_string(),
            other => other.to_json().to_string(),
        }
    }
}

impl From<JsonValue> for ValueTree {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => ValueTree::Null,
            JsonValue::Bool(b) => ValueTree::Scalar(Scalar::Bool(b)),
            JsonValue::Number(n) => ValueTree::Scalar(number_scalar(n.as_i64(), n.as_u64(), n.as_f64())),
            JsonValue::String(s) => ValueTree::Scalar(Scalar::String(s)),
            JsonValue::Array(items) => {
                ValueTree::Sequence(items.into_iter().map(ValueTree::from).collect())
            }
            JsonValue::Object(map) => ValueTree::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, ValueTree::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<YamlValue> for ValueTree {
    fn from(value: YamlValue) -> Self {
        match value {
            YamlValue::Null => ValueTree::Null,
            YamlValue::Bool(b) => ValueTree::Scalar(Scalar::Bool(b)),
            YamlValue::Number(n) => ValueTree::Scalar(number_scalar(n.as_i64(), n.as_u64(), n.as_f64())),
            YamlValue::String(s) => ValueTree::Scalar(Scalar::String(s)),
            YamlValue::Sequence(items) => {
                ValueTree::Sequence(items.into_iter().map(ValueTree::from).collect())
            }
            YamlValue::Mapping(map) => ValueTree::Mapping(
                map.into_iter()
                    .map(|(k, v)| (yaml_key(&k), ValueTree::from(v)))
                    .collect(),
            ),
            YamlValue::Tagged(tagged) => ValueTree::from(tagged.value),
        }
    }
}

fn number_scalar(int: Option<i64>, unsigned: Option<u64>, float: Option<f64>) -> Scalar {
    match (int, unsigned) {
        (Some(i), _) => Scalar::Integer(i),
        (None, Some(u)) => Scalar::Unsigned(u),
        (None, None) => Scalar::Float(float.unwrap_or(f64::NAN)),
    }
}

/// Mapping keys are always strings in a `ValueTree`.
fn yaml_key(key: &YamlValue) -> String {
    match key {
        YamlValue::String(s) => s.clone(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

impl From<Scalar> for ValueTree {
    fn from(value: Scalar) -> Self {
        ValueTree::Scalar(value)
    }
}

impl From<&str> for ValueTree {
    fn from(value: &str) -> Self {
        ValueTree::Scalar(Scalar::String(value.to_string()))
    }
}

impl From<String> for ValueTree {
    fn from(value: String) -> Self {
        ValueTree::Scalar(Scalar::String(value))
    }
}

impl From<bool> for ValueTree {
    fn from(value: bool) -> Self {
        ValueTree::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for ValueTree {
    fn from(value: i64) -> Self {
        ValueTree::Scalar(Scalar::Integer(value))
    }
}

impl From<i32> for ValueTree {
    fn from(value: i32) -> Self {
        ValueTree::Scalar(Scalar::Integer(value.into()))
    }
}

impl From<u32> for ValueTree {
    fn from(value: u32) -> Self {
        ValueTree::Scalar(Scalar::Integer(value.into()))
    }
}

impl From<u16> for ValueTree {
    fn from(value: u16) -> Self {
        ValueTree::Scalar(Scalar::Integer(value.into()))
    }
}

impl From<u64> for ValueTree {
    fn from(value: u64) -> Self {
        ValueTree::Scalar(Scalar::unsigned(value))
    }
}

impl From<f64> for ValueTree {
    fn from(value: f64) -> Self {
        ValueTree::Scalar(Scalar::Float(value))
    }
}

impl<T: Into<ValueTree>> From<Vec<T>> for ValueTree {
    fn from(items: Vec<T>) -> Self {
        ValueTree::Sequence(items.into_iter().map(Into::into).collect())
    }
}
