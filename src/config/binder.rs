//! Shape-driven resolution of field values.
//!
//! For each field, in declaration order, the binder picks the first source
//! that supplies a value:
//!
//! 1. **Environment variable** (scalar fields only): the field's explicit
//!    `env` directive, or `PREFIX_PARENT_FIELD` in SHOUTY_SNAKE_CASE.
//!    Empty variables count as unset.
//! 2. **File value**: the merged tree's key for the field (exact match, then
//!    ASCII case-insensitive). `null` counts as absent.
//! 3. **Default** directive.
//! 4. **Zero value** of the field's kind (`null` for optional fields).
//!
//! Nested records are walked depth-first with their own variable prefix.
//! Sequences and mappings bind element-wise from the file or default value
//! and are never overridden from the environment.
//!
//! A required field passes when any of the first three sources supplied it,
//! whatever the resulting value; a record counts as supplied when any of its
//! fields was. The first violation aborts the whole bind.

use super::shape::{Configurable, Field, FieldKind, ScalarKind, Shape};
use super::value::{Scalar, ValueTree};
use super::vars::EnvSnapshot;
use crate::error::{ConfigError, Result};
use heck::ToShoutySnakeCase;
use std::collections::BTreeMap;
use std::fmt;

/// Field path used in errors about the document root.
const ROOT_PATH: &str = "(root)";

/// Prefix for derived environment variable names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvPrefix {
    /// No field is read from the environment.
    Disabled,
    /// Derived names start with this segment; empty means no leading segment.
    Prefix(String),
}

impl EnvPrefix {
    /// Prefix string that disables environment overrides.
    pub const DISABLED_SENTINEL: &'static str = "-";

    pub fn new(prefix: impl Into<String>) -> Self {
        EnvPrefix::Prefix(prefix.into())
    }

    /// Parse a configured prefix, mapping the `-` sentinel to `Disabled`.
    pub fn parse(prefix: &str) -> Self {
        if prefix == Self::DISABLED_SENTINEL {
            EnvPrefix::Disabled
        } else {
            EnvPrefix::new(prefix)
        }
    }

    fn root_segments(&self) -> Option<Vec<String>> {
        match self {
            EnvPrefix::Disabled => None,
            EnvPrefix::Prefix(p) if p.is_empty() => Some(Vec::new()),
            EnvPrefix::Prefix(p) => Some(vec![p.clone()]),
        }
    }
}

/// Where a bound value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// The named environment variable
    Env(String),
    File,
    Default,
    Zero,
}

impl Origin {
    pub fn is_supplied(&self) -> bool {
        !matches!(self, Origin::Zero)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Env(var) => write!(f, "env {}", var),
            Origin::File => write!(f, "file"),
            Origin::Default => write!(f, "default"),
            Origin::Zero => write!(f, "zero"),
        }
    }
}

/// Inputs shared by every field resolution of one bind.
#[derive(Debug, Clone)]
pub struct BindContext<'a> {
    vars: &'a EnvSnapshot,
    prefix: EnvPrefix,
    strict: bool,
}

impl<'a> BindContext<'a> {
    pub fn new(vars: &'a EnvSnapshot, prefix: EnvPrefix) -> Self {
        Self {
            vars,
            prefix,
            strict: false,
        }
    }

    /// Reject file keys that match no field.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn prefix(&self) -> &EnvPrefix {
        &self.prefix
    }
}

/// Result of a successful bind.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    /// Fully resolved tree, keyed by field name.
    pub tree: ValueTree,
    /// Origin of every resolved field, keyed by dotted path.
    pub origins: BTreeMap<String, Origin>,
}

impl Bound {
    /// Deserialize the resolved tree into its target type.
    pub fn deserialize<T: Configurable>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.tree.to_json())?)
    }

    pub fn origin(&self, path: &str) -> Option<&Origin> {
        self.origins.get(path)
    }
}

/// Resolve every field of `shape` against the merged tree and the environment.
pub fn bind(shape: &Shape, merged: &ValueTree, ctx: &BindContext<'_>) -> Result<Bound> {
    let mut binder = Binder {
        ctx,
        origins: BTreeMap::new(),
    };
    let (tree, _) = binder.record(shape, Some(merged), &Origin::File, "", ctx.prefix.root_segments())?;
    Ok(Bound {
        tree,
        origins: binder.origins,
    })
}

/// Bind and deserialize in one step.
pub fn bind_into<T: Configurable>(merged: &ValueTree, ctx: &BindContext<'_>) -> Result<T> {
    bind(&T::shape(), merged, ctx)?.deserialize()
}

struct Binder<'c, 'a> {
    ctx: &'c BindContext<'a>,
    origins: BTreeMap<String, Origin>,
}

impl Binder<'_, '_> {
    /// Bind a record. `node` is the sub-tree at this position and `source`
    /// the origin attributed to values taken from it. `env_path` holds the
    /// variable name segments so far, or `None` when overrides are off.
    ///
    /// Returns the bound mapping and whether any field was supplied.
    fn record(
        &mut self,
        shape: &Shape,
        node: Option<&ValueTree>,
        source: &Origin,
        path: &str,
        env_path: Option<Vec<String>>,
    ) -> Result<(ValueTree, bool)> {
        let node = match node {
            None | Some(ValueTree::Null) => None,
            Some(tree @ ValueTree::Mapping(_)) => Some(tree),
            Some(other) => {
                let field = if path.is_empty() { ROOT_PATH } else { path };
                return Err(ConfigError::type_mismatch(field, other.describe(), "mapping"));
            }
        };

        if self.ctx.strict
            && let Some(map) = node.and_then(ValueTree::as_mapping)
        {
            for key in map.keys() {
                let known = shape
                    .fields()
                    .iter()
                    .any(|f| f.file_key().eq_ignore_ascii_case(key));
                if !known {
                    return Err(ConfigError::UnknownKey {
                        path: join_path(path, key),
                    });
                }
            }
        }

        let mut bound = BTreeMap::new();
        let mut supplied = Vec::with_capacity(shape.len());
        for field in shape.fields() {
            let field_path = join_path(path, field.name());
            let file_value = node
                .and_then(|n| n.lookup(field.file_key()))
                .map(|(_, v)| v)
                .filter(|v| !v.is_null());
            let field_env = env_path.as_ref().map(|segments| {
                let mut segments = segments.clone();
                segments.push(field.name().to_string());
                segments
            });

            let (value, was_supplied) =
                self.field(field, file_value, source, &field_path, field_env)?;
            bound.insert(field.name().to_string(), value);
            supplied.push(was_supplied);
        }

        if let Some(missing) = shape
            .fields()
            .iter()
            .zip(&supplied)
            .find(|(field, supplied)| field.is_required() && !**supplied)
            .map(|(field, _)| field)
        {
            return Err(ConfigError::required(&join_path(path, missing.name())));
        }

        Ok((ValueTree::Mapping(bound), supplied.contains(&true)))
    }

    fn field(
        &mut self,
        field: &Field,
        file_value: Option<&ValueTree>,
        source: &Origin,
        path: &str,
        env_path: Option<Vec<String>>,
    ) -> Result<(ValueTree, bool)> {
        match field.kind() {
            FieldKind::Scalar(kind) => {
                if let Some(segments) = env_path {
                    let var = field
                        .env_var()
                        .map(str::to_string)
                        .unwrap_or_else(|| env_var_name(&segments));
                    if let Some(raw) = self.ctx.vars.non_empty(&var) {
                        let value = coerce_str(*kind, raw, path)?;
                        self.origins.insert(path.to_string(), Origin::Env(var));
                        return Ok((ValueTree::Scalar(value), true));
                    }
                }

                let (value, origin) = match (file_value, field.default_value()) {
                    (Some(v), _) => (coerce_scalar(*kind, v, path)?, source.clone()),
                    (None, Some(d)) => (coerce_scalar(*kind, d, path)?, Origin::Default),
                    (None, None) => {
                        self.origins.insert(path.to_string(), Origin::Zero);
                        return Ok((field.zero(), false));
                    }
                };
                self.origins.insert(path.to_string(), origin);
                Ok((ValueTree::Scalar(value), true))
            }
            FieldKind::Record(shape) => {
                // An explicit variable name on a record becomes the prefix of its fields.
                let env_path = env_path.map(|segments| match field.env_var() {
                    Some(var) => vec![var.to_string()],
                    None => segments,
                });
                let (node, node_source) = match (file_value, field.default_value()) {
                    (Some(v), _) => (Some(v), source.clone()),
                    (None, Some(d)) => (Some(d), Origin::Default),
                    (None, None) => (None, Origin::Zero),
                };
                let (value, supplied) = self.record(shape, node, &node_source, path, env_path)?;
                if !supplied && field.is_optional() {
                    return Ok((ValueTree::Null, false));
                }
                Ok((value, supplied))
            }
            FieldKind::Sequence(_) | FieldKind::Map(_) => {
                let (value, origin) = match (file_value, field.default_value()) {
                    (Some(v), _) => (v, source.clone()),
                    (None, Some(d)) => (d, Origin::Default),
                    (None, None) => {
                        self.origins.insert(path.to_string(), Origin::Zero);
                        return Ok((field.zero(), false));
                    }
                };
                let bound = self.element(field.kind(), value, &origin, path)?;
                self.origins.insert(path.to_string(), origin);
                Ok((bound, true))
            }
        }
    }

    /// Bind a value nested inside a sequence or mapping. Environment
    /// overrides do not apply at this depth.
    fn element(
        &mut self,
        kind: &FieldKind,
        value: &ValueTree,
        source: &Origin,
        path: &str,
    ) -> Result<ValueTree> {
        match kind {
            FieldKind::Scalar(scalar) => Ok(ValueTree::Scalar(coerce_scalar(*scalar, value, path)?)),
            FieldKind::Record(shape) => Ok(self.record(shape, Some(value), source, path, None)?.0),
            FieldKind::Sequence(inner) => match value {
                ValueTree::Sequence(items) => items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        self.element(inner, item, source, &join_path(path, &i.to_string()))
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(ValueTree::Sequence),
                other => Err(ConfigError::type_mismatch(path, other.describe(), "sequence")),
            },
            FieldKind::Map(inner) => match value {
                ValueTree::Mapping(map) => map
                    .iter()
                    .map(|(k, v)| {
                        let bound = self.element(inner, v, source, &join_path(path, k))?;
                        Ok((k.clone(), bound))
                    })
                    .collect::<Result<BTreeMap<_, _>>>()
                    .map(ValueTree::Mapping),
                other => Err(ConfigError::type_mismatch(path, other.describe(), "mapping")),
            },
        }
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

/// Derived variable name: segments in SHOUTY_SNAKE_CASE joined by `_`.
pub fn env_var_name<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref().to_shouty_snake_case())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "f" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Bounds of the integer ranges as exact floats; `i64::MAX as f64` rounds up.
const I64_END: f64 = 9_223_372_036_854_775_808.0;
const U64_END: f64 = 18_446_744_073_709_551_616.0;

/// Parse a raw string into a scalar of the given kind.
fn coerce_str(kind: ScalarKind, raw: &str, path: &str) -> Result<Scalar> {
    let trimmed = raw.trim();
    let parsed = match kind {
        ScalarKind::String => Some(Scalar::String(raw.to_string())),
        ScalarKind::Bool => parse_bool(trimmed).map(Scalar::Bool),
        ScalarKind::Integer => trimmed.parse::<i64>().ok().map(Scalar::Integer),
        ScalarKind::Unsigned => trimmed.parse::<u64>().ok().map(Scalar::unsigned),
        ScalarKind::Float => trimmed
            .parse::<f64>()
            .ok()
            .filter(|x| x.is_finite())
            .map(Scalar::Float),
    };
    parsed.ok_or_else(|| ConfigError::type_mismatch(path, raw, kind.name()))
}

/// Coerce a decoded value into a scalar of the given kind.
///
/// Floats never stringify: the decoders keep only the parsed value, so the
/// source text (`1.10`, `1.0`) cannot be reproduced.
fn coerce_scalar(kind: ScalarKind, value: &ValueTree, path: &str) -> Result<Scalar> {
    let mismatch = || ConfigError::type_mismatch(path, value.describe(), kind.name());
    let ValueTree::Scalar(scalar) = value else {
        return Err(mismatch());
    };

    match (kind, scalar) {
        (_, Scalar::String(s)) => coerce_str(kind, s, path),
        (ScalarKind::String, Scalar::Float(_)) => Err(mismatch()),
        (ScalarKind::String, other) => Ok(Scalar::String(other.to_string())),
        (ScalarKind::Bool, Scalar::Bool(b)) => Ok(Scalar::Bool(*b)),
        (ScalarKind::Integer, Scalar::Integer(i)) => Ok(Scalar::Integer(*i)),
        (ScalarKind::Unsigned, Scalar::Integer(i)) if *i >= 0 => Ok(Scalar::Integer(*i)),
        (ScalarKind::Unsigned, Scalar::Unsigned(u)) => Ok(Scalar::Unsigned(*u)),
        (ScalarKind::Integer, Scalar::Float(x))
            if x.fract() == 0.0 && *x >= -I64_END && *x < I64_END =>
        {
            Ok(Scalar::Integer(*x as i64))
        }
        (ScalarKind::Unsigned, Scalar::Float(x))
            if x.fract() == 0.0 && *x >= 0.0 && *x < U64_END =>
        {
            Ok(Scalar::unsigned(*x as u64))
        }
        (ScalarKind::Float, Scalar::Integer(i)) => Ok(Scalar::Float(*i as f64)),
        (ScalarKind::Float, Scalar::Unsigned(u)) => Ok(Scalar::Float(*u as f64)),
        (ScalarKind::Float, Scalar::Float(x)) if x.is_finite() => Ok(Scalar::Float(*x)),
        _ => Err(mismatch()),
    }
}
