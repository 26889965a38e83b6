//! Static description of a configuration structure.
//!
//! A [`Shape`] lists the fields of a record in declaration order together with
//! their semantic kind and typed directives (environment variable, file key,
//! default, required). Types opt in by implementing [`Configurable`]:
//!
//! ```
//! use configbind::config::{Configurable, Field, Shape};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Database {
//!     host: String,
//!     port: u16,
//! }
//!
//! impl Configurable for Database {
//!     fn shape() -> Shape {
//!         Shape::new()
//!             .field(Field::string("host").required())
//!             .field(Field::unsigned("port").default(5432))
//!     }
//! }
//! ```
//!
//! Shapes are plain values built bottom-up, so a shape can never contain
//! itself.

use super::value::{Scalar, ValueTree};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;

/// Kinds of leaf values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Bool,
    Integer,
    Unsigned,
    Float,
}

impl ScalarKind {
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Bool => "bool",
            ScalarKind::Integer => "integer",
            ScalarKind::Unsigned => "unsigned integer",
            ScalarKind::Float => "float",
        }
    }

    pub fn zero(self) -> Scalar {
        match self {
            ScalarKind::String => Scalar::String(String::new()),
            ScalarKind::Bool => Scalar::Bool(false),
            ScalarKind::Integer | ScalarKind::Unsigned => Scalar::Integer(0),
            ScalarKind::Float => Scalar::Float(0.0),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Semantic type of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    /// Nested record
    Record(Shape),
    /// Ordered list of elements of one kind
    Sequence(Box<FieldKind>),
    /// String-keyed mapping of values of one kind
    Map(Box<FieldKind>),
}

impl FieldKind {
    pub fn sequence_of(kind: FieldKind) -> Self {
        FieldKind::Sequence(Box::new(kind))
    }

    pub fn map_of(kind: FieldKind) -> Self {
        FieldKind::Map(Box::new(kind))
    }

    pub fn record_of<T: Configurable>() -> Self {
        FieldKind::Record(T::shape())
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Scalar(kind) => kind.name(),
            FieldKind::Record(_) => "record",
            FieldKind::Sequence(_) => "sequence",
            FieldKind::Map(_) => "mapping",
        }
    }

    /// Value a field of this kind holds when no source supplies one.
    pub fn zero(&self) -> ValueTree {
        match self {
            FieldKind::Scalar(kind) => ValueTree::Scalar(kind.zero()),
            FieldKind::Record(shape) => shape.zero(),
            FieldKind::Sequence(_) => ValueTree::Sequence(Vec::new()),
            FieldKind::Map(_) => ValueTree::empty(),
        }
    }
}

/// A field declaration with its directives.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    kind: FieldKind,
    env: Option<String>,
    key: Option<String>,
    default: Option<ValueTree>,
    required: bool,
    optional: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            env: None,
            key: None,
            default: None,
            required: false,
            optional: false,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Scalar(ScalarKind::String))
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Scalar(ScalarKind::Bool))
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Scalar(ScalarKind::Integer))
    }

    pub fn unsigned(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Scalar(ScalarKind::Unsigned))
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Scalar(ScalarKind::Float))
    }

    pub fn record(name: impl Into<String>, shape: Shape) -> Self {
        Self::new(name, FieldKind::Record(shape))
    }

    /// Nested record described by another `Configurable` type.
    pub fn nested<T: Configurable>(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::record_of::<T>())
    }

    pub fn sequence(name: impl Into<String>, element: FieldKind) -> Self {
        Self::new(name, FieldKind::sequence_of(element))
    }

    pub fn map(name: impl Into<String>, value: FieldKind) -> Self {
        Self::new(name, FieldKind::map_of(value))
    }

    /// Read the override from this exact variable name instead of the derived one.
    pub fn env(mut self, var: impl Into<String>) -> Self {
        self.env = Some(var.into());
        self
    }

    /// Match this file key instead of the field name.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Value used when neither the environment nor any file supplies one.
    pub fn default(mut self, value: impl Into<ValueTree>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Fail the load unless some source supplies this field.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Bind to null rather than the kind's zero value when unset (`Option<T>` fields).
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn env_var(&self) -> Option<&str> {
        self.env.as_deref()
    }

    /// Key looked up in configuration files.
    pub fn file_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.name)
    }

    pub fn default_value(&self) -> Option<&ValueTree> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Value the field holds when no source supplies one.
    pub fn zero(&self) -> ValueTree {
        if self.optional {
            ValueTree::Null
        } else {
            self.kind.zero()
        }
    }
}

/// Ordered list of fields describing a record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shape {
    fields: Vec<Field>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. A field with the same name replaces the earlier one in place.
    pub fn field(mut self, field: Field) -> Self {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// A record with every field at its zero value.
    pub fn zero(&self) -> ValueTree {
        ValueTree::Mapping(
            self.fields
                .iter()
                .map(|f| (f.name.clone(), f.zero()))
                .collect::<BTreeMap<_, _>>(),
        )
    }
}

/// A type that can be bound from configuration sources.
///
/// `shape()` must describe the same fields `Deserialize` expects; the bound
/// tree is handed to serde using the field names as keys.
pub trait Configurable: Serialize + DeserializeOwned {
    fn shape() -> Shape;
}
