//! Core document model: ordered maps, sequences, scalars, and compound values.

use crate::compound::CompoundValue;
use indexmap::IndexMap;

/// A node in a configuration document.
///
/// Maps preserve insertion order (document order), which makes every walk,
/// dump, and wildcard search deterministic. A document owns its entire tree
/// exclusively; import results are deep-copied into the importing tree so two
/// documents never alias each other's nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Ordered mapping with string keys.
    Map(IndexMap<String, Value>),

    /// Ordered list.
    Sequence(Vec<Value>),

    /// A plain leaf value.
    Scalar(Scalar),

    /// A scalar string decomposed into literal and operator-call fragments,
    /// e.g. `"./db/{ref:db}-config.yaml"`. Produced only from strings that
    /// contain `{...}` and are not marked raw.
    Compound(CompoundValue),
}

/// Leaf value kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Regular string; may be promoted to [`Value::Compound`] when it
    /// contains placeholder syntax.
    Str(String),

    /// String explicitly marked raw (the `r"..."` convention). Never parsed
    /// for placeholders; resolves to itself verbatim.
    RawStr(String),

    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Value {
    /// Create an empty map value.
    pub fn map() -> Self {
        Value::Map(IndexMap::new())
    }

    /// Create an empty sequence value.
    pub fn sequence() -> Self {
        Value::Sequence(Vec::new())
    }

    /// Create a null scalar.
    pub fn null() -> Self {
        Value::Scalar(Scalar::Null)
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::Sequence(_))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Scalar(_))
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, Value::Compound(_))
    }

    /// True for maps and sequences.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Map(_) | Value::Sequence(_))
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut IndexMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// String content of a `Str` or `RawStr` scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(Scalar::Str(s)) | Value::Scalar(Scalar::RawStr(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Scalar(Scalar::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

impl Scalar {
    /// Coerce a string literal into a typed scalar.
    ///
    /// Placeholder argument defaults go through this, so `{ref:db.port, 8080}`
    /// falls back to the integer `8080` rather than the string `"8080"`.
    /// Quoting an argument protects separators, not its type; the coercion
    /// applies to the quoted text as well.
    pub fn from_literal(text: &str) -> Scalar {
        if let Ok(i) = text.parse::<i64>() {
            return Scalar::Int(i);
        }
        if let Ok(f) = text.parse::<f64>() {
            return Scalar::Float(f);
        }
        match text {
            "true" => Scalar::Bool(true),
            "false" => Scalar::Bool(false),
            "null" | "~" => Scalar::Null,
            _ => Scalar::Str(text.to_string()),
        }
    }

    /// Render the scalar for concatenation into a compound string.
    ///
    /// `Null` renders as the YAML spelling `null`.
    pub fn to_display_string(&self) -> String {
        match self {
            Scalar::Str(s) | Scalar::RawStr(s) => s.clone(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Null => "null".to_string(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(Scalar::Str(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(Scalar::Str(s))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Scalar(Scalar::Int(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Scalar(Scalar::Float(f))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(Scalar::Bool(b))
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Value::Scalar(scalar)
    }
}
