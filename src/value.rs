//! Value Tree
//!
//! The loosely-typed nested form a configuration front-end supplies: maps with
//! string keys, ordered lists, and text leaves. Typed data is pulled out of it
//! through explicit coercions that report the field path on mismatch.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::parse::{format_bool, format_float, parse_bool, parse_float, parse_int};

/// A nested configuration value
///
/// Scalars are always text. Booleans are `"true"`/`"false"` and numbers are
/// decimal text. An empty list is distinct from an absent key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Scalar text
    Leaf(String),
    /// Ordered sequence
    List(Vec<Value>),
    /// String-keyed mapping
    Map(BTreeMap<String, Value>),
}

impl Default for Value {
    fn default() -> Self {
        Self::Map(BTreeMap::new())
    }
}

impl Value {
    /// Create a leaf
    pub fn leaf(text: impl Into<String>) -> Self {
        Self::Leaf(text.into())
    }

    /// Create a list from any sequence of values
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Create a map from key/value pairs
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Human-readable description of the node used in error messages
    pub fn describe(&self) -> String {
        match self {
            Self::Leaf(s) => format!("text {:?}", s),
            Self::List(items) => format!("list of {}", items.len()),
            Self::Map(entries) => format!("map with {} keys", entries.len()),
        }
    }

    /// Look up a key if this is a map
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Coerce to text
    pub fn as_str(&self, field: &str) -> Result<&str> {
        match self {
            Self::Leaf(s) => Ok(s),
            other => Err(Error::field_type(field, "text", other)),
        }
    }

    /// Coerce to a boolean (`true`/`false`/`1`/`0`)
    pub fn as_bool(&self, field: &str) -> Result<bool> {
        let text = self
            .as_str(field)
            .map_err(|_| Error::field_type(field, "boolean", self))?;
        parse_bool(text).ok_or_else(|| Error::field_type(field, "boolean", self))
    }

    /// Coerce to a signed integer
    pub fn as_i64(&self, field: &str) -> Result<i64> {
        let text = self
            .as_str(field)
            .map_err(|_| Error::field_type(field, "integer", self))?;
        parse_int(text).ok_or_else(|| Error::field_type(field, "integer", self))
    }

    /// Coerce to a finite float
    pub fn as_f64(&self, field: &str) -> Result<f64> {
        let text = self
            .as_str(field)
            .map_err(|_| Error::field_type(field, "number", self))?;
        parse_float(text).ok_or_else(|| Error::field_type(field, "number", self))
    }

    /// Coerce to a list
    pub fn as_list(&self, field: &str) -> Result<&[Value]> {
        match self {
            Self::List(items) => Ok(items),
            other => Err(Error::field_type(field, "list", other)),
        }
    }

    /// Coerce to a map
    pub fn as_map(&self, field: &str) -> Result<&BTreeMap<String, Value>> {
        match self {
            Self::Map(entries) => Ok(entries),
            other => Err(Error::field_type(field, "map", other)),
        }
    }

    /// Coerce to a list of text
    pub fn as_string_list(&self, field: &str) -> Result<Vec<String>> {
        self.as_list(field)?
            .iter()
            .enumerate()
            .map(|(i, item)| item.as_str(&join_path(field, &i.to_string())).map(str::to_string))
            .collect()
    }

    /// Convert a JSON document into a value tree
    ///
    /// Booleans and numbers become their text form. `null` object members are
    /// treated as absent, a `null` list element becomes an empty leaf, and a
    /// `null` document becomes an empty map.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::default(),
            other => Self::from_json_node(other),
        }
    }

    fn from_json_node(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::leaf(""),
            serde_json::Value::Bool(b) => Self::from(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::from(i)
                } else if let Some(u) = n.as_u64() {
                    Self::leaf(u.to_string())
                } else {
                    Self::from(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => Self::Leaf(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from_json_node).collect())
            }
            serde_json::Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| (k, Self::from_json_node(v)))
                    .collect(),
            ),
        }
    }

    /// Render as JSON with every leaf as a JSON string
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Leaf(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Leaf(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Leaf(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Leaf(format_bool(b))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Leaf(n.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Leaf(format_float(n))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self::Map(entries)
    }
}

/// Join a field path and a child step with `.`
///
/// An empty parent yields the bare child, so top-level keys carry no leading dot.
pub(crate) fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}.{}", parent, child)
    }
}
