use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Mapping from attribute name to value.
///
/// Namespaced metadata (e.g. `rdf`, `id3`) is stored as a nested
/// [`MetadataValue::Map`] under the namespace identifier, so every namespace
/// can be read, stripped, and combined independently.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A single metadata attribute value.
///
/// Serialized untagged, so metadata maps to plain JSON: integers stay
/// integers, floats stay floats, nested namespaces become objects.
///
/// Equality compares numbers by value: `Int(1) == Float(1.0)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Int(i64),
    Float(f64),
    Text(String),
    Map(Metadata),
}

impl MetadataValue {
    /// An empty nested mapping (the payload of an absent namespace).
    pub fn empty_map() -> Self {
        Self::Map(Metadata::new())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value as `f64`. Integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Metadata> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns `true` for an empty nested mapping.
    pub fn is_empty_map(&self) -> bool {
        matches!(self, Self::Map(m) if m.is_empty())
    }

    /// Convert into a `serde_json::Value`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Int(v) => serde_json::Value::from(*v),
            Self::Float(v) => serde_json::Value::from(*v),
            Self::Text(s) => serde_json::Value::from(s.as_str()),
            Self::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

fn int_eq_float(i: i64, f: f64) -> bool {
    // i64::MAX is not representable; 2^63 as f64 is the exclusive bound.
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 && f as i64 == i
}

impl PartialEq for MetadataValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(i), Self::Float(f)) | (Self::Float(f), Self::Int(i)) => int_eq_float(*i, *f),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for MetadataValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u32> for MetadataValue {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u16> for MetadataValue {
    fn from(v: u16) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Metadata> for MetadataValue {
    fn from(v: Metadata) -> Self {
        Self::Map(v)
    }
}
