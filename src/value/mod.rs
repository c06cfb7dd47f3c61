//! Value model for aerodoc
//!
//! Documents are schema-flexible: a field may hold a different type in every
//! document of a collection. Everything above this module (filters,
//! projections, index key extraction, updates) works on the same tagged
//! [`Value`] and the same dotted-path resolution.
//!
//! # Design Principles
//!
//! - One value type: scalar | sequence | nested document
//! - One path syntax: `a.b.c`, numeric segments address array positions
//! - One ordering: canonical cross-type order shared by sort and indexes
//!
//! # JSON mapping
//!
//! Timestamps round-trip through JSON as `{"$date": "<rfc3339>"}`.

mod compare;
mod document;
mod path;

pub use compare::{compare_values, type_rank, values_equal};
pub use document::{Document, ID_FIELD};
pub use path::{
    paths_overlap, remove_path, resolve, resolve_all, set_path, split_path, PathError,
};
pub(crate) use path::resolve_mut;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Key under which timestamps are encoded in JSON
pub const DATE_KEY: &str = "$date";

/// A dynamically typed document value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Point in time (UTC)
    Timestamp(DateTime<Utc>),
    /// Ordered sequence
    Array(Vec<Value>),
    /// Nested document
    Document(Document),
}

impl Value {
    /// Returns true for `Value::Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for integers and floats
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Numeric view of the value (ints widen to f64)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::Array(_) => "array",
            Value::Document(_) => "document",
        }
    }

    /// Current time as a timestamp value
    pub fn now() -> Self {
        Value::Timestamp(Utc::now())
    }

    /// Converts a JSON value, decoding `{"$date": ...}` into timestamps.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                if let Some(ts) = decode_date(&map) {
                    return Value::Timestamp(ts);
                }
                Value::Document(Document::from_map(map))
            }
        }
    }

    /// Converts to JSON. Non-finite floats become null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Timestamp(t) => {
                let mut map = serde_json::Map::new();
                map.insert(
                    DATE_KEY.to_string(),
                    serde_json::Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                );
                serde_json::Value::Object(map)
            }
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Document(doc) => doc.to_json(),
        }
    }
}

fn decode_date(map: &serde_json::Map<String, serde_json::Value>) -> Option<DateTime<Utc>> {
    if map.len() != 1 {
        return None;
    }
    match map.get(DATE_KEY)? {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        serde_json::Value::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single(),
        _ => None,
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::from_json(value)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Value::Document(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_keep_integer_type() {
        assert_eq!(Value::from_json(json!(42)), Value::Int(42));
        assert_eq!(Value::from_json(json!(4.5)), Value::Float(4.5));
    }

    #[test]
    fn test_date_decoding() {
        let v = Value::from_json(json!({"$date": "2024-12-15T00:00:00Z"}));
        let ts = v.as_timestamp().unwrap();
        assert_eq!(ts.timestamp(), 1734220800);

        let v = Value::from_json(json!({"$date": 1734220800000i64}));
        assert_eq!(v.as_timestamp().unwrap().timestamp(), 1734220800);
    }

    #[test]
    fn test_date_key_with_siblings_is_a_document() {
        let v = Value::from_json(json!({"$date": "2024-12-15T00:00:00Z", "x": 1}));
        assert!(v.as_document().is_some());
    }

    #[test]
    fn test_timestamp_json_roundtrip() {
        let original = Value::from_json(json!({"$date": "2023-01-15T10:30:00.250Z"}));
        let back = Value::from_json(original.to_json());
        assert_eq!(original, back);
    }

    #[test]
    fn test_non_finite_float_serializes_as_null() {
        assert_eq!(Value::Float(f64::NAN).to_json(), json!(null));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::from(vec![1, 2]).type_name(), "array");
    }
}
