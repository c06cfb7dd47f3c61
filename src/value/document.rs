//! Ordered field mapping
//!
//! Field order is insertion order. Replacing an existing field keeps its
//! position.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::path;
use super::Value;

/// Name of the identifier field
pub const ID_FIELD: &str = "_id";

/// A schema-flexible document: ordered field name -> value pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    /// Creates an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds from a JSON object map, preserving its iteration order
    pub fn from_map(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            fields: map
                .into_iter()
                .map(|(k, v)| (k, Value::from_json(v)))
                .collect(),
        }
    }

    /// Builds from a JSON value; `None` unless it is an object
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(map) => Some(Self::from_map(map)),
            _ => None,
        }
    }

    /// Converts to a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (k, v) in &self.fields {
            map.insert(k.clone(), v.to_json());
        }
        serde_json::Value::Object(map)
    }

    /// Top-level field lookup
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Mutable top-level field lookup
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Dotted-path lookup (see [`path::resolve`])
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path::resolve(self, path)
    }

    /// Inserts or replaces a top-level field, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((key, value));
                None
            }
        }
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Removes a top-level field
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(pos).1)
    }

    /// Moves `_id` to the front, as stored documents always lead with it
    pub(crate) fn promote_id(&mut self) {
        if let Some(pos) = self.fields.iter().position(|(k, _)| k == ID_FIELD) {
            if pos != 0 {
                let entry = self.fields.remove(pos);
                self.fields.insert(0, entry);
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates field names in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// The `_id` value, if present
    pub fn id(&self) -> Option<&Value> {
        self.get(ID_FIELD)
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Document::from_json(value).ok_or_else(|| D::Error::custom("expected a JSON object"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_preserves_position_on_replace() {
        let mut doc = Document::new().with("a", 1).with("b", 2);
        doc.insert("a", 10);

        let keys: Vec<_> = doc.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(doc.get("a"), Some(&Value::Int(10)));
    }

    #[test]
    fn test_promote_id() {
        let mut doc = Document::new().with("name", "x").with("_id", "abc");
        doc.promote_id();
        assert_eq!(doc.keys().next(), Some("_id"));
    }

    #[test]
    fn test_from_json_rejects_scalars() {
        assert!(Document::from_json(json!(5)).is_none());
        assert!(Document::from_json(json!({"a": 1})).is_some());
    }

    #[test]
    fn test_remove() {
        let mut doc = Document::new().with("a", 1);
        assert_eq!(doc.remove("a"), Some(Value::Int(1)));
        assert!(doc.is_empty());
        assert_eq!(doc.remove("a"), None);
    }
}
