//! Index keys
//!
//! A key is a tuple of [`KeyPart`]s, one per indexed field. Part ordering
//! mirrors the canonical value ordering (null < numbers < strings < bool <
//! timestamps) so that range scans over the tree visit exactly the values a
//! range filter would accept. Documents and arrays are never key parts;
//! arrays are expanded element by element (multikey) before reaching here.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Bound;

use chrono::{DateTime, Utc};

use crate::value::{resolve_all, Document, Value};

/// One component of an index key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyPart {
    /// Null or missing field
    Null,
    /// Any number: order-preserving bits of its nearest f64, then the
    /// distance of an integer from that f64 so large ints stay distinct
    Number { ordered: u64, residual: i64 },
    /// String value
    String(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp in nanoseconds since the epoch
    Timestamp(i128),
}

impl KeyPart {
    /// Create a part from a float
    ///
    /// Uses bit representation for total ordering.
    pub fn from_f64(v: f64) -> Self {
        let bits = v.to_bits();
        let ordered = if (bits >> 63) == 1 {
            !bits
        } else {
            bits ^ (1 << 63)
        };
        KeyPart::Number {
            ordered,
            residual: 0,
        }
    }

    /// Create a part from an integer
    ///
    /// Ints exactly representable as f64 share keys with equal floats.
    pub fn from_i64(v: i64) -> Self {
        let rounded = v as f64;
        match KeyPart::from_f64(rounded) {
            KeyPart::Number { ordered, .. } => KeyPart::Number {
                ordered,
                // |v - rounded| is at most half an ulp of 2^63
                residual: (i128::from(v) - rounded as i128) as i64,
            },
            other => other,
        }
    }

    /// Create a part from a timestamp
    pub fn from_timestamp(t: &DateTime<Utc>) -> Self {
        let nanos = i128::from(t.timestamp()) * 1_000_000_000
            + i128::from(t.timestamp_subsec_nanos());
        KeyPart::Timestamp(nanos)
    }

    /// Converts a scalar value. Arrays and documents are not keyable.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(KeyPart::Null),
            Value::Bool(b) => Some(KeyPart::Bool(*b)),
            Value::Int(i) => Some(KeyPart::from_i64(*i)),
            Value::Float(f) => Some(KeyPart::from_f64(*f)),
            Value::String(s) => Some(KeyPart::String(s.clone())),
            Value::Timestamp(t) => Some(KeyPart::from_timestamp(t)),
            Value::Array(_) | Value::Document(_) => None,
        }
    }

    /// Smallest part in this part's type bracket
    pub fn bracket_start(&self) -> KeyPart {
        match self {
            KeyPart::Null => KeyPart::Null,
            KeyPart::Number { .. } => KeyPart::Number {
                ordered: 0,
                residual: i64::MIN,
            },
            KeyPart::String(_) => KeyPart::String(String::new()),
            KeyPart::Bool(_) => KeyPart::Bool(false),
            KeyPart::Timestamp(_) => KeyPart::Timestamp(i128::MIN),
        }
    }

    /// Upper limit of this part's type bracket
    pub fn bracket_end(&self) -> Bound<KeyPart> {
        match self {
            KeyPart::Null => Bound::Included(KeyPart::Null),
            KeyPart::Number { .. } => Bound::Included(KeyPart::Number {
                ordered: u64::MAX,
                residual: i64::MAX,
            }),
            KeyPart::String(_) => Bound::Excluded(KeyPart::Bool(false)),
            KeyPart::Bool(_) => Bound::Included(KeyPart::Bool(true)),
            KeyPart::Timestamp(_) => Bound::Included(KeyPart::Timestamp(i128::MAX)),
        }
    }

    /// True if both parts live in the same type bracket
    pub fn same_bracket(&self, other: &KeyPart) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Null => write!(f, "null"),
            KeyPart::Number { ordered, residual } => {
                let raw = if (ordered >> 63) == 1 {
                    ordered ^ (1 << 63)
                } else {
                    !ordered
                };
                let value = f64::from_bits(raw);
                if *residual == 0 {
                    write!(f, "{}", value)
                } else {
                    write!(f, "{}", value as i128 + i128::from(*residual))
                }
            }
            KeyPart::String(s) => write!(f, "{:?}", s),
            KeyPart::Bool(b) => write!(f, "{}", b),
            KeyPart::Timestamp(ns) => write!(f, "ts({})", ns),
        }
    }
}

/// Full index key: one part per indexed field
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexKey(pub Vec<KeyPart>);

impl IndexKey {
    /// Leading component, used for single-field predicates
    pub fn leading(&self) -> Option<&KeyPart> {
        self.0.first()
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", part)?;
        }
        write!(f, ")")
    }
}

/// Key parts a single path contributes for one document.
///
/// Missing paths yield `[Null]`; arrays expand to their keyable elements.
fn parts_for_path(doc: &Document, path: &str) -> Vec<KeyPart> {
    let values = resolve_all(doc, path);
    if values.is_empty() {
        return vec![KeyPart::Null];
    }
    let mut parts = Vec::new();
    for value in values {
        match value {
            Value::Array(items) => parts.extend(items.iter().filter_map(KeyPart::from_value)),
            other => parts.extend(KeyPart::from_value(other)),
        }
    }
    parts
}

/// Extracts every key a document contributes to an index over `fields`.
///
/// Compound multikey indexes take the cartesian product of per-field parts.
/// A non-leading field with nothing keyable (an empty array, a document)
/// contributes null so the document stays reachable through its leading
/// field. A sparse index skips documents where every field is missing.
pub fn extract_keys(doc: &Document, fields: &[String], sparse: bool) -> BTreeSet<IndexKey> {
    if sparse && fields.iter().all(|f| resolve_all(doc, f).is_empty()) {
        return BTreeSet::new();
    }

    let mut keys: Vec<Vec<KeyPart>> = vec![Vec::new()];
    for (position, field) in fields.iter().enumerate() {
        let mut parts = parts_for_path(doc, field);
        if parts.is_empty() && position > 0 {
            parts.push(KeyPart::Null);
        }
        parts.sort();
        parts.dedup();
        let mut next = Vec::with_capacity(keys.len() * parts.len());
        for prefix in &keys {
            for part in &parts {
                let mut key = prefix.clone();
                key.push(part.clone());
                next.push(key);
            }
        }
        keys = next;
    }
    keys.into_iter().map(IndexKey).collect()
}
