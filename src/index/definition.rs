//! Index definitions
//!
//! Callers describe an index with a field list, a kind and [`IndexOptions`].
//! [`IndexDefinition::new`] validates that description and normalizes it:
//! `unique: true` turns a standard index into a unique one,
//! `expire_after_seconds` turns it into a TTL index, and a default name is
//! derived from the fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::errors::{IndexError, IndexResult};
use crate::value::{split_path, ID_FIELD};

/// Kind of secondary index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Ordered, duplicates allowed
    #[default]
    Standard,
    /// Ordered, at most one document per key
    Unique,
    /// Inverted token index with per-field weights
    Text,
    /// Expiry index over a timestamp field
    Ttl,
}

impl IndexKind {
    /// Kinds that answer equality and range lookups
    pub fn is_ordered(&self) -> bool {
        matches!(self, IndexKind::Standard | IndexKind::Unique)
    }
}

/// Creation options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    pub unique: bool,
    /// Skip documents that lack every indexed field
    pub sparse: bool,
    pub expire_after_seconds: Option<u64>,
    /// Text field weights; unlisted fields keep their positional default
    pub weights: BTreeMap<String, u32>,
    pub name: Option<String>,
}

impl IndexOptions {
    pub fn unique() -> Self {
        Self {
            unique: true,
            ..Self::default()
        }
    }

    pub fn ttl(expire_after_seconds: u64) -> Self {
        Self {
            expire_after_seconds: Some(expire_after_seconds),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }

    pub fn weight(mut self, field: impl Into<String>, weight: u32) -> Self {
        self.weights.insert(field.into(), weight);
        self
    }
}

/// A validated, normalized index definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub fields: Vec<String>,
    pub kind: IndexKind,
    #[serde(default)]
    pub sparse: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_after_seconds: Option<u64>,
    /// Resolved weight per text field (empty for other kinds)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub weights: BTreeMap<String, u32>,
}

impl IndexDefinition {
    /// Validates and normalizes a caller's index description.
    pub fn new(fields: Vec<String>, kind: IndexKind, options: IndexOptions) -> IndexResult<Self> {
        if fields.is_empty() {
            return Err(IndexError::invalid_index("index must cover at least one field"));
        }
        for (i, field) in fields.iter().enumerate() {
            split_path(field).map_err(|e| IndexError::invalid_index(e.to_string()))?;
            if fields[..i].contains(field) {
                return Err(IndexError::invalid_index(format!(
                    "field '{}' listed twice",
                    field
                )));
            }
        }

        let kind = match kind {
            IndexKind::Standard if options.expire_after_seconds.is_some() => IndexKind::Ttl,
            IndexKind::Standard if options.unique => IndexKind::Unique,
            other => other,
        };

        match kind {
            IndexKind::Ttl => {
                if options.expire_after_seconds.is_none() {
                    return Err(IndexError::invalid_index(
                        "ttl index requires expire_after_seconds",
                    ));
                }
                if fields.len() != 1 {
                    return Err(IndexError::invalid_index(
                        "ttl index must cover exactly one field",
                    ));
                }
                if options.unique {
                    return Err(IndexError::invalid_index("ttl index cannot be unique"));
                }
            }
            IndexKind::Text => {
                if options.unique || options.expire_after_seconds.is_some() {
                    return Err(IndexError::invalid_index(
                        "text index accepts only weights and name options",
                    ));
                }
            }
            IndexKind::Standard | IndexKind::Unique => {
                if options.expire_after_seconds.is_some() {
                    return Err(IndexError::invalid_index(format!(
                        "{:?} index cannot expire documents",
                        kind
                    )));
                }
            }
        }

        if kind != IndexKind::Text && !options.weights.is_empty() {
            return Err(IndexError::invalid_index("weights apply to text indexes only"));
        }
        if kind == IndexKind::Ttl && fields[0] == ID_FIELD {
            return Err(IndexError::invalid_index("ttl index cannot cover _id"));
        }

        let weights = if kind == IndexKind::Text {
            resolve_weights(&fields, &options.weights)?
        } else {
            BTreeMap::new()
        };

        let name = match options.name {
            Some(name) if name.is_empty() => {
                return Err(IndexError::invalid_index("index name is empty"))
            }
            Some(name) => name,
            None => default_name(&fields, kind),
        };

        Ok(Self {
            name,
            fields,
            kind,
            sparse: options.sparse,
            expire_after_seconds: options.expire_after_seconds,
            weights,
        })
    }

    /// Leading field, used to match single-field predicates
    pub fn leading_field(&self) -> &str {
        &self.fields[0]
    }
}

/// Positional defaults: the first declared field weighs the most.
fn resolve_weights(
    fields: &[String],
    overrides: &BTreeMap<String, u32>,
) -> IndexResult<BTreeMap<String, u32>> {
    for (field, weight) in overrides {
        if !fields.contains(field) {
            return Err(IndexError::invalid_index(format!(
                "weight given for '{}' which is not an indexed field",
                field
            )));
        }
        if *weight == 0 {
            return Err(IndexError::invalid_index(format!(
                "weight for '{}' must be positive",
                field
            )));
        }
    }
    let count = fields.len() as u32;
    Ok(fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let weight = overrides
                .get(field)
                .copied()
                .unwrap_or(count - i as u32);
            (field.clone(), weight)
        })
        .collect())
}

fn default_name(fields: &[String], kind: IndexKind) -> String {
    let suffix = if kind == IndexKind::Text { "text" } else { "1" };
    fields
        .iter()
        .map(|f| format!("{}_{}", f, suffix))
        .collect::<Vec<_>>()
        .join("_")
}
