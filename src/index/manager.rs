//! Index Manager for aerodoc
//!
//! Owns every secondary index of one collection and keeps them consistent
//! with the collection's documents.
//!
//! # API
//!
//! - `create(definition, documents)` - Register an index and back-fill it
//! - `drop(name)` - Remove an index
//! - `on_write(record, old, new)` - Maintain indexes after insert/update/delete
//! - `lookup(field, predicate)` - Equality, `in` and range candidates
//! - `text_search(query)` - Scored text matches
//! - `expired(now)` - Records past a TTL index's expiry

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};

use super::definition::{IndexDefinition, IndexKind};
use super::errors::{IndexError, IndexResult};
use super::key::{extract_keys, IndexKey, KeyPart};
use super::text::TextIndex;
use super::tree::{IndexTree, PartBound, RecordId};
use super::ttl::TtlIndex;
use crate::value::{Document, Value};

/// One end of a range predicate
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBound {
    pub value: Value,
    pub inclusive: bool,
}

/// Predicate an ordered index can answer on its leading field
#[derive(Debug, Clone, PartialEq)]
pub enum IndexPredicate {
    Eq(Value),
    In(Vec<Value>),
    Range {
        lower: Option<RangeBound>,
        upper: Option<RangeBound>,
    },
}

#[derive(Debug)]
enum Structure {
    Tree(IndexTree),
    Text(TextIndex),
    Ttl(TtlIndex),
}

#[derive(Debug)]
struct Index {
    definition: IndexDefinition,
    structure: Structure,
}

impl Index {
    fn new(definition: IndexDefinition) -> Self {
        let structure = match definition.kind {
            IndexKind::Standard | IndexKind::Unique => Structure::Tree(IndexTree::new()),
            IndexKind::Text => Structure::Text(TextIndex::new(
                definition
                    .fields
                    .iter()
                    .map(|f| (f.clone(), definition.weights.get(f).copied().unwrap_or(1)))
                    .collect(),
            )),
            IndexKind::Ttl => Structure::Ttl(TtlIndex::new(
                definition.leading_field(),
                definition.expire_after_seconds.unwrap_or(0),
            )),
        };
        Self {
            definition,
            structure,
        }
    }

    fn keys(&self, doc: &Document) -> BTreeSet<IndexKey> {
        extract_keys(doc, &self.definition.fields, self.definition.sparse)
    }

    /// First key in `doc` already held by a record other than `record`
    fn conflicting_key(&self, record: RecordId, doc: &Document) -> Option<IndexKey> {
        let Structure::Tree(tree) = &self.structure else {
            return None;
        };
        if self.definition.kind != IndexKind::Unique {
            return None;
        }
        self.keys(doc)
            .into_iter()
            .find(|key| tree.holder_other_than(key, record).is_some())
    }

    fn insert(&mut self, record: RecordId, doc: &Document) {
        let keys = match &self.structure {
            Structure::Tree(_) => self.keys(doc),
            _ => BTreeSet::new(),
        };
        match &mut self.structure {
            Structure::Tree(tree) => {
                for key in keys {
                    tree.insert(key, record);
                }
            }
            Structure::Text(text) => text.insert(record, doc),
            Structure::Ttl(ttl) => ttl.insert(record, doc),
        }
    }

    fn remove(&mut self, record: RecordId, doc: &Document) {
        let keys = match &self.structure {
            Structure::Tree(_) => self.keys(doc),
            _ => BTreeSet::new(),
        };
        match &mut self.structure {
            Structure::Tree(tree) => {
                for key in &keys {
                    tree.remove(key, record);
                }
            }
            Structure::Text(text) => text.remove(record, doc),
            Structure::Ttl(ttl) => ttl.remove(record, doc),
        }
    }
}

/// Index Manager that maintains the secondary indexes of one collection
#[derive(Debug, Default)]
pub struct IndexManager {
    /// Indexes in creation order
    indexes: Vec<Index>,
}

impl IndexManager {
    /// Creates a manager with no indexes
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an index and back-fills it from `documents`.
    ///
    /// Fails without registering anything if the name is taken, a second
    /// text index is requested, or existing documents violate uniqueness.
    pub fn create<'a, I>(&mut self, definition: IndexDefinition, documents: I) -> IndexResult<()>
    where
        I: IntoIterator<Item = (RecordId, &'a Document)>,
    {
        if self.get(&definition.name).is_some() {
            return Err(IndexError::invalid_index(format!(
                "an index named '{}' already exists",
                definition.name
            )));
        }
        if definition.kind == IndexKind::Text && self.has_text_index() {
            return Err(IndexError::invalid_index(
                "a collection can have only one text index",
            ));
        }

        let mut index = Index::new(definition);
        for (record, doc) in documents {
            if let Some(key) = index.conflicting_key(record, doc) {
                return Err(IndexError::duplicate_key(&index.definition.name, key));
            }
            index.insert(record, doc);
        }
        self.indexes.push(index);
        Ok(())
    }

    /// Removes an index by name, returning its definition.
    pub fn drop(&mut self, name: &str) -> IndexResult<IndexDefinition> {
        let pos = self
            .indexes
            .iter()
            .position(|i| i.definition.name == name)
            .ok_or_else(|| IndexError::invalid_index(format!("no index named '{}'", name)))?;
        Ok(self.indexes.remove(pos).definition)
    }

    /// Definition of a named index
    pub fn get(&self, name: &str) -> Option<&IndexDefinition> {
        self.indexes
            .iter()
            .map(|i| &i.definition)
            .find(|d| d.name == name)
    }

    /// All definitions in creation order
    pub fn definitions(&self) -> Vec<IndexDefinition> {
        self.indexes.iter().map(|i| i.definition.clone()).collect()
    }

    /// Rejects `new` if it would violate any unique index.
    ///
    /// Performs no mutation.
    pub fn check_unique(&self, record: RecordId, new: &Document) -> IndexResult<()> {
        for index in &self.indexes {
            if let Some(key) = index.conflicting_key(record, new) {
                return Err(IndexError::duplicate_key(&index.definition.name, key));
            }
        }
        Ok(())
    }

    /// Applies a write to every index.
    ///
    /// `old` is the stored document before the write (None on insert), `new`
    /// the document after it (None on delete). Uniqueness is checked against
    /// the existing keys before any index is touched, so a rejected write
    /// leaves every index unchanged.
    pub fn on_write(
        &mut self,
        record: RecordId,
        old: Option<&Document>,
        new: Option<&Document>,
    ) -> IndexResult<()> {
        if let Some(new) = new {
            self.check_unique(record, new)?;
        }
        for index in &mut self.indexes {
            if let Some(old) = old {
                index.remove(record, old);
            }
            if let Some(new) = new {
                index.insert(record, new);
            }
        }
        Ok(())
    }

    /// Ordered index whose leading field is `field`.
    ///
    /// Unique indexes are preferred, then those with fewer fields.
    fn ordered_index_on(&self, field: &str) -> Option<&Index> {
        self.indexes
            .iter()
            .filter(|i| i.definition.kind.is_ordered() && i.definition.leading_field() == field)
            .min_by_key(|i| {
                (
                    i.definition.kind != IndexKind::Unique,
                    i.definition.fields.len(),
                )
            })
    }

    /// True if an ordered index leads with `field`
    pub fn is_indexed(&self, field: &str) -> bool {
        self.ordered_index_on(field).is_some()
    }

    /// Candidate records for a predicate on `field`.
    ///
    /// Returns None when no index can answer the predicate exactly; the
    /// caller must then scan. A returned set is a superset of the matches
    /// and empty only if nothing can match.
    pub fn lookup(&self, field: &str, predicate: &IndexPredicate) -> Option<BTreeSet<RecordId>> {
        let index = self.ordered_index_on(field)?;
        let Structure::Tree(tree) = &index.structure else {
            return None;
        };
        let sparse = index.definition.sparse;

        match predicate {
            IndexPredicate::Eq(value) => {
                let part = eq_part(value, sparse)?;
                Some(tree.lookup_eq(&part))
            }
            IndexPredicate::In(values) => {
                let mut parts = Vec::with_capacity(values.len());
                for value in values {
                    parts.push(eq_part(value, sparse)?);
                }
                let mut result = BTreeSet::new();
                for part in parts {
                    result.extend(tree.lookup_eq(&part));
                }
                Some(result)
            }
            IndexPredicate::Range { lower, upper } => {
                let lower = match lower {
                    Some(b) => Some(range_part(b)?),
                    None => None,
                };
                let upper = match upper {
                    Some(b) => Some(range_part(b)?),
                    None => None,
                };
                if lower.is_none() && upper.is_none() {
                    return None;
                }
                Some(tree.lookup_range(lower.as_ref(), upper.as_ref()))
            }
        }
    }

    /// True if the collection has a text index
    pub fn has_text_index(&self) -> bool {
        self.indexes
            .iter()
            .any(|i| matches!(i.structure, Structure::Text(_)))
    }

    /// Scored text matches, best first, ties in insertion order.
    pub fn text_search(&self, query: &str) -> IndexResult<Vec<(RecordId, f64)>> {
        self.indexes
            .iter()
            .find_map(|i| match &i.structure {
                Structure::Text(text) => Some(text.search(query)),
                _ => None,
            })
            .ok_or_else(IndexError::text_index_required)
    }

    /// True if any TTL index exists
    pub fn has_ttl_index(&self) -> bool {
        self.indexes
            .iter()
            .any(|i| matches!(i.structure, Structure::Ttl(_)))
    }

    /// Records expired under any TTL index, ascending
    pub fn expired(&self, now: DateTime<Utc>) -> Vec<RecordId> {
        let mut seen = HashSet::new();
        let mut result: Vec<RecordId> = self
            .indexes
            .iter()
            .filter_map(|i| match &i.structure {
                Structure::Ttl(ttl) => Some(ttl.expired(now)),
                _ => None,
            })
            .flatten()
            .filter(|r| seen.insert(*r))
            .collect();
        result.sort_unstable();
        result
    }

    /// Drops every entry while keeping the definitions
    pub fn clear(&mut self) {
        for index in &mut self.indexes {
            match &mut index.structure {
                Structure::Tree(tree) => tree.clear(),
                Structure::Text(text) => text.clear(),
                Structure::Ttl(ttl) => ttl.clear(),
            }
        }
    }

    /// Number of (key, record) entries in a named ordered index
    pub fn entry_count(&self, name: &str) -> Option<usize> {
        self.indexes
            .iter()
            .find(|i| i.definition.name == name)
            .map(|i| match &i.structure {
                Structure::Tree(tree) => tree.entry_count(),
                Structure::Text(text) => text.token_count(),
                Structure::Ttl(ttl) => ttl.len(),
            })
    }
}

/// Key part for an equality lookup. Arrays and documents need whole-value
/// comparison and a sparse index omits documents that would match null.
fn eq_part(value: &Value, sparse: bool) -> Option<KeyPart> {
    if sparse && value.is_null() {
        return None;
    }
    KeyPart::from_value(value)
}

fn range_part(bound: &RangeBound) -> Option<PartBound> {
    if bound.value.is_null() {
        return None;
    }
    Some(PartBound {
        part: KeyPart::from_value(&bound.value)?,
        inclusive: bound.inclusive,
    })
}
