//! BTreeMap-based index structures
//!
//! Indexes use BTreeMap<IndexKey, BTreeSet<RecordId>> for deterministic
//! ordering. Record ids are insertion sequence numbers, so every lookup
//! returns candidates in insertion order.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use super::key::{IndexKey, KeyPart};

/// Internal per-collection document handle (insertion sequence)
pub type RecordId = u64;

/// One end of a range predicate on the leading key part
#[derive(Debug, Clone, PartialEq)]
pub struct PartBound {
    pub part: KeyPart,
    pub inclusive: bool,
}

/// A single (possibly compound) index over BTreeMap
#[derive(Debug, Default)]
pub struct IndexTree {
    tree: BTreeMap<IndexKey, BTreeSet<RecordId>>,
}

impl IndexTree {
    /// Creates a new empty index tree
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }

    /// Insert a record id for a key.
    pub fn insert(&mut self, key: IndexKey, record: RecordId) {
        self.tree.entry(key).or_default().insert(record);
    }

    /// Remove a record id for a key.
    ///
    /// If the key has no more records, removes the key entirely.
    pub fn remove(&mut self, key: &IndexKey, record: RecordId) {
        if let Some(records) = self.tree.get_mut(key) {
            records.remove(&record);
            if records.is_empty() {
                self.tree.remove(key);
            }
        }
    }

    /// Returns a record other than `except` that holds exactly `key`.
    pub fn holder_other_than(&self, key: &IndexKey, except: RecordId) -> Option<RecordId> {
        self.tree
            .get(key)
            .and_then(|records| records.iter().copied().find(|r| *r != except))
    }

    /// All records whose leading key part equals `part`.
    pub fn lookup_eq(&self, part: &KeyPart) -> BTreeSet<RecordId> {
        let start = IndexKey(vec![part.clone()]);
        let mut result = BTreeSet::new();
        for (key, records) in self.tree.range(start..) {
            if key.leading() != Some(part) {
                break;
            }
            result.extend(records);
        }
        result
    }

    /// All records whose leading key part lies within the bounds.
    ///
    /// A missing bound is replaced by the edge of the other bound's type
    /// bracket, so `> 100` never reaches strings. Bounds in different
    /// brackets select nothing.
    pub fn lookup_range(
        &self,
        lower: Option<&PartBound>,
        upper: Option<&PartBound>,
    ) -> BTreeSet<RecordId> {
        let anchor = match (lower, upper) {
            (Some(l), Some(u)) => {
                if !l.part.same_bracket(&u.part) {
                    return BTreeSet::new();
                }
                &l.part
            }
            (Some(l), None) => &l.part,
            (None, Some(u)) => &u.part,
            (None, None) => return self.all(),
        };

        let start = match lower {
            Some(l) => l.part.clone(),
            None => anchor.bracket_start(),
        };
        let end: Bound<KeyPart> = match upper {
            Some(u) if u.inclusive => Bound::Included(u.part.clone()),
            Some(u) => Bound::Excluded(u.part.clone()),
            None => anchor.bracket_end(),
        };

        let mut result = BTreeSet::new();
        for (key, records) in self.tree.range(IndexKey(vec![start])..) {
            let Some(part) = key.leading() else {
                continue;
            };
            let below_end = match &end {
                Bound::Included(e) => part <= e,
                Bound::Excluded(e) => part < e,
                Bound::Unbounded => true,
            };
            if !below_end {
                break;
            }
            if let Some(l) = lower {
                if !l.inclusive && *part == l.part {
                    continue;
                }
            }
            result.extend(records);
        }
        result
    }

    /// Every record in the tree
    pub fn all(&self) -> BTreeSet<RecordId> {
        self.tree.values().flatten().copied().collect()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Returns the number of distinct keys
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }

    /// Returns the total number of (key, record) entries
    pub fn entry_count(&self) -> usize {
        self.tree.values().map(|v| v.len()).sum()
    }
}
