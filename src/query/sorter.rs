//! Multi-key document sorting
//!
//! Keys compare under the canonical value ordering. Null and missing values
//! sort first in both directions. Sorting is stable, so documents that tie
//! on every key keep their incoming (insertion) order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::errors::{QueryError, QueryResult};
use crate::value::{compare_values, resolve, split_path, Document, Value};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub path: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Rejects empty paths.
pub fn validate_sort(keys: &[SortKey]) -> QueryResult<()> {
    for key in keys {
        split_path(&key.path).map_err(|e| QueryError::invalid_filter(format!("sort: {}", e)))?;
    }
    Ok(())
}

/// Compares two documents under `keys`.
pub fn compare_documents(a: &Document, b: &Document, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = compare_key(resolve(a, &key.path), resolve(b, &key.path), key.direction);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn compare_key(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => {
            let ord = compare_values(x, y);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
    }
}

/// Stable in-place sort
pub fn sort_documents<T>(items: &mut [T], keys: &[SortKey], doc: impl Fn(&T) -> &Document) {
    if keys.is_empty() {
        return;
    }
    items.sort_by(|a, b| compare_documents(doc(a), doc(b), keys));
}
