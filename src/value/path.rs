//! Dotted field path resolution and mutation
//!
//! `a.b.c` walks nested documents. A numeric segment indexes into an array.
//! [`resolve_all`] additionally fans out through arrays of documents, so
//! `addresses.city` yields the city of every address; this is the form used
//! by filters and index key extraction.

use thiserror::Error;

use super::{Document, Value};

/// Largest gap a positional `set` may pad an array by
const MAX_ARRAY_PAD: usize = 1024;

/// Errors raised while parsing or walking a field path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Path is the empty string
    #[error("field path is empty")]
    EmptyPath,

    /// Path has an empty segment (`a..b`, leading or trailing dot)
    #[error("field path '{0}' has an empty segment")]
    EmptySegment(String),

    /// Walking the path hit a scalar where a container was needed
    #[error("cannot traverse '{segment}' of '{path}': found {found}")]
    NotTraversable {
        path: String,
        segment: String,
        found: &'static str,
    },

    /// Positional write too far past the end of an array
    #[error("array index {index} in '{path}' is out of range")]
    IndexOutOfRange { path: String, index: usize },
}

/// Splits a dotted path into segments, rejecting empty segments.
pub fn split_path(path: &str) -> Result<Vec<&str>, PathError> {
    if path.is_empty() {
        return Err(PathError::EmptyPath);
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(PathError::EmptySegment(path.to_string()));
    }
    Ok(segments)
}

/// Resolves a path to at most one value. No fan-out through arrays.
pub fn resolve<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let segments = split_path(path).ok()?;
    let (head, rest) = segments.split_first()?;
    let mut current = doc.get(head)?;
    for seg in rest {
        current = match current {
            Value::Document(d) => d.get(seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Resolves a path to every value it reaches, fanning out through arrays
/// of documents. An empty result means the path is missing everywhere.
pub fn resolve_all<'a>(doc: &'a Document, path: &str) -> Vec<&'a Value> {
    let mut out = Vec::new();
    if let Ok(segments) = split_path(path) {
        collect_in_document(doc, &segments, &mut out);
    }
    out
}

fn collect_in_document<'a>(doc: &'a Document, segments: &[&str], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    if let Some(child) = doc.get(head) {
        collect_in_value(child, rest, out);
    }
}

fn collect_in_value<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    let Some(head) = segments.first() else {
        out.push(value);
        return;
    };
    match value {
        Value::Document(doc) => collect_in_document(doc, segments, out),
        Value::Array(items) => {
            if let Ok(idx) = head.parse::<usize>() {
                if let Some(item) = items.get(idx) {
                    collect_in_value(item, &segments[1..], out);
                }
            }
            for item in items {
                if let Value::Document(doc) = item {
                    collect_in_document(doc, segments, out);
                }
            }
        }
        _ => {}
    }
}

/// Sets the value at `path`, creating intermediate documents as needed.
///
/// Returns the previous value, if any.
pub fn set_path(doc: &mut Document, path: &str, value: Value) -> Result<Option<Value>, PathError> {
    let segments = split_path(path)?;
    set_in_document(doc, &segments, value, path)
}

fn set_in_document(
    doc: &mut Document,
    segments: &[&str],
    value: Value,
    full: &str,
) -> Result<Option<Value>, PathError> {
    let Some((head, rest)) = segments.split_first() else {
        return Err(PathError::EmptyPath);
    };
    if rest.is_empty() {
        return Ok(doc.insert(*head, value));
    }
    if doc.get(head).is_none() {
        doc.insert(*head, Document::new());
    }
    match doc.get_mut(head) {
        Some(child) => set_in_value(child, rest, value, full),
        None => Err(PathError::EmptyPath),
    }
}

fn set_in_value(
    target: &mut Value,
    segments: &[&str],
    value: Value,
    full: &str,
) -> Result<Option<Value>, PathError> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(Some(std::mem::replace(target, value)));
    };
    match target {
        Value::Document(doc) => set_in_document(doc, segments, value, full),
        Value::Array(items) => {
            let idx: usize = head.parse().map_err(|_| PathError::NotTraversable {
                path: full.to_string(),
                segment: head.to_string(),
                found: "array",
            })?;
            if idx > items.len() + MAX_ARRAY_PAD {
                return Err(PathError::IndexOutOfRange {
                    path: full.to_string(),
                    index: idx,
                });
            }
            while items.len() <= idx {
                items.push(Value::Null);
            }
            if rest.is_empty() {
                return Ok(Some(std::mem::replace(&mut items[idx], value)));
            }
            if items[idx].is_null() {
                items[idx] = Value::Document(Document::new());
            }
            set_in_value(&mut items[idx], rest, value, full)
        }
        other => Err(PathError::NotTraversable {
            path: full.to_string(),
            segment: head.to_string(),
            found: other.type_name(),
        }),
    }
}

/// Mutable single-value resolution (no fan-out)
pub(crate) fn resolve_mut<'a>(doc: &'a mut Document, path: &str) -> Option<&'a mut Value> {
    let segments = split_path(path).ok()?;
    let (head, rest) = segments.split_first()?;
    let mut current = doc.get_mut(head)?;
    for seg in rest {
        current = match current {
            Value::Document(d) => d.get_mut(seg)?,
            Value::Array(items) => items.get_mut(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// True if the paths are equal or one lies under the other
/// (`a` and `a.b`, but not `a` and `ab`).
pub fn paths_overlap(a: &str, b: &str) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    long.strip_prefix(short)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

/// Removes the value at `path`.
///
/// Removing a positional array element leaves a null in its place so that
/// sibling positions do not shift.
pub fn remove_path(doc: &mut Document, path: &str) -> Option<Value> {
    let segments = split_path(path).ok()?;
    let (last, parents) = segments.split_last()?;
    if parents.is_empty() {
        return doc.remove(last);
    }
    let parent_path = parents.join(".");
    match resolve_mut(doc, &parent_path)? {
        Value::Document(d) => d.remove(last),
        Value::Array(items) => {
            let slot = items.get_mut(last.parse::<usize>().ok()?)?;
            Some(std::mem::replace(slot, Value::Null))
        }
        _ => None,
    }
}
