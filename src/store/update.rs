//! Field-level update operations
//!
//! Operations apply in order to a working copy of the document; the stored
//! document is replaced only if every operation succeeds.

use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};
use crate::value::{
    remove_path, resolve_mut, set_path, split_path, values_equal, Document, Value, ID_FIELD,
};

/// Field stamped with the time of every successful update
pub const UPDATED_AT_FIELD: &str = "updated_at";

/// One field-level mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOp {
    /// Replace or create the value at `path`
    Set { path: String, value: Value },
    /// Remove the value at `path`; missing paths are a no-op
    Unset { path: String },
    /// Add `by` to a number; a missing path starts from zero
    Increment { path: String, by: Value },
    /// Append to an array; a missing path becomes a one-element array
    Push { path: String, value: Value },
    /// Append unless an equal element exists
    AddToSet { path: String, value: Value },
}

impl UpdateOp {
    pub fn set(path: impl Into<String>, value: impl Into<Value>) -> Self {
        UpdateOp::Set {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn unset(path: impl Into<String>) -> Self {
        UpdateOp::Unset { path: path.into() }
    }

    pub fn increment(path: impl Into<String>, by: impl Into<Value>) -> Self {
        UpdateOp::Increment {
            path: path.into(),
            by: by.into(),
        }
    }

    pub fn push(path: impl Into<String>, value: impl Into<Value>) -> Self {
        UpdateOp::Push {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn add_to_set(path: impl Into<String>, value: impl Into<Value>) -> Self {
        UpdateOp::AddToSet {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            UpdateOp::Set { path, .. }
            | UpdateOp::Unset { path }
            | UpdateOp::Increment { path, .. }
            | UpdateOp::Push { path, .. }
            | UpdateOp::AddToSet { path, .. } => path,
        }
    }

    /// Structural checks that need no document
    fn validate(&self) -> StoreResult<()> {
        let path = self.path();
        let segments =
            split_path(path).map_err(|e| StoreError::invalid_update(e.to_string()))?;
        if segments[0] == ID_FIELD {
            return Err(StoreError::invalid_update("_id cannot be modified"));
        }
        if let UpdateOp::Increment { by, .. } = self {
            if !by.is_number() {
                return Err(StoreError::invalid_update(format!(
                    "increment of '{}' by a non-number ({})",
                    path,
                    by.type_name()
                )));
            }
        }
        Ok(())
    }

    fn apply(&self, doc: &mut Document) -> StoreResult<()> {
        let path = self.path();
        match self {
            UpdateOp::Set { value, .. } => {
                set_path(doc, path, value.clone())
                    .map_err(|e| StoreError::invalid_update(e.to_string()))?;
            }
            UpdateOp::Unset { .. } => {
                remove_path(doc, path);
            }
            UpdateOp::Increment { by, .. } => match resolve_mut(doc, path) {
                Some(current) => *current = add_numbers(path, current, by)?,
                None => {
                    set_path(doc, path, by.clone())
                        .map_err(|e| StoreError::invalid_update(e.to_string()))?;
                }
            },
            UpdateOp::Push { value, .. } => append(doc, path, value, false)?,
            UpdateOp::AddToSet { value, .. } => append(doc, path, value, true)?,
        }
        Ok(())
    }
}

fn add_numbers(path: &str, current: &Value, by: &Value) -> StoreResult<Value> {
    match (current, by) {
        (Value::Int(a), Value::Int(b)) => Ok(match a.checked_add(*b) {
            Some(sum) => Value::Int(sum),
            None => Value::Float(*a as f64 + *b as f64),
        }),
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Ok(Value::Float(x + y)),
            _ => Err(StoreError::invalid_update(format!(
                "cannot increment '{}': it holds a {}",
                path,
                current.type_name()
            ))),
        },
    }
}

fn append(doc: &mut Document, path: &str, value: &Value, unique: bool) -> StoreResult<()> {
    match resolve_mut(doc, path) {
        Some(Value::Array(items)) => {
            if !(unique && items.iter().any(|i| values_equal(i, value))) {
                items.push(value.clone());
            }
            Ok(())
        }
        Some(other) => Err(StoreError::invalid_update(format!(
            "cannot push onto '{}': it holds a {}",
            path,
            other.type_name()
        ))),
        None => set_path(doc, path, Value::Array(vec![value.clone()]))
            .map(|_| ())
            .map_err(|e| StoreError::invalid_update(e.to_string())),
    }
}

/// Rejects an empty batch and operations that are malformed on any document.
pub fn validate_ops(ops: &[UpdateOp]) -> StoreResult<()> {
    if ops.is_empty() {
        return Err(StoreError::invalid_update("no update operations given"));
    }
    ops.iter().try_for_each(UpdateOp::validate)
}

/// Outcome of applying a batch of operations
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// The document to store: stamped, then mutated
    pub document: Document,
    /// False when the operations changed nothing apart from the stamp
    pub applied: bool,
}

/// Applies `ops` to a copy of `current`.
///
/// `updated_at` is stamped before the operations run, so an explicit `set`
/// of that field wins. On error nothing is returned and `current` is
/// untouched.
pub fn apply_updates(current: &Document, ops: &[UpdateOp], now: Value) -> StoreResult<UpdateOutcome> {
    validate_ops(ops)?;

    let mut unstamped = current.clone();
    for op in ops {
        op.apply(&mut unstamped)?;
    }
    let applied = unstamped != *current;

    let mut document = current.clone();
    set_path(&mut document, UPDATED_AT_FIELD, now)
        .map_err(|e| StoreError::invalid_update(e.to_string()))?;
    for op in ops {
        op.apply(&mut document)?;
    }
    Ok(UpdateOutcome { document, applied })
}
