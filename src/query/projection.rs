//! Include-list projection
//!
//! The projected document holds `_id` followed by each listed path that
//! resolves, rebuilt at the same nested location. Paths that do not resolve
//! are omitted. Listed paths must be disjoint: `a` and `a.b` together are
//! rejected.

use serde::{Deserialize, Serialize};

use super::errors::{QueryError, QueryResult};
use crate::value::{paths_overlap, resolve, set_path, split_path, Document, ID_FIELD};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    pub fn include<S: Into<String>>(fields: Vec<S>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn validate(&self) -> QueryResult<()> {
        if self.fields.is_empty() {
            return Err(QueryError::invalid_filter("projection lists no fields"));
        }
        for (i, field) in self.fields.iter().enumerate() {
            split_path(field)
                .map_err(|e| QueryError::invalid_filter(format!("projection: {}", e)))?;
            if let Some(other) = self.fields[..i].iter().find(|f| paths_overlap(f, field)) {
                return Err(QueryError::invalid_filter(format!(
                    "projection: '{}' overlaps '{}'",
                    field, other
                )));
            }
        }
        Ok(())
    }

    /// Builds the projected copy of `doc`. Expects a validated projection.
    pub fn apply(&self, doc: &Document) -> Document {
        let mut out = Document::new();
        if let Some(id) = doc.id() {
            out.insert(ID_FIELD, id.clone());
        }
        for field in &self.fields {
            if let Some(value) = resolve(doc, field) {
                // disjoint paths only create documents, and ids are never documents
                let _ = set_path(&mut out, field, value.clone());
            }
        }
        out
    }
}
