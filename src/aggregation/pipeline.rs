//! Pipeline definition and validation

use serde::{Deserialize, Serialize};

use super::errors::{PipelineError, PipelineResult};
use super::expr::Expr;
use crate::query::{validate_sort, Filter, SortKey};
use crate::value::{paths_overlap, split_path, ID_FIELD};

/// Per-partition reduction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccumulatorOp {
    /// Sum of numeric operand values, 0 if none
    Sum(Expr),
    /// Mean of numeric operand values, null if none
    Avg(Expr),
    /// Members in the partition
    Count,
    Min(Expr),
    Max(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accumulator {
    pub name: String,
    pub op: AccumulatorOp,
}

impl Accumulator {
    pub fn sum(name: impl Into<String>, operand: Expr) -> Self {
        Self {
            name: name.into(),
            op: AccumulatorOp::Sum(operand),
        }
    }

    pub fn avg(name: impl Into<String>, operand: Expr) -> Self {
        Self {
            name: name.into(),
            op: AccumulatorOp::Avg(operand),
        }
    }

    pub fn count(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: AccumulatorOp::Count,
        }
    }

    pub fn min(name: impl Into<String>, operand: Expr) -> Self {
        Self {
            name: name.into(),
            op: AccumulatorOp::Min(operand),
        }
    }

    pub fn max(name: impl Into<String>, operand: Expr) -> Self {
        Self {
            name: name.into(),
            op: AccumulatorOp::Max(operand),
        }
    }

    fn operand(&self) -> Option<&Expr> {
        match &self.op {
            AccumulatorOp::Sum(e)
            | AccumulatorOp::Avg(e)
            | AccumulatorOp::Min(e)
            | AccumulatorOp::Max(e) => Some(e),
            AccumulatorOp::Count => None,
        }
    }
}

/// One output field of a `project` stage.
///
/// Without an expression the field is copied from the same path of the
/// input document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectField {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<Expr>,
}

impl ProjectField {
    pub fn include(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            expr: None,
        }
    }

    pub fn computed(path: impl Into<String>, expr: Expr) -> Self {
        Self {
            path: path.into(),
            expr: Some(expr),
        }
    }

    /// `path` takes the value found at `source`
    pub fn rename(path: impl Into<String>, source: impl Into<String>) -> Self {
        Self::computed(path, Expr::Field(source.into()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Match(Filter),
    Group {
        key: Expr,
        #[serde(default)]
        accumulators: Vec<Accumulator>,
    },
    Project(Vec<ProjectField>),
    Sort(Vec<SortKey>),
    Skip(usize),
    Limit(usize),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Match(_) => "match",
            Stage::Group { .. } => "group",
            Stage::Project(_) => "project",
            Stage::Sort(_) => "sort",
            Stage::Skip(_) => "skip",
            Stage::Limit(_) => "limit",
        }
    }

    fn validate(&self, position: usize) -> PipelineResult<()> {
        let invalid = |reason: String| PipelineError::invalid_stage(position, reason);
        match self {
            Stage::Match(filter) => {
                filter
                    .validate()
                    .map_err(|e| PipelineError::invalid_filter(position, e))?;
                if position > 0 && filter.text_query().is_some() {
                    return Err(invalid(
                        "a text filter is only allowed in the first stage".to_string(),
                    ));
                }
            }
            Stage::Group { key, accumulators } => {
                key.validate().map_err(|e| invalid(format!("group key: {}", e)))?;
                for (i, acc) in accumulators.iter().enumerate() {
                    if acc.name.is_empty() || acc.name.contains('.') {
                        return Err(invalid(format!("invalid output name '{}'", acc.name)));
                    }
                    if acc.name == ID_FIELD {
                        return Err(invalid("_id is reserved for the group key".to_string()));
                    }
                    if accumulators[..i].iter().any(|a| a.name == acc.name) {
                        return Err(invalid(format!("duplicate output '{}'", acc.name)));
                    }
                    if let Some(operand) = acc.operand() {
                        operand
                            .validate()
                            .map_err(|e| invalid(format!("{}: {}", acc.name, e)))?;
                    }
                }
            }
            Stage::Project(fields) => {
                if fields.is_empty() {
                    return Err(invalid("project lists no fields".to_string()));
                }
                for (i, field) in fields.iter().enumerate() {
                    split_path(&field.path).map_err(|e| invalid(e.to_string()))?;
                    let earlier = &fields[..i];
                    let overlapping = earlier.iter().find(|f| paths_overlap(&f.path, &field.path));
                    if let Some(other) = overlapping {
                        return Err(invalid(format!(
                            "output '{}' overlaps '{}'",
                            field.path, other.path
                        )));
                    }
                    if field.path.starts_with("_id.") {
                        return Err(invalid(format!(
                            "output '{}' would nest under _id",
                            field.path
                        )));
                    }
                    if let Some(expr) = &field.expr {
                        expr.validate()
                            .map_err(|e| invalid(format!("{}: {}", field.path, e)))?;
                    }
                }
            }
            Stage::Sort(keys) => {
                if keys.is_empty() {
                    return Err(invalid("sort lists no keys".to_string()));
                }
                validate_sort(keys).map_err(|e| invalid(e.message().to_string()))?;
            }
            Stage::Skip(_) => {}
            Stage::Limit(n) => {
                if *n == 0 {
                    return Err(invalid("limit must be > 0".to_string()));
                }
            }
        }
        Ok(())
    }
}

/// Ordered stages plus input options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
    /// Feed soft-deleted documents into the first stage. Unset means the
    /// database default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_deleted: Option<bool>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self {
            stages,
            include_deleted: None,
        }
    }

    pub fn include_deleted(mut self, include: bool) -> Self {
        self.include_deleted = Some(include);
        self
    }

    pub fn validate(&self) -> PipelineResult<()> {
        self.stages
            .iter()
            .enumerate()
            .try_for_each(|(i, stage)| stage.validate(i))
    }

    /// Filter of a leading `match` stage, used to select the input
    pub fn leading_match(&self) -> Option<&Filter> {
        match self.stages.first() {
            Some(Stage::Match(filter)) => Some(filter),
            _ => None,
        }
    }
}
