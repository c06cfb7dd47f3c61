//! Stage execution
//!
//! Every stage consumes the full output of the previous one. Execution is
//! deterministic for a given input order: groups are emitted in order of
//! first appearance and sorts are stable.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::expr::Expr;
use super::pipeline::{Accumulator, AccumulatorOp, ProjectField, Stage};
use crate::index::KeyPart;
use crate::query::sort_documents;
use crate::value::{compare_values, resolve, set_path, Document, Value, ID_FIELD};

/// Runs validated `stages` over `input`
pub fn execute(stages: &[Stage], input: Vec<Document>) -> Vec<Document> {
    stages.iter().fold(input, |docs, stage| run_stage(stage, docs))
}

fn run_stage(stage: &Stage, mut docs: Vec<Document>) -> Vec<Document> {
    match stage {
        Stage::Match(filter) => {
            docs.retain(|d| filter.matches(d));
            docs
        }
        Stage::Group { key, accumulators } => group(key, accumulators, docs),
        Stage::Project(fields) => docs.iter().map(|d| project(fields, d)).collect(),
        Stage::Sort(keys) => {
            sort_documents(&mut docs, keys, |d| d);
            docs
        }
        Stage::Skip(n) => docs.into_iter().skip(*n).collect(),
        Stage::Limit(n) => {
            docs.truncate(*n);
            docs
        }
    }
}

/// Hashable form of a group key; ints and floats that compare equal
/// share a partition
#[derive(Debug, PartialEq, Eq, Hash)]
enum GroupKey {
    Part(KeyPart),
    List(Vec<GroupKey>),
    Map(Vec<(String, GroupKey)>),
}

impl GroupKey {
    fn of(value: &Value) -> GroupKey {
        match value {
            Value::Array(items) => GroupKey::List(items.iter().map(GroupKey::of).collect()),
            Value::Document(doc) => GroupKey::Map(
                doc.iter()
                    .map(|(k, v)| (k.to_string(), GroupKey::of(v)))
                    .collect(),
            ),
            scalar => GroupKey::Part(KeyPart::from_value(scalar).unwrap_or(KeyPart::Null)),
        }
    }
}

enum AccState {
    Sum { int: i64, float: f64, is_float: bool },
    Avg { total: f64, n: u64 },
    Count(u64),
    Min(Option<Value>),
    Max(Option<Value>),
}

impl AccState {
    fn new(op: &AccumulatorOp) -> Self {
        match op {
            AccumulatorOp::Sum(_) => AccState::Sum {
                int: 0,
                float: 0.0,
                is_float: false,
            },
            AccumulatorOp::Avg(_) => AccState::Avg { total: 0.0, n: 0 },
            AccumulatorOp::Count => AccState::Count(0),
            AccumulatorOp::Min(_) => AccState::Min(None),
            AccumulatorOp::Max(_) => AccState::Max(None),
        }
    }

    fn add(&mut self, op: &AccumulatorOp, doc: &Document) {
        let operand = match op {
            AccumulatorOp::Sum(e)
            | AccumulatorOp::Avg(e)
            | AccumulatorOp::Min(e)
            | AccumulatorOp::Max(e) => e.eval(doc),
            AccumulatorOp::Count => None,
        };
        match self {
            AccState::Sum { int, float, is_float } => match operand {
                Some(Value::Int(i)) if !*is_float => match int.checked_add(i) {
                    Some(sum) => *int = sum,
                    None => {
                        *is_float = true;
                        *float = *int as f64 + i as f64;
                    }
                },
                Some(Value::Int(i)) => *float += i as f64,
                Some(Value::Float(f)) => {
                    if !*is_float {
                        *is_float = true;
                        *float = *int as f64;
                    }
                    *float += f;
                }
                _ => {}
            },
            AccState::Avg { total, n } => {
                if let Some(x) = operand.as_ref().filter(|v| v.is_number()).and_then(Value::as_f64) {
                    *total += x;
                    *n += 1;
                }
            }
            AccState::Count(n) => *n += 1,
            AccState::Min(best) => keep(best, operand, Ordering::Less),
            AccState::Max(best) => keep(best, operand, Ordering::Greater),
        }
    }

    fn finish(self) -> Value {
        match self {
            AccState::Sum { int, float, is_float } => {
                if is_float {
                    Value::Float(float)
                } else {
                    Value::Int(int)
                }
            }
            AccState::Avg { total, n } => {
                if n == 0 {
                    Value::Null
                } else {
                    Value::Float(total / n as f64)
                }
            }
            AccState::Count(n) => Value::Int(i64::try_from(n).unwrap_or(i64::MAX)),
            AccState::Min(best) | AccState::Max(best) => best.unwrap_or(Value::Null),
        }
    }
}

/// Replaces `best` when `candidate` orders `wanted` against it; nulls are skipped
fn keep(best: &mut Option<Value>, candidate: Option<Value>, wanted: Ordering) {
    let Some(candidate) = candidate.filter(|v| !v.is_null()) else {
        return;
    };
    let replace = match best {
        None => true,
        Some(current) => compare_values(&candidate, current) == wanted,
    };
    if replace {
        *best = Some(candidate);
    }
}

fn group(key: &Expr, accumulators: &[Accumulator], docs: Vec<Document>) -> Vec<Document> {
    let mut positions: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<(Value, Vec<AccState>)> = Vec::new();

    for doc in &docs {
        let key_value = key.eval(doc).unwrap_or(Value::Null);
        let slot = *positions.entry(GroupKey::of(&key_value)).or_insert_with(|| {
            groups.push((
                key_value.clone(),
                accumulators.iter().map(|a| AccState::new(&a.op)).collect(),
            ));
            groups.len() - 1
        });
        for (state, acc) in groups[slot].1.iter_mut().zip(accumulators) {
            state.add(&acc.op, doc);
        }
    }

    groups
        .into_iter()
        .map(|(key_value, states)| {
            let mut out = Document::new();
            out.insert(ID_FIELD, key_value);
            for (state, acc) in states.into_iter().zip(accumulators) {
                out.insert(acc.name.clone(), state.finish());
            }
            out
        })
        .collect()
}

fn project(fields: &[ProjectField], doc: &Document) -> Document {
    let mut out = Document::new();
    if !fields.iter().any(|f| f.path == ID_FIELD) {
        if let Some(id) = doc.id() {
            out.insert(ID_FIELD, id.clone());
        }
    }
    for field in fields {
        let value = match &field.expr {
            None => resolve(doc, &field.path).cloned(),
            Some(expr) => expr.eval(doc),
        };
        if let Some(value) = value {
            // validated outputs are disjoint and never nest under _id
            let _ = set_path(&mut out, &field.path, value);
        }
    }
    out
}
