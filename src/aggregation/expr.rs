//! Pipeline expressions
//!
//! Used for group keys, accumulator operands and computed project fields.
//! Evaluation never fails: a field that does not resolve is absent, and
//! arithmetic over anything but numbers yields null.

use serde::{Deserialize, Serialize};

use crate::value::{resolve, split_path, Document, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Value at a dotted path
    Field(String),
    Literal(Value),
    /// Nested document of named sub-expressions, in order
    Object(Vec<(String, Expr)>),
    Add(Vec<Expr>),
    Subtract(Box<Expr>, Box<Expr>),
    Multiply(Vec<Expr>),
    Divide(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn field(path: impl Into<String>) -> Self {
        Expr::Field(path.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn object<S: Into<String>>(entries: Vec<(S, Expr)>) -> Self {
        Expr::Object(entries.into_iter().map(|(k, e)| (k.into(), e)).collect())
    }

    pub fn subtract(a: Expr, b: Expr) -> Self {
        Expr::Subtract(Box::new(a), Box::new(b))
    }

    pub fn divide(a: Expr, b: Expr) -> Self {
        Expr::Divide(Box::new(a), Box::new(b))
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        match self {
            Expr::Field(path) => split_path(path).map(|_| ()).map_err(|e| e.to_string()),
            Expr::Literal(_) => Ok(()),
            Expr::Object(entries) => {
                if entries.is_empty() {
                    return Err("object expression has no fields".to_string());
                }
                for (i, (name, expr)) in entries.iter().enumerate() {
                    if name.is_empty() || name.contains('.') {
                        return Err(format!("invalid object field name '{}'", name));
                    }
                    if entries[..i].iter().any(|(n, _)| n == name) {
                        return Err(format!("duplicate object field '{}'", name));
                    }
                    expr.validate()?;
                }
                Ok(())
            }
            Expr::Add(terms) | Expr::Multiply(terms) => {
                if terms.is_empty() {
                    return Err("arithmetic expression has no operands".to_string());
                }
                terms.iter().try_for_each(Expr::validate)
            }
            Expr::Subtract(a, b) | Expr::Divide(a, b) => {
                a.validate()?;
                b.validate()
            }
        }
    }

    /// Evaluates against `doc`; None means absent
    pub fn eval(&self, doc: &Document) -> Option<Value> {
        match self {
            Expr::Field(path) => resolve(doc, path).cloned(),
            Expr::Literal(value) => Some(value.clone()),
            Expr::Object(entries) => {
                let mut out = Document::new();
                for (name, expr) in entries {
                    if let Some(value) = expr.eval(doc) {
                        out.insert(name.clone(), value);
                    }
                }
                Some(Value::Document(out))
            }
            Expr::Add(terms) => Some(fold(doc, terms, i64::checked_add, |a, b| a + b)),
            Expr::Multiply(terms) => Some(fold(doc, terms, i64::checked_mul, |a, b| a * b)),
            Expr::Subtract(a, b) => Some(binary(doc, a, b, i64::checked_sub, |x, y| Some(x - y))),
            Expr::Divide(a, b) => Some(binary(doc, a, b, |_, _| None, |x, y| {
                if y == 0.0 {
                    None
                } else {
                    Some(x / y)
                }
            })),
        }
    }
}

enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn of(value: Option<Value>) -> Option<Number> {
        match value? {
            Value::Int(i) => Some(Number::Int(i)),
            Value::Float(f) => Some(Number::Float(f)),
            _ => None,
        }
    }

    fn as_f64(&self) -> f64 {
        match self {
            Number::Int(i) => *i as f64,
            Number::Float(f) => *f,
        }
    }
}

fn combine(
    a: Number,
    b: Number,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> Option<f64>,
) -> Option<Number> {
    if let (Number::Int(x), Number::Int(y)) = (&a, &b) {
        if let Some(r) = int_op(*x, *y) {
            return Some(Number::Int(r));
        }
    }
    float_op(a.as_f64(), b.as_f64()).map(Number::Float)
}

fn to_value(n: Option<Number>) -> Value {
    match n {
        Some(Number::Int(i)) => Value::Int(i),
        Some(Number::Float(f)) => Value::Float(f),
        None => Value::Null,
    }
}

fn fold(
    doc: &Document,
    terms: &[Expr],
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Value {
    let mut acc: Option<Number> = None;
    for term in terms {
        let Some(n) = Number::of(term.eval(doc)) else {
            return Value::Null;
        };
        acc = Some(match acc {
            None => n,
            Some(a) => match combine(a, n, int_op, |x, y| Some(float_op(x, y))) {
                Some(r) => r,
                None => return Value::Null,
            },
        });
    }
    to_value(acc)
}

fn binary(
    doc: &Document,
    a: &Expr,
    b: &Expr,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> Option<f64>,
) -> Value {
    match (Number::of(a.eval(doc)), Number::of(b.eval(doc))) {
        (Some(x), Some(y)) => to_value(combine(x, y, int_op, float_op)),
        _ => Value::Null,
    }
}
