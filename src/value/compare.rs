//! Canonical value ordering
//!
//! Values of different types order by type bracket first:
//!
//! null < numbers < strings < documents < arrays < bool < timestamps
//!
//! Ints and floats share one bracket and compare numerically. Within a
//! bracket, natural ordering applies. This is the single ordering used by
//! sort, range filters and index keys.

use std::cmp::Ordering;

use super::Value;

/// Type bracket of a value. Values only range-compare within a bracket.
pub fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Int(_) | Value::Float(_) => 1,
        Value::String(_) => 2,
        Value::Document(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
        Value::Timestamp(_) => 6,
    }
}

/// Total ordering over values
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let (ra, rb) = (type_rank(a), type_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }

    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Int(x), Value::Float(y)) => compare_int_float(*x, *y),
        (Value::Float(x), Value::Int(y)) => compare_int_float(*y, *x).reverse(),
        (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Timestamp(x), Value::Timestamp(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Document(x), Value::Document(y)) => {
            for ((lk, lv), (rk, rv)) in x.iter().zip(y.iter()) {
                let ord = lk.cmp(rk).then_with(|| compare_values(lv, rv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => Ordering::Equal,
    }
}

/// Exact int/float comparison. Ints beyond 2^53 that round to the same
/// f64 still order by their integer value.
fn compare_int_float(i: i64, f: f64) -> Ordering {
    let rounded = i as f64;
    rounded
        .total_cmp(&f)
        .then_with(|| i128::from(i).cmp(&(rounded as i128)))
}

/// Equality under the canonical ordering (`1 == 1.0`)
pub fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Ordering::Equal
}
