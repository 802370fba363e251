use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

///
/// Value
///
/// Closed sum type for every criteria literal and resolved field value.
/// Values are plain data: no schema, no validation, no execution
/// semantics. All interpretation happens in comparison helpers and the
/// predicate compiler.
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Canonical variant rank used for deterministic cross-variant ordering.
    #[must_use]
    pub(crate) const fn canonical_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::Uint(_) => 3,
            Self::Float(_) => 4,
            Self::Text(_) => 5,
            Self::List(_) => 6,
        }
    }
}

///
/// TextOp
///
/// Text match shapes supported by `compare_text`.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TextOp {
    Contains,
    StartsWith,
    EndsWith,
}

///
/// NumericRepr
///
/// Unified numeric view used for cross-variant widening.
///

enum NumericRepr {
    Int(i128),
    Float(f64),
    None,
}

const fn numeric_repr(value: &Value) -> NumericRepr {
    match value {
        Value::Int(n) => NumericRepr::Int(*n as i128),
        Value::Uint(n) => NumericRepr::Int(*n as i128),
        Value::Float(f) => NumericRepr::Float(*f),
        _ => NumericRepr::None,
    }
}

#[expect(clippy::cast_precision_loss)]
fn numeric_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    match (numeric_repr(left), numeric_repr(right)) {
        (NumericRepr::Int(a), NumericRepr::Int(b)) => Some(a.cmp(&b)),
        (NumericRepr::Float(a), NumericRepr::Float(b)) => a.partial_cmp(&b),
        (NumericRepr::Int(a), NumericRepr::Float(b)) => (a as f64).partial_cmp(&b),
        (NumericRepr::Float(a), NumericRepr::Int(b)) => a.partial_cmp(&(b as f64)),
        _ => None,
    }
}

/// Equality comparison with numeric widening across `Int`/`Uint`/`Float`.
///
/// Returns `None` when the comparison is not defined for the given pair;
/// callers decide how undefined comparisons evaluate.
#[must_use]
pub fn compare_eq(left: &Value, right: &Value) -> Option<bool> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(true),
        (Value::Null, _) | (_, Value::Null) => Some(false),
        (Value::Bool(a), Value::Bool(b)) => Some(a == b),
        (Value::Text(a), Value::Text(b)) => Some(a == b),
        (Value::List(a), Value::List(b)) => compare_eq_list(a, b),
        _ => numeric_cmp(left, right).map(Ordering::is_eq),
    }
}

fn compare_eq_list(left: &[Value], right: &[Value]) -> Option<bool> {
    if left.len() != right.len() {
        return Some(false);
    }

    for (a, b) in left.iter().zip(right.iter()) {
        match compare_eq(a, b) {
            Some(true) => {}
            Some(false) => return Some(false),
            None => return None,
        }
    }

    Some(true)
}

/// Ordering comparison for orderable pairs.
///
/// Defined for widened numerics, text, and bool; `None` for nulls, lists,
/// NaN, and mismatched non-numeric variants.
#[must_use]
pub fn compare_order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        _ => numeric_cmp(left, right),
    }
}

/// Text match comparison. Defined only when both sides are `Text`.
#[must_use]
pub fn compare_text(left: &Value, right: &Value, op: TextOp) -> Option<bool> {
    let (Value::Text(actual), Value::Text(pattern)) = (left, right) else {
        return None;
    };

    Some(match op {
        TextOp::Contains => actual.contains(pattern.as_str()),
        TextOp::StartsWith => actual.starts_with(pattern.as_str()),
        TextOp::EndsWith => actual.ends_with(pattern.as_str()),
    })
}

/// Total canonical comparator used by the in-memory sorter.
///
/// Ordering rules:
/// 1. Canonical variant rank
/// 2. Variant-specific comparison for same-ranked values
///
/// Mixed-variant comparisons are rank-only and must remain deterministic.
#[must_use]
pub fn canonical_cmp(left: &Value, right: &Value) -> Ordering {
    let rank = left.canonical_rank().cmp(&right.canonical_rank());
    if rank != Ordering::Equal {
        return rank;
    }

    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Uint(a), Value::Uint(b)) => a.cmp(b),
        (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (Value::List(a), Value::List(b)) => canonical_cmp_list(a, b),
        _ => Ordering::Equal,
    }
}

fn canonical_cmp_list(left: &[Value], right: &[Value]) -> Ordering {
    for (a, b) in left.iter().zip(right.iter()) {
        let cmp = canonical_cmp(a, b);
        if cmp != Ordering::Equal {
            return cmp;
        }
    }

    left.len().cmp(&right.len())
}

// ----------------------------------------------------------------------
// Boundary conversions
// ----------------------------------------------------------------------

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Uint(u64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(v: Vec<V>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(v: Option<V>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_widening_compares_across_variants() {
        assert_eq!(
            compare_eq(&Value::Int(5), &Value::Uint(5)),
            Some(true),
            "int and uint with the same magnitude should compare equal"
        );
        assert_eq!(
            compare_order(&Value::Uint(3), &Value::Float(3.5)),
            Some(Ordering::Less),
            "uint should order below a larger float"
        );
    }

    #[test]
    fn undefined_comparisons_return_none() {
        assert_eq!(compare_eq(&Value::Bool(true), &Value::Int(1)), None);
        assert_eq!(compare_order(&Value::Null, &Value::Int(1)), None);
        assert_eq!(
            compare_text(&Value::Int(1), &Value::Text("1".to_string()), TextOp::Contains),
            None,
            "text matching against a non-text value is undefined"
        );
    }

    #[test]
    fn null_equality_is_defined() {
        assert_eq!(compare_eq(&Value::Null, &Value::Null), Some(true));
        assert_eq!(compare_eq(&Value::Null, &Value::Int(0)), Some(false));
    }

    #[test]
    fn canonical_cmp_is_rank_first_and_total() {
        assert_eq!(
            canonical_cmp(&Value::Null, &Value::Text("a".to_string())),
            Ordering::Less,
            "null ranks below every non-null variant"
        );
        assert_eq!(
            canonical_cmp(&Value::Float(f64::NAN), &Value::Float(f64::NAN)),
            Ordering::Equal,
            "total float comparison must be defined for NaN"
        );
    }

    #[test]
    fn serialized_form_is_externally_tagged() {
        let value = Value::List(vec![Value::Null, Value::Int(5), Value::Text("a".to_string())]);
        let json = serde_json::to_value(&value).expect("value should serialize");
        assert_eq!(
            json,
            serde_json::json!({ "List": ["Null", { "Int": 5 }, { "Text": "a" }] }),
            "wire shape is part of the contract"
        );

        let back: Value = serde_json::from_value(json).expect("value should deserialize");
        assert_eq!(back, value);
    }

    #[test]
    fn text_ops_cover_substring_prefix_suffix() {
        let hay = Value::Text("warehouse".to_string());
        let sub = Value::Text("house".to_string());
        assert_eq!(compare_text(&hay, &sub, TextOp::Contains), Some(true));
        assert_eq!(compare_text(&hay, &sub, TextOp::StartsWith), Some(false));
        assert_eq!(compare_text(&hay, &sub, TextOp::EndsWith), Some(true));
    }
}
