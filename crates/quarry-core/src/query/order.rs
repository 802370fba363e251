use crate::{
    query::Query,
    traits::FieldValues,
    value::{Value, canonical_cmp, compare_order},
};
use std::{cmp::Ordering, fmt, rc::Rc};

///
/// OrderCriteria
///
/// One sort key: field name, direction, and an optional value transform
/// applied before comparison. Keys are applied left-to-right as a stable
/// multi-key sort; the first key is primary, subsequent keys break ties.
///

#[derive(Clone)]
pub struct OrderCriteria {
    pub field: String,
    pub desc: bool,
    pub transform: Option<Rc<dyn Fn(Value) -> Value>>,
}

impl OrderCriteria {
    #[must_use]
    pub fn new(field: impl Into<String>, desc: bool) -> Self {
        Self {
            field: field.into(),
            desc,
            transform: None,
        }
    }

    #[must_use]
    pub fn with_transform(
        field: impl Into<String>,
        desc: bool,
        transform: impl Fn(Value) -> Value + 'static,
    ) -> Self {
        Self {
            field: field.into(),
            desc,
            transform: Some(Rc::new(transform)),
        }
    }

    /// Apply the value transform, if one is declared.
    #[must_use]
    pub fn apply(&self, value: Value) -> Value {
        match &self.transform {
            Some(transform) => transform(value),
            None => value,
        }
    }
}

impl fmt::Debug for OrderCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderCriteria")
            .field("field", &self.field)
            .field("desc", &self.desc)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

impl Query {
    /// Append an ascending sort key.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.orders.push(OrderCriteria::new(field, false));
        self
    }

    /// Append a descending sort key.
    #[must_use]
    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.orders.push(OrderCriteria::new(field, true));
        self
    }

    /// Append a sort key with a value transform applied before
    /// comparison.
    #[must_use]
    pub fn order_by_with(
        mut self,
        field: impl Into<String>,
        desc: bool,
        transform: impl Fn(Value) -> Value + 'static,
    ) -> Self {
        self.orders
            .push(OrderCriteria::with_transform(field, desc, transform));
        self
    }

    /// Stable multi-key in-memory sort: the first declared key is
    /// primary, subsequent keys break ties. Missing fields sort as null.
    pub fn sort_records<T: FieldValues>(&self, records: &mut [T]) {
        if self.orders.is_empty() {
            return;
        }

        records.sort_by(|a, b| self.compare_records(a, b));
    }

    fn compare_records<T: FieldValues>(&self, a: &T, b: &T) -> Ordering {
        for order in &self.orders {
            let left = order.apply(a.get_value(&order.field).unwrap_or(Value::Null));
            let right = order.apply(b.get_value(&order.field).unwrap_or(Value::Null));

            // Orderable pairs compare naturally; everything else falls
            // back to the canonical comparator for determinism.
            let mut cmp =
                compare_order(&left, &right).unwrap_or_else(|| canonical_cmp(&left, &right));
            if order.desc {
                cmp = cmp.reverse();
            }
            if cmp != Ordering::Equal {
                return cmp;
            }
        }

        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn row(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn multi_key_sort_is_stable_and_left_to_right() {
        let mut rows = vec![
            row(&[("name", Value::from("b")), ("age", Value::Int(30))]),
            row(&[("name", Value::from("a")), ("age", Value::Int(30))]),
            row(&[("name", Value::from("c")), ("age", Value::Int(20))]),
        ];

        let query = Query::new().order_by_desc("age").order_by("name");
        query.sort_records(&mut rows);

        let names: Vec<Value> = rows
            .iter()
            .map(|r| r.get("name").cloned().unwrap_or(Value::Null))
            .collect();
        assert_eq!(
            names,
            vec![Value::from("a"), Value::from("b"), Value::from("c")],
            "age is primary descending, name breaks the tie ascending"
        );
    }

    #[test]
    fn missing_fields_sort_as_null_before_values() {
        let mut rows = vec![
            row(&[("age", Value::Int(1))]),
            row(&[]),
            row(&[("age", Value::Int(2))]),
        ];

        let query = Query::new().order_by("age");
        query.sort_records(&mut rows);

        assert!(
            rows[0].get("age").is_none(),
            "a missing sort field ranks below every present value"
        );
    }

    #[test]
    fn value_transform_applies_before_comparison() {
        let mut rows = vec![
            row(&[("name", Value::from("BETA"))]),
            row(&[("name", Value::from("alpha"))]),
        ];

        let query = Query::new().order_by_with("name", false, |value| match value {
            Value::Text(text) => Value::Text(text.to_lowercase()),
            other => other,
        });
        query.sort_records(&mut rows);

        assert_eq!(
            rows[0].get("name"),
            Some(&Value::from("alpha")),
            "case-folding transform should decide the order"
        );
    }
}
