use crate::{
    query::{
        Connector, Query, QueryItem,
        criteria::{CriteriaOperator, ResolvedValue},
    },
    traits::FieldValues,
    value::{TextOp, Value, compare_eq, compare_order, compare_text},
};
use std::{
    any::{Any, TypeId},
    cmp::Ordering,
    fmt,
    rc::Rc,
};

///
/// CachedPredicate
///
/// One compiled predicate slot, keyed by record type. The revision pins
/// the query structure the closure was lowered from; a stale revision
/// means the slot is dead and gets recompiled.
///

#[derive(Clone)]
pub(crate) struct CachedPredicate {
    revision: u64,
    func: Rc<dyn Any>,
}

impl fmt::Debug for CachedPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedPredicate")
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

struct TypedPredicate<T>(Rc<dyn Fn(&T) -> bool>);

///
/// Lowered
///
/// Immutable snapshot of a query's condition tree with every criteria
/// value resolved. The compiled closure evaluates this snapshot; later
/// query mutations never reach it.
///

enum Lowered {
    Leaf(LoweredLeaf),
    Group(Vec<(Connector, Lowered)>),
}

struct LoweredLeaf {
    field: String,
    operator: CriteriaOperator,
    value: Value,
}

impl Query {
    /// Compile this query into a reusable in-memory filter for `T`,
    /// memoized per record type until the query is mutated.
    ///
    /// Contract:
    /// - complex queries (any subquery, join, or recursion descriptor)
    ///   compile to the constant `false`: in-memory evaluation refuses
    ///   to approximate their semantics
    /// - raw-text and obsolete queries also compile to constant `false`
    ///   (not locally verifiable)
    /// - a query with no items compiles to constant `true`
    #[must_use]
    pub fn compiled_predicate<T: FieldValues + 'static>(&self) -> Rc<dyn Fn(&T) -> bool> {
        if self.obsolete || self.is_complex() || self.text.is_some() {
            return Rc::new(|_| false);
        }
        if self.items.is_empty() {
            return Rc::new(|_| true);
        }

        let type_id = TypeId::of::<T>();
        if let Some(cached) = self.compiled.borrow().get(&type_id) {
            if cached.revision == self.revision {
                if let Ok(typed) = Rc::clone(&cached.func).downcast::<TypedPredicate<T>>() {
                    return Rc::clone(&typed.0);
                }
            }
        }

        let func = self.lower_predicate::<T>();
        self.compiled.borrow_mut().insert(
            type_id,
            CachedPredicate {
                revision: self.revision,
                func: Rc::new(TypedPredicate(Rc::clone(&func))),
            },
        );

        func
    }

    /// Evaluate the compiled predicate against one record.
    #[must_use]
    pub fn matches<T: FieldValues + 'static>(&self, record: &T) -> bool {
        self.compiled_predicate::<T>()(record)
    }

    /// Filter, sort, and page an in-memory collection.
    #[must_use]
    pub fn filter_in_memory<T: FieldValues + 'static>(&self, records: Vec<T>) -> Vec<T> {
        let predicate = self.compiled_predicate::<T>();
        let mut out: Vec<T> = records.into_iter().filter(|r| predicate(r)).collect();

        self.sort_records(&mut out);

        if let Some(page) = self.page {
            let offset = page.offset as usize;
            if offset >= out.len() {
                out.clear();
            } else {
                out.drain(..offset);
                if let Some(limit) = page.limit {
                    out.truncate(limit as usize);
                }
            }
        }

        out
    }

    fn lower_predicate<T: FieldValues>(&self) -> Rc<dyn Fn(&T) -> bool> {
        match lower_items(&self.items) {
            Some(lowered) => Rc::new(move |record: &T| eval_group(record, &lowered)),
            None => Rc::new(|_| false),
        }
    }
}

fn lower_items(items: &[(Connector, QueryItem)]) -> Option<Vec<(Connector, Lowered)>> {
    let mut out = Vec::with_capacity(items.len());

    for (connector, item) in items {
        let lowered = match item {
            QueryItem::Criteria(criteria) => {
                // A nested-query value cannot be lowered; complexity
                // flags keep this path unreachable from the compiler.
                let ResolvedValue::Value(value) = criteria.resolve() else {
                    return None;
                };
                Lowered::Leaf(LoweredLeaf {
                    field: criteria.field().to_string(),
                    operator: criteria.operator(),
                    value: value.clone(),
                })
            }
            QueryItem::Group(group) => Lowered::Group(lower_items(&group.items)?),
        };
        out.push((*connector, lowered));
    }

    Some(out)
}

/// Fold a group's items left-to-right: the first item's connector is
/// ignored, each subsequent item combines the running result via its own
/// connector. An empty group is vacuously true.
fn eval_group<T: FieldValues>(record: &T, items: &[(Connector, Lowered)]) -> bool {
    let mut iter = items.iter();
    let Some((_, first)) = iter.next() else {
        return true;
    };

    let mut acc = eval_node(record, first);
    for (connector, node) in iter {
        acc = match connector {
            Connector::And => acc && eval_node(record, node),
            Connector::Or => acc || eval_node(record, node),
        };
    }

    acc
}

fn eval_node<T: FieldValues>(record: &T, node: &Lowered) -> bool {
    match node {
        Lowered::Leaf(leaf) => eval_leaf(record, leaf),
        Lowered::Group(items) => eval_group(record, items),
    }
}

fn eval_leaf<T: FieldValues>(record: &T, leaf: &LoweredLeaf) -> bool {
    let actual = record.get_value(&leaf.field);

    match leaf.operator {
        // A missing field counts as null.
        CriteriaOperator::IsNull => actual.is_none_or(|value| value.is_null()),
        CriteriaOperator::NotNull => actual.is_some_and(|value| !value.is_null()),
        operator => {
            let Some(actual) = actual else {
                return false;
            };
            eval_compare(&actual, operator, &leaf.value)
        }
    }
}

/// Undefined comparisons evaluate to `false`; negated forms require the
/// comparison to be defined before negating.
fn eval_compare(actual: &Value, operator: CriteriaOperator, value: &Value) -> bool {
    match operator {
        CriteriaOperator::Equal => compare_eq(actual, value).unwrap_or(false),
        CriteriaOperator::NotEqual => compare_eq(actual, value).is_some_and(|eq| !eq),

        CriteriaOperator::LessThan => compare_order(actual, value).is_some_and(Ordering::is_lt),
        CriteriaOperator::LessThanOrEqual => {
            compare_order(actual, value).is_some_and(Ordering::is_le)
        }
        CriteriaOperator::GreaterThan => compare_order(actual, value).is_some_and(Ordering::is_gt),
        CriteriaOperator::GreaterThanOrEqual => {
            compare_order(actual, value).is_some_and(Ordering::is_ge)
        }

        CriteriaOperator::In => in_list(actual, value).unwrap_or(false),
        CriteriaOperator::NotIn => in_list(actual, value).is_some_and(|matched| !matched),

        CriteriaOperator::Like => {
            compare_text(actual, value, TextOp::Contains).unwrap_or(false)
        }
        CriteriaOperator::NotLike => {
            compare_text(actual, value, TextOp::Contains).is_some_and(|matched| !matched)
        }
        CriteriaOperator::BeginLike => {
            compare_text(actual, value, TextOp::StartsWith).unwrap_or(false)
        }
        CriteriaOperator::NotBeginLike => {
            compare_text(actual, value, TextOp::StartsWith).is_some_and(|matched| !matched)
        }
        CriteriaOperator::EndLike => {
            compare_text(actual, value, TextOp::EndsWith).unwrap_or(false)
        }
        CriteriaOperator::NotEndLike => {
            compare_text(actual, value, TextOp::EndsWith).is_some_and(|matched| !matched)
        }

        // Null tests are handled by the caller on the optional field.
        CriteriaOperator::IsNull | CriteriaOperator::NotNull => false,
    }
}

/// Check whether a value equals any element in a list. `None` when the
/// set is not a list or no element comparison is defined.
fn in_list(actual: &Value, list: &Value) -> Option<bool> {
    let Value::List(items) = list else {
        return None;
    };

    let mut saw_valid = false;
    for item in items {
        match compare_eq(actual, item) {
            Some(true) => return Some(true),
            Some(false) => saw_valid = true,
            None => {}
        }
    }

    saw_valid.then_some(false)
}
