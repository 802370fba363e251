use crate::{
    query::{
        Connector, Query, QueryItem,
        criteria::{Criteria, CriteriaOperator, CriteriaValue, ValueThunk},
    },
    value::Value,
};

///
/// CompareKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareKind {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareKind {
    const fn operator(self) -> CriteriaOperator {
        match self {
            Self::Eq => CriteriaOperator::Equal,
            Self::Ne => CriteriaOperator::NotEqual,
            Self::Lt => CriteriaOperator::LessThan,
            Self::Lte => CriteriaOperator::LessThanOrEqual,
            Self::Gt => CriteriaOperator::GreaterThan,
            Self::Gte => CriteriaOperator::GreaterThanOrEqual,
        }
    }
}

///
/// Expr
///
/// Boolean predicate expression tree over one declared record shape.
/// This is the explicit stand-in for an introspectable lambda: operands
/// are field references, constants, or row-independent computed values,
/// combined with comparison, logical, and set-membership nodes.
///
/// Translation into query items is best-effort by contract: an
/// unsupported shape contributes no criterion and is not an error.
///

#[derive(Clone, Debug)]
pub enum Expr {
    /// Constant value operand.
    Value(Value),
    /// Row-independent deferred computation.
    Compute(ValueThunk),
    /// Type-conversion wrapper around an operand.
    Convert(Box<Expr>),
    /// Member access on the record parameter.
    Field(String),
    Compare(CompareKind, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// Set-membership call: `(collection, probe)`.
    InList(Box<Expr>, Box<Expr>),
}

/// A field-reference operand.
#[must_use]
pub fn field(name: impl Into<String>) -> Expr {
    Expr::Field(name.into())
}

/// A constant value operand.
#[must_use]
pub fn val(value: impl Into<Value>) -> Expr {
    Expr::Value(value.into())
}

/// A deferred, row-independent computed operand.
pub fn compute(f: impl Fn() -> Value + 'static) -> Expr {
    Expr::Compute(ValueThunk::new(f))
}

impl Expr {
    /// Stable numeric tag per node kind. The comparison translator uses
    /// these to break ties between two field-like operands.
    #[must_use]
    pub const fn kind_tag(&self) -> u8 {
        match self {
            Self::Value(_) => 0x01,
            Self::Compute(_) => 0x02,
            Self::Convert(_) => 0x03,
            Self::Field(_) => 0x04,
            Self::Compare(..) => 0x05,
            Self::And(..) => 0x06,
            Self::Or(..) => 0x07,
            Self::Not(_) => 0x08,
            Self::InList(..) => 0x09,
        }
    }

    #[expect(clippy::should_implement_trait)]
    #[must_use]
    pub fn eq(self, other: Self) -> Self {
        Self::Compare(CompareKind::Eq, Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn ne(self, other: Self) -> Self {
        Self::Compare(CompareKind::Ne, Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn lt(self, other: Self) -> Self {
        Self::Compare(CompareKind::Lt, Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn lte(self, other: Self) -> Self {
        Self::Compare(CompareKind::Lte, Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn gt(self, other: Self) -> Self {
        Self::Compare(CompareKind::Gt, Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn gte(self, other: Self) -> Self {
        Self::Compare(CompareKind::Gte, Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    #[expect(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Set-membership call on a collection operand: `self.contains(probe)`.
    #[must_use]
    pub fn contains(self, probe: Self) -> Self {
        Self::InList(Box::new(self), Box::new(probe))
    }

    /// Wrap the operand in a type conversion.
    #[must_use]
    pub fn convert(self) -> Self {
        Self::Convert(Box::new(self))
    }
}

impl Query {
    /// Translate a predicate expression and append the result.
    ///
    /// Translation is best-effort: an unsupported expression shape
    /// contributes nothing and leaves the query unchanged.
    #[must_use]
    pub fn filter_expr(mut self, expr: &Expr) -> Self {
        if let Some((connector, item)) = translate(expr, Connector::And) {
            self.add_item_unchecked(connector, item);
        }
        self
    }

    /// Build a query from one predicate expression.
    #[must_use]
    pub fn from_expr(expr: &Expr) -> Self {
        Self::new().filter_expr(expr)
    }
}

/// Recursive descent over the expression tree. Returns the translated
/// `(connector, item)` pair, or `None` for an unsupported subtree.
pub(crate) fn translate(expr: &Expr, connector: Connector) -> Option<(Connector, QueryItem)> {
    match expr {
        Expr::Compare(kind, left, right) => translate_compare(*kind, left, right, connector),
        Expr::And(left, right) => translate_logical(Connector::And, left, right, connector),
        Expr::Or(left, right) => translate_logical(Connector::Or, left, right, connector),
        Expr::Not(inner) => match inner.as_ref() {
            Expr::InList(collection, probe) => {
                translate_membership(collection, probe, connector, true)
            }
            _ => None,
        },
        Expr::InList(collection, probe) => {
            translate_membership(collection, probe, connector, false)
        }
        Expr::Value(_) | Expr::Compute(_) | Expr::Convert(_) | Expr::Field(_) => None,
    }
}

/// A field reference is a member access, optionally wrapped in a type
/// conversion.
fn field_name(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Field(name) => Some(name),
        Expr::Convert(inner) => field_name(inner),
        _ => None,
    }
}

/// A value operand must be evaluable independently of the record
/// parameter: a constant, a computed thunk, or a conversion of either.
fn operand_value(expr: &Expr) -> Option<CriteriaValue> {
    match expr {
        Expr::Value(value) => Some(CriteriaValue::Literal(value.clone())),
        Expr::Compute(thunk) => Some(CriteriaValue::Thunk(thunk.clone())),
        Expr::Convert(inner) => operand_value(inner),
        _ => None,
    }
}

fn translate_compare(
    kind: CompareKind,
    left: &Expr,
    right: &Expr,
    connector: Connector,
) -> Option<(Connector, QueryItem)> {
    let left_field = field_name(left);
    let right_field = field_name(right);

    let (field, value_operand) = match (left_field, right_field) {
        // Both operands look like field references: prefer the one whose
        // node kind carries the numerically larger tag. Inherited
        // tie-break, kept as-is; ties resolve to the left operand.
        (Some(left_name), Some(right_name)) => {
            if right.kind_tag() > left.kind_tag() {
                (right_name, left)
            } else {
                (left_name, right)
            }
        }
        (Some(left_name), None) => (left_name, right),
        (None, Some(right_name)) => (right_name, left),
        (None, None) => return None,
    };

    let value = operand_value(value_operand)?;
    let criteria = Criteria::new(field, kind.operator(), value);
    Some((connector, QueryItem::Criteria(criteria)))
}

/// Left branch keeps the caller's connector; the right branch always
/// uses this node's own kind, regardless of the caller. Both results
/// become items of one nested group tagged with the caller's connector.
fn translate_logical(
    own: Connector,
    left: &Expr,
    right: &Expr,
    caller: Connector,
) -> Option<(Connector, QueryItem)> {
    let translated_left = translate(left, caller);
    let translated_right = translate(right, own);

    let mut group = Query::new();
    let mut any = false;
    for translated in [translated_left, translated_right] {
        if let Some((connector, item)) = translated {
            group.add_item_unchecked(connector, item);
            any = true;
        }
    }

    any.then(|| (caller, QueryItem::Group(Box::new(group))))
}

fn translate_membership(
    collection: &Expr,
    probe: &Expr,
    connector: Connector,
    negated: bool,
) -> Option<(Connector, QueryItem)> {
    let field = field_name(probe)?;
    let value = operand_value(collection)?;
    let operator = if negated {
        CriteriaOperator::NotIn
    } else {
        CriteriaOperator::In
    };

    Some((
        connector,
        QueryItem::Criteria(Criteria::new(field, operator, value)),
    ))
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
    fn and_expression_yields_a_two_item_group() {
        let expr = field("age").gt(val(18)).and(field("name").eq(val("a")));
        let query = Query::from_expr(&expr);

        assert_eq!(query.items().len(), 1);
        let (_, QueryItem::Group(group)) = &query.items()[0] else {
            panic!("logical nodes should translate to a nested group");
        };
        assert_eq!(group.items().len(), 2);

        assert!(query.matches(&row(&[("age", Value::Int(20)), ("name", Value::from("a"))])));
        assert!(!query.matches(&row(&[("age", Value::Int(15)), ("name", Value::from("a"))])));
        assert!(!query.matches(&row(&[("age", Value::Int(20)), ("name", Value::from("b"))])));
    }

    #[test]
    fn or_node_right_branch_always_uses_or() {
        // a=1 || b=2: the right branch carries the node's own connector.
        let expr = field("a").eq(val(1)).or(field("b").eq(val(2)));
        let query = Query::from_expr(&expr);

        let (_, QueryItem::Group(group)) = &query.items()[0] else {
            panic!("logical nodes should translate to a nested group");
        };
        assert_eq!(group.items()[1].0, Connector::Or);

        assert!(query.matches(&row(&[("a", Value::Int(1))])));
        assert!(query.matches(&row(&[("b", Value::Int(2))])));
        assert!(!query.matches(&row(&[("a", Value::Int(3)), ("b", Value::Int(4))])));
    }

    #[test]
    fn membership_call_emits_an_in_criteria() {
        let expr = val(vec![1i64, 2, 3]).contains(field("id"));
        let query = Query::from_expr(&expr);

        let keys = query.keys_equal_value(&["id"]);
        assert_eq!(
            keys.get("id"),
            Some(&vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            "the eagerly evaluated collection becomes the in-set"
        );

        assert!(query.matches(&row(&[("id", Value::Int(2))])));
        assert!(!query.matches(&row(&[("id", Value::Int(4))])));
    }

    #[test]
    fn negated_membership_emits_not_in() {
        let expr = val(vec![1i64, 2]).contains(field("id")).not();
        let query = Query::from_expr(&expr);

        assert!(!query.matches(&row(&[("id", Value::Int(1))])));
        assert!(query.matches(&row(&[("id", Value::Int(5))])));
    }

    #[test]
    fn computed_operands_translate_to_deferred_thunks() {
        let expr = field("age").gt(compute(|| Value::Int(10 + 8)));
        let query = Query::from_expr(&expr);

        assert!(query.matches(&row(&[("age", Value::Int(20))])));
        assert!(!query.matches(&row(&[("age", Value::Int(18))])));
    }

    #[test]
    fn unsupported_subtrees_translate_to_nothing() {
        // A bare field reference is not a boolean predicate.
        let query = Query::new().filter_expr(&field("flag"));
        assert!(query.items().is_empty());
        assert!(query.matches(&row(&[])), "a silent miss leaves the query open");

        // A comparison between two constants has no field side.
        let query = Query::new().filter_expr(&val(1).eq(val(1)));
        assert!(query.items().is_empty());
    }

    #[test]
    fn field_to_field_comparison_is_a_silent_miss() {
        // Both operands are field-like; the larger-tag side is chosen as
        // the field, leaving the loser as a non-evaluable value operand.
        let query = Query::new().filter_expr(&field("a").convert().eq(field("b")));
        assert!(
            query.items().is_empty(),
            "a field-to-field comparison cannot produce a literal criteria"
        );
    }

    #[test]
    fn converted_field_references_still_resolve() {
        let expr = field("age").convert().gte(val(21));
        let query = Query::from_expr(&expr);

        assert!(query.matches(&row(&[("age", Value::Int(21))])));
        assert!(!query.matches(&row(&[("age", Value::Int(20))])));
    }

    #[test]
    fn partially_supported_logical_nodes_keep_the_supported_branch() {
        // The left branch is unsupported; the group keeps only the right.
        let expr = field("flag").and(field("age").gt(val(18)));
        let query = Query::from_expr(&expr);

        let (_, QueryItem::Group(group)) = &query.items()[0] else {
            panic!("logical nodes should translate to a nested group");
        };
        assert_eq!(group.items().len(), 1);
        assert!(query.matches(&row(&[("age", Value::Int(19))])));
    }
}
