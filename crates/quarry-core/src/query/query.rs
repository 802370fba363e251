use crate::{
    error::QueryError,
    model::{ModelRegistry, RecordModel},
    query::{
        compile::CachedPredicate,
        criteria::{Criteria, CriteriaOperator, CriteriaValue, ResolvedValue, ValueThunk},
        join::JoinItem,
        order::OrderCriteria,
        recurve::{RecurveCriteria, RecurveDirection},
    },
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::{any::TypeId, cell::RefCell, collections::HashMap};

macro_rules! criteria_sugar {
    ($(($and_fn:ident, $or_fn:ident, $operator:ident)),* $(,)?) => {$(
        #[must_use]
        pub fn $and_fn(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
            self.and(field, CriteriaOperator::$operator, value)
        }

        #[must_use]
        pub fn $or_fn(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
            self.or(field, CriteriaOperator::$operator, value)
        }
    )*};
}

macro_rules! subquery_sugar {
    ($(($and_fn:ident, $or_fn:ident, $operator:ident)),* $(,)?) => {$(
        pub fn $and_fn(
            self,
            field: impl Into<String>,
            query: Self,
        ) -> Result<Self, QueryError> {
            self.and_query(field, CriteriaOperator::$operator, query)
        }

        pub fn $or_fn(
            self,
            field: impl Into<String>,
            query: Self,
        ) -> Result<Self, QueryError> {
            self.or_query(field, CriteriaOperator::$operator, query)
        }
    )*};
}

///
/// Connector
///
/// AND/OR combinator between sibling items. Evaluation is left-to-right:
/// the first item's connector is ignored; each subsequent item combines
/// the running result with itself via its own connector. There is no
/// operator precedence beyond explicit nesting.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Connector {
    And,
    Or,
}

///
/// QueryItem
///
/// One entry in a query's condition list: an atomic criteria or a
/// nested group.
///

#[derive(Clone, Debug)]
pub enum QueryItem {
    Criteria(Criteria),
    Group(Box<Query>),
}

///
/// PageSpec
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PageSpec {
    pub limit: Option<u32>,
    pub offset: u32,
}

///
/// TextQuery
///
/// Raw-text escape hatch: an opaque query string plus a parameter
/// payload. Once set, AST criteria are irrelevant to remote execution
/// and the query has no locally verifiable predicate.
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextQuery {
    pub text: String,
    pub params: Vec<(String, Value)>,
}

///
/// Query
///
/// Composable boolean condition tree. A query owns its condition items,
/// joins, ordering, paging, projection hints, and an optional recursion
/// descriptor, plus derived complexity flags and an equality lookup
/// index maintained incrementally on every insertion.
///
/// Queries are mutable builders with no internal locking. The documented
/// concurrency discipline is to treat a built query as an immutable
/// template and `clone()` before any caller-specific mutation; a clone
/// is structurally independent of the original.
///
/// The query graph is a tree built only by value composition, so walks
/// terminate structurally with no cycle bookkeeping.
///

#[derive(Clone, Debug, Default)]
pub struct Query {
    pub(crate) model: Option<&'static RecordModel>,
    pub(crate) items: Vec<(Connector, QueryItem)>,
    pub(crate) orders: Vec<OrderCriteria>,
    pub(crate) joins: Vec<JoinItem>,
    pub(crate) query_fields: Vec<String>,
    pub(crate) not_query_fields: Vec<String>,
    pub(crate) recurve: Option<RecurveCriteria>,
    pub(crate) page: Option<PageSpec>,
    pub(crate) text: Option<TextQuery>,
    pub(crate) equal_index: HashMap<String, Vec<Criteria>>,
    pub(crate) has_subquery: bool,
    pub(crate) has_join: bool,
    pub(crate) has_recurve: bool,
    pub(crate) obsolete: bool,
    pub(crate) globally_filtered: bool,
    pub(crate) revision: u64,
    pub(crate) compiled: RefCell<HashMap<TypeId, CachedPredicate>>,
}

impl Query {
    /// Create an empty, untyped query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty query bound to a record model.
    #[must_use]
    pub fn for_model(model: &'static RecordModel) -> Self {
        Self {
            model: Some(model),
            ..Self::default()
        }
    }

    /// Create an empty query bound to a registered record model.
    pub fn for_record(registry: &ModelRegistry, name: &str) -> Result<Self, QueryError> {
        Ok(Self::for_model(registry.try_get(name)?))
    }

    // ------------------------------------------------------------------
    // Read accessors (the executor-facing surface)
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn model(&self) -> Option<&'static RecordModel> {
        self.model
    }

    #[must_use]
    pub fn items(&self) -> &[(Connector, QueryItem)] {
        &self.items
    }

    #[must_use]
    pub fn orders(&self) -> &[OrderCriteria] {
        &self.orders
    }

    #[must_use]
    pub fn joins(&self) -> &[JoinItem] {
        &self.joins
    }

    #[must_use]
    pub fn query_fields(&self) -> &[String] {
        &self.query_fields
    }

    #[must_use]
    pub fn not_query_fields(&self) -> &[String] {
        &self.not_query_fields
    }

    #[must_use]
    pub const fn recurve(&self) -> Option<&RecurveCriteria> {
        self.recurve.as_ref()
    }

    #[must_use]
    pub const fn page(&self) -> Option<PageSpec> {
        self.page
    }

    #[must_use]
    pub const fn text(&self) -> Option<&TextQuery> {
        self.text.as_ref()
    }

    #[must_use]
    pub const fn has_subquery(&self) -> bool {
        self.has_subquery
    }

    #[must_use]
    pub const fn has_join(&self) -> bool {
        self.has_join
    }

    #[must_use]
    pub const fn has_recurve(&self) -> bool {
        self.has_recurve
    }

    /// Whether the query carries any subquery, join, or recursion
    /// descriptor. Complex queries are never evaluated locally.
    #[must_use]
    pub const fn is_complex(&self) -> bool {
        self.has_subquery || self.has_join || self.has_recurve
    }

    #[must_use]
    pub const fn is_obsolete(&self) -> bool {
        self.obsolete
    }

    #[must_use]
    pub const fn is_globally_filtered(&self) -> bool {
        self.globally_filtered
    }

    /// Every nested query reachable as a criteria value, through group
    /// items. Joined queries are not part of this set; they live only in
    /// `joins`.
    #[must_use]
    pub fn subqueries(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        self.collect_subqueries(&mut out);
        out
    }

    fn collect_subqueries<'a>(&'a self, out: &mut Vec<&'a Self>) {
        for (_, item) in &self.items {
            match item {
                QueryItem::Criteria(criteria) => {
                    if let Some(sub) = criteria.subquery() {
                        out.push(sub);
                    }
                }
                QueryItem::Group(group) => group.collect_subqueries(out),
            }
        }
    }

    /// Equality-index extraction: for each requested field, the literal
    /// values pinned by `Equal`/`In` criteria, with `In` value sets
    /// flattened into individual entries.
    #[must_use]
    pub fn keys_equal_value(&self, keys: &[&str]) -> HashMap<String, Vec<Value>> {
        let mut out = HashMap::new();

        for key in keys {
            let Some(entries) = self.equal_index.get(*key) else {
                continue;
            };

            let mut values = Vec::new();
            for criteria in entries {
                let ResolvedValue::Value(value) = criteria.resolve() else {
                    continue;
                };
                match (criteria.operator(), value) {
                    (CriteriaOperator::In, Value::List(items)) => {
                        values.extend(items.iter().cloned());
                    }
                    _ => values.push(value.clone()),
                }
            }

            if !values.is_empty() {
                out.insert((*key).to_string(), values);
            }
        }

        out
    }

    // ------------------------------------------------------------------
    // Insertion primitive
    // ------------------------------------------------------------------

    /// Append one `(connector, item)` entry.
    ///
    /// A criteria whose value is a nested query must carry a bound
    /// record model; everything else is infallible. Appending
    /// invalidates any cached compiled predicate, then runs the per-kind
    /// bookkeeping: subquery flag propagation, equality indexing, or
    /// one-level group absorption.
    pub fn add_item(&mut self, connector: Connector, item: QueryItem) -> Result<(), QueryError> {
        if let QueryItem::Criteria(criteria) = &item {
            if let Some(sub) = criteria.subquery() {
                if sub.model.is_none() {
                    return Err(QueryError::UnboundSubquery {
                        field: criteria.field().to_string(),
                    });
                }
            }
        }

        self.add_item_unchecked(connector, item);
        Ok(())
    }

    /// Single bookkeeping handler behind every insertion path.
    pub(crate) fn add_item_unchecked(&mut self, connector: Connector, item: QueryItem) {
        self.touch();

        match &item {
            QueryItem::Criteria(criteria) => {
                if let Some(sub) = criteria.subquery() {
                    self.has_join |= sub.has_join;
                    self.has_recurve |= sub.has_recurve;
                    self.has_subquery = true;
                } else if criteria.operator().is_equality() {
                    self.equal_index
                        .entry(criteria.field().to_string())
                        .or_default()
                        .push(criteria.clone());
                }
            }
            QueryItem::Group(group) => {
                // One-level flatten: equality entries, complexity flags,
                // and subquery reachability. Join items stay indirect.
                for (field, entries) in &group.equal_index {
                    self.equal_index
                        .entry(field.clone())
                        .or_default()
                        .extend(entries.iter().cloned());
                }
                self.has_subquery |= group.has_subquery;
                self.has_join |= group.has_join;
                self.has_recurve |= group.has_recurve;
            }
        }

        self.items.push((connector, item));
    }

    /// Bump the structural revision, wholesale-invalidating compiled
    /// predicates for every record type.
    pub(crate) fn touch(&mut self) {
        self.revision += 1;
        self.compiled.borrow_mut().clear();
    }

    // ------------------------------------------------------------------
    // Direct leaf insertion
    // ------------------------------------------------------------------

    /// AND a criteria with a plain literal value.
    #[must_use]
    pub fn and(
        mut self,
        field: impl Into<String>,
        operator: CriteriaOperator,
        value: impl Into<Value>,
    ) -> Self {
        let criteria = Criteria::new(field, operator, CriteriaValue::Literal(value.into()));
        self.add_item_unchecked(Connector::And, QueryItem::Criteria(criteria));
        self
    }

    /// OR a criteria with a plain literal value.
    #[must_use]
    pub fn or(
        mut self,
        field: impl Into<String>,
        operator: CriteriaOperator,
        value: impl Into<Value>,
    ) -> Self {
        let criteria = Criteria::new(field, operator, CriteriaValue::Literal(value.into()));
        self.add_item_unchecked(Connector::Or, QueryItem::Criteria(criteria));
        self
    }

    /// AND a criteria with a deferred computed value.
    #[must_use]
    pub fn and_thunk(
        mut self,
        field: impl Into<String>,
        operator: CriteriaOperator,
        thunk: ValueThunk,
    ) -> Self {
        let criteria = Criteria::new(field, operator, thunk);
        self.add_item_unchecked(Connector::And, QueryItem::Criteria(criteria));
        self
    }

    /// OR a criteria with a deferred computed value.
    #[must_use]
    pub fn or_thunk(
        mut self,
        field: impl Into<String>,
        operator: CriteriaOperator,
        thunk: ValueThunk,
    ) -> Self {
        let criteria = Criteria::new(field, operator, thunk);
        self.add_item_unchecked(Connector::Or, QueryItem::Criteria(criteria));
        self
    }

    /// AND a criteria whose value is a nested query.
    pub fn and_query(
        mut self,
        field: impl Into<String>,
        operator: CriteriaOperator,
        query: Self,
    ) -> Result<Self, QueryError> {
        self.add_item(
            Connector::And,
            QueryItem::Criteria(Criteria::new(field, operator, query)),
        )?;
        Ok(self)
    }

    /// OR a criteria whose value is a nested query.
    pub fn or_query(
        mut self,
        field: impl Into<String>,
        operator: CriteriaOperator,
        query: Self,
    ) -> Result<Self, QueryError> {
        self.add_item(
            Connector::Or,
            QueryItem::Criteria(Criteria::new(field, operator, query)),
        )?;
        Ok(self)
    }

    // ------------------------------------------------------------------
    // Grouped insertion
    // ------------------------------------------------------------------

    /// AND a nested group.
    #[must_use]
    pub fn and_group(mut self, group: Self) -> Self {
        self.add_item_unchecked(Connector::And, QueryItem::Group(Box::new(group)));
        self
    }

    /// OR a nested group.
    #[must_use]
    pub fn or_group(mut self, group: Self) -> Self {
        self.add_item_unchecked(Connector::Or, QueryItem::Group(Box::new(group)));
        self
    }

    /// AND one synthetic group applying the same operator and value to
    /// several fields, combined pairwise with `inner`.
    #[must_use]
    pub fn and_fields(
        self,
        inner: Connector,
        operator: CriteriaOperator,
        value: impl Into<Value>,
        fields: &[&str],
    ) -> Self {
        self.and_group(Self::fields_group(inner, operator, &value.into(), fields))
    }

    /// OR one synthetic group applying the same operator and value to
    /// several fields, combined pairwise with `inner`.
    #[must_use]
    pub fn or_fields(
        self,
        inner: Connector,
        operator: CriteriaOperator,
        value: impl Into<Value>,
        fields: &[&str],
    ) -> Self {
        self.or_group(Self::fields_group(inner, operator, &value.into(), fields))
    }

    fn fields_group(
        inner: Connector,
        operator: CriteriaOperator,
        value: &Value,
        fields: &[&str],
    ) -> Self {
        let mut group = Self::new();
        for field in fields {
            let criteria = Criteria::new(*field, operator, CriteriaValue::Literal(value.clone()));
            group.add_item_unchecked(inner, QueryItem::Criteria(criteria));
        }
        group
    }

    // ------------------------------------------------------------------
    // Named sugar
    // ------------------------------------------------------------------

    criteria_sugar! {
        (equal, or_equal, Equal),
        (not_equal, or_not_equal, NotEqual),
        (less_than, or_less_than, LessThan),
        (less_than_or_equal, or_less_than_or_equal, LessThanOrEqual),
        (greater_than, or_greater_than, GreaterThan),
        (greater_than_or_equal, or_greater_than_or_equal, GreaterThanOrEqual),
        (like, or_like, Like),
        (not_like, or_not_like, NotLike),
        (begin_like, or_begin_like, BeginLike),
        (not_begin_like, or_not_begin_like, NotBeginLike),
        (end_like, or_end_like, EndLike),
        (not_end_like, or_not_end_like, NotEndLike),
    }

    subquery_sugar! {
        (equal_query, or_equal_query, Equal),
        (not_equal_query, or_not_equal_query, NotEqual),
        (in_query, or_in_query, In),
        (not_in_query, or_not_in_query, NotIn),
    }

    /// AND a membership test against a fixed value set.
    #[must_use]
    pub fn in_list<I>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.and(field, CriteriaOperator::In, list_value(values))
    }

    /// OR a membership test against a fixed value set.
    #[must_use]
    pub fn or_in_list<I>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.or(field, CriteriaOperator::In, list_value(values))
    }

    /// AND a negated membership test against a fixed value set.
    #[must_use]
    pub fn not_in_list<I>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.and(field, CriteriaOperator::NotIn, list_value(values))
    }

    /// OR a negated membership test against a fixed value set.
    #[must_use]
    pub fn or_not_in_list<I>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.or(field, CriteriaOperator::NotIn, list_value(values))
    }

    /// AND a null test.
    #[must_use]
    pub fn is_null(self, field: impl Into<String>) -> Self {
        self.and(field, CriteriaOperator::IsNull, Value::Null)
    }

    /// OR a null test.
    #[must_use]
    pub fn or_is_null(self, field: impl Into<String>) -> Self {
        self.or(field, CriteriaOperator::IsNull, Value::Null)
    }

    /// AND a not-null test.
    #[must_use]
    pub fn not_null(self, field: impl Into<String>) -> Self {
        self.and(field, CriteriaOperator::NotNull, Value::Null)
    }

    /// OR a not-null test.
    #[must_use]
    pub fn or_not_null(self, field: impl Into<String>) -> Self {
        self.or(field, CriteriaOperator::NotNull, Value::Null)
    }

    // ------------------------------------------------------------------
    // Recursion descriptor
    // ------------------------------------------------------------------

    /// Store the recursion descriptor (at most one per query; storing
    /// again replaces it). Fails when key and relation key match.
    pub fn set_recurve(
        mut self,
        key: impl Into<String>,
        relation_key: impl Into<String>,
        direction: RecurveDirection,
    ) -> Result<Self, QueryError> {
        let recurve = RecurveCriteria::new(key, relation_key, direction)?;
        self.touch();
        self.recurve = Some(recurve);
        self.has_recurve = true;
        Ok(self)
    }

    // ------------------------------------------------------------------
    // Paging, projection, raw text
    // ------------------------------------------------------------------

    /// Set or replace the result limit.
    #[must_use]
    pub const fn limit(mut self, n: u32) -> Self {
        self.page = Some(match self.page {
            Some(mut page) => {
                page.limit = Some(n);
                page
            }
            None => PageSpec {
                limit: Some(n),
                offset: 0,
            },
        });
        self
    }

    /// Set or replace the result offset.
    #[must_use]
    pub const fn offset(mut self, n: u32) -> Self {
        self.page = Some(match self.page {
            Some(mut page) => {
                page.offset = n;
                page
            }
            None => PageSpec {
                limit: None,
                offset: n,
            },
        });
        self
    }

    /// Add fields to the projection hint.
    #[must_use]
    pub fn select_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.query_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Add fields to the exclusion projection hint.
    #[must_use]
    pub fn exclude_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.not_query_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Switch the query to the raw-text escape hatch.
    #[must_use]
    pub fn with_text(
        mut self,
        text: impl Into<String>,
        params: Vec<(String, Value)>,
    ) -> Self {
        self.touch();
        self.text = Some(TextQuery {
            text: text.into(),
            params,
        });
        self
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Mark the query obsolete: execution short-circuits without the
    /// query being destroyed.
    pub fn mark_obsolete(&mut self) {
        self.obsolete = true;
    }

    pub(crate) fn mark_globally_filtered(&mut self) {
        self.globally_filtered = true;
    }
}

fn list_value<I>(values: I) -> Value
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    Value::List(values.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecordModel;

    static USER_MODEL: RecordModel = RecordModel {
        name: "user",
        fields: &["id", "name", "age"],
        primary_keys: &["id"],
    };

    #[test]
    fn clone_is_structurally_independent() {
        let original = Query::new().equal("id", 5).order_by("name");
        let mutated = original
            .clone()
            .equal("name", "a")
            .order_by_desc("age")
            .limit(10);

        assert_eq!(original.items().len(), 1);
        assert_eq!(original.orders().len(), 1);
        assert!(original.page().is_none());

        assert_eq!(mutated.items().len(), 2);
        assert_eq!(mutated.orders().len(), 2);
        assert_eq!(
            mutated.page().and_then(|page| page.limit),
            Some(10),
            "mutating the clone must not leak into the original"
        );
    }

    #[test]
    fn keys_equal_value_collects_equal_and_in_entries() {
        let query = Query::new()
            .equal("id", 5)
            .or_equal("id", 7)
            .in_list("status", ["open", "closed"])
            .greater_than("age", 18);

        let keys = query.keys_equal_value(&["id", "status", "age"]);
        assert_eq!(
            keys.get("id"),
            Some(&vec![Value::Int(5), Value::Int(7)]),
            "both equal criteria on id should be collected"
        );
        assert_eq!(
            keys.get("status"),
            Some(&vec![
                Value::Text("open".to_string()),
                Value::Text("closed".to_string())
            ]),
            "in-criteria value sets flatten into individual entries"
        );
        assert!(
            !keys.contains_key("age"),
            "ordering criteria never reach the equality index"
        );
    }

    #[test]
    fn null_rewritten_criteria_are_not_indexed() {
        let query = Query::new().equal("name", Value::Null);
        assert!(
            query.keys_equal_value(&["name"]).is_empty(),
            "an equal-null criteria rewrites to is-null and must not be indexed"
        );
    }

    #[test]
    fn group_absorption_flattens_index_and_flags() {
        let inner = Query::for_model(&USER_MODEL).equal("id", 1);
        let group = Query::new()
            .equal("id", 2)
            .in_query("name", inner)
            .expect("model-bound subquery should be accepted");

        let parent = Query::new().and_group(group);
        assert!(parent.has_subquery(), "subquery flag absorbs from groups");
        assert!(parent.is_complex());
        assert_eq!(
            parent.keys_equal_value(&["id"]).get("id"),
            Some(&vec![Value::Int(2)]),
            "group equality entries flatten one level into the parent"
        );
    }

    #[test]
    fn unbound_subquery_is_a_configuration_error() {
        let err = Query::new()
            .in_query("id", Query::new())
            .expect_err("subquery without a record model should fail");
        assert_eq!(
            err,
            QueryError::UnboundSubquery {
                field: "id".to_string()
            }
        );
    }

    #[test]
    fn subqueries_are_reachable_through_groups_but_not_joins() {
        let sub = Query::for_model(&USER_MODEL).equal("id", 1);
        let group = Query::new()
            .equal_query("name", sub)
            .expect("bound subquery should be accepted");
        let query = Query::new()
            .and_group(group)
            .inner_join_on("id", "user_id", Query::new().equal("age", 3));

        assert_eq!(
            query.subqueries().len(),
            1,
            "joined queries must not appear in the subquery set"
        );
        assert_eq!(query.joins().len(), 1);
    }

    #[test]
    fn multi_field_sugar_builds_one_synthetic_group() {
        let query = Query::new().and_fields(
            Connector::Or,
            CriteriaOperator::Like,
            "smith",
            &["name", "alias"],
        );

        assert_eq!(query.items().len(), 1);
        let (_, QueryItem::Group(group)) = &query.items()[0] else {
            panic!("multi-field insertion should produce a single group item");
        };
        assert_eq!(group.items().len(), 2);
        assert!(
            group
                .items()
                .iter()
                .all(|(connector, _)| *connector == Connector::Or),
            "inner connector applies to every synthetic criteria"
        );
    }

    #[test]
    fn obsolete_marking_is_sticky_and_non_destructive() {
        let mut query = Query::new().equal("id", 1);
        assert!(!query.is_obsolete());
        query.mark_obsolete();
        assert!(query.is_obsolete());
        assert_eq!(query.items().len(), 1, "marking obsolete keeps the tree");
    }
}
