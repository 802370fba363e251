use crate::query::Query;
use serde::{Deserialize, Serialize};

///
/// JoinType
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

///
/// JoinOperator
///
/// Comparison kind applied to each correlated field pair.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum JoinOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

///
/// JoinItem
///
/// One registered join clause: kind, comparison operator, the ordered
/// source-to-target field correlation (possibly empty, e.g. cross joins),
/// the declaration-order sort index, and the joined query.
///

#[derive(Clone, Debug)]
pub struct JoinItem {
    pub join_type: JoinType,
    pub operator: JoinOperator,
    pub fields: Vec<(String, String)>,
    pub sort: u32,
    pub query: Query,
}

macro_rules! join_sugar {
    ($(($join_fn:ident, $on_fn:ident, $using_fn:ident, $join_type:ident)),* $(,)?) => {$(
        /// Join with an explicit field correlation and operator.
        #[must_use]
        pub fn $join_fn(
            self,
            fields: Vec<(String, String)>,
            operator: JoinOperator,
            query: Self,
        ) -> Self {
            self.join(fields, JoinType::$join_type, operator, query)
        }

        /// Join correlating one source/target field pair on equality.
        #[must_use]
        pub fn $on_fn(
            self,
            source: impl Into<String>,
            target: impl Into<String>,
            query: Self,
        ) -> Self {
            self.join(
                vec![(source.into(), target.into())],
                JoinType::$join_type,
                JoinOperator::Equal,
                query,
            )
        }

        /// Join on one field shared by both sides, on equality.
        #[must_use]
        pub fn $using_fn(self, field: impl Into<String>, query: Self) -> Self {
            let field = field.into();
            self.join(
                vec![(field.clone(), field)],
                JoinType::$join_type,
                JoinOperator::Equal,
                query,
            )
        }
    )*};
}

impl Query {
    /// Register a join clause. This is the one generic join primitive:
    /// every per-kind convenience wrapper reduces to it. The sort index
    /// follows declaration order.
    #[must_use]
    pub fn join(
        mut self,
        fields: Vec<(String, String)>,
        join_type: JoinType,
        operator: JoinOperator,
        query: Self,
    ) -> Self {
        self.touch();
        let sort = u32::try_from(self.joins.len()).unwrap_or(u32::MAX);
        self.joins.push(JoinItem {
            join_type,
            operator,
            fields,
            sort,
            query,
        });
        self.has_join = true;
        self
    }

    join_sugar! {
        (inner_join, inner_join_on, inner_join_using, Inner),
        (left_join, left_join_on, left_join_using, Left),
        (right_join, right_join_on, right_join_using, Right),
        (full_join, full_join_on, full_join_using, Full),
    }

    /// Cross join: no field correlation.
    #[must_use]
    pub fn cross_join(self, query: Self) -> Self {
        self.join(Vec::new(), JoinType::Cross, JoinOperator::Equal, query)
    }
}
