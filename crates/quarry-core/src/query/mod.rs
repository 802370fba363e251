//! Query specification modules.
//!
//! A `Query` is a composable boolean condition tree plus joins, ordering,
//! paging, and recursion descriptors. Construction is fluent and
//! declarative; `compile` turns simple trees into cached in-memory
//! predicates, and `global` decorates whole trees with mandatory
//! conditions before execution.

pub mod compile;
pub mod criteria;
pub mod expr;
pub mod global;
pub mod join;
pub mod order;
mod query;
pub mod recurve;


pub use criteria::{Criteria, CriteriaOperator, CriteriaValue, ResolvedValue, ValueThunk};
pub use expr::{CompareKind, Expr, compute, field, val};
pub use global::{
    GlobalConditionProvider, InjectContext, QuerySource, UsageScene, apply_global_conditions,
};
pub use join::{JoinItem, JoinOperator, JoinType};
pub use order::OrderCriteria;
pub use query::{Connector, PageSpec, Query, QueryItem, TextQuery};
pub use recurve::{RecurveCriteria, RecurveDirection};
