//! Core runtime for Quarry: record metadata, the fluent query
//! specification tree, expression translation, in-memory predicate
//! compilation, and the global-condition protocol, with the ergonomics
//! exported via the `prelude`.
#![warn(unreachable_pub)]

pub mod error;
pub mod model;
pub mod query;
pub mod traits;
pub mod value;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No compilers, registries, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        error::QueryError,
        model::RecordModel,
        query::{Connector, Criteria, CriteriaOperator, Expr, Query, ValueThunk},
        traits::FieldValues,
        value::Value,
    };
}
