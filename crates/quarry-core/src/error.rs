use thiserror::Error as ThisError;

///
/// QueryError
///
/// Configuration errors raised at mutation time. These are the only
/// fatal failures in the engine: translation misses and local-evaluation
/// gaps are silent by contract and never surface here.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum QueryError {
    #[error("record model '{name}' is not registered")]
    ModelNotRegistered { name: String },

    #[error("record model '{name}' already registered")]
    ModelAlreadyRegistered { name: String },

    #[error("subquery value on field '{field}' has no bound record model")]
    UnboundSubquery { field: String },

    #[error("recurve key and relation key must differ: '{field}'")]
    RecurveKeyConflict { field: String },
}
