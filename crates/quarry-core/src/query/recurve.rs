use crate::error::QueryError;
use serde::{Deserialize, Serialize};

///
/// RecurveDirection
///
/// Traversal direction for a self-referential hierarchy edge.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum RecurveDirection {
    /// Ascend toward the root (ancestors).
    Up,
    /// Descend toward the leaves (descendants).
    Down,
}

///
/// RecurveCriteria
///
/// Descriptor for recursive hierarchy expansion: the key field, the
/// relation-key field pointing at the parent row, and the direction.
/// The engine only records the descriptor; traversal itself is an
/// external collaborator's job.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RecurveCriteria {
    pub key: String,
    pub relation_key: String,
    pub direction: RecurveDirection,
}

impl RecurveCriteria {
    /// Build a recurve descriptor. The key and relation key must differ.
    pub fn new(
        key: impl Into<String>,
        relation_key: impl Into<String>,
        direction: RecurveDirection,
    ) -> Result<Self, QueryError> {
        let key = key.into();
        let relation_key = relation_key.into();

        if key == relation_key {
            return Err(QueryError::RecurveKeyConflict { field: key });
        }

        Ok(Self {
            key,
            relation_key,
            direction,
        })
    }
}
