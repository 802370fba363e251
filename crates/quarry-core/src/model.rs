use crate::error::QueryError;
use std::collections::HashMap;

///
/// RecordModel
///
/// Static metadata for one record shape: field enumeration and primary
/// keys. The concrete Rust type a predicate compiles against is supplied
/// separately, at compile time, through the `FieldValues` generic.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RecordModel {
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub primary_keys: &'static [&'static str],
}

impl RecordModel {
    /// Whether the model declares the given field.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(&field)
    }
}

///
/// ModelRegistry
///
/// Explicit name-to-model registry. Built once at startup, read-only
/// thereafter, and swappable for tests; there is no hidden static state.
///

#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<&'static str, &'static RecordModel>,
}

impl ModelRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record model under its own name.
    pub fn register(&mut self, model: &'static RecordModel) -> Result<(), QueryError> {
        if self.models.contains_key(model.name) {
            return Err(QueryError::ModelAlreadyRegistered {
                name: model.name.to_string(),
            });
        }

        self.models.insert(model.name, model);
        Ok(())
    }

    /// Look up a model by name.
    pub fn try_get(&self, name: &str) -> Result<&'static RecordModel, QueryError> {
        self.models
            .get(name)
            .copied()
            .ok_or_else(|| QueryError::ModelNotRegistered {
                name: name.to_string(),
            })
    }

    /// Look up a model by name, `None` when unregistered.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'static RecordModel> {
        self.models.get(name).copied()
    }

    /// Iterate registered models.
    pub fn iter(&self) -> impl Iterator<Item = &'static RecordModel> + '_ {
        self.models.values().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static ORDER_MODEL: RecordModel = RecordModel {
        name: "order",
        fields: &["id", "status", "total"],
        primary_keys: &["id"],
    };

    #[test]
    fn register_then_lookup_returns_the_model() {
        let mut registry = ModelRegistry::new();
        registry
            .register(&ORDER_MODEL)
            .expect("first registration should succeed");

        let model = registry
            .try_get("order")
            .expect("registered model should resolve");
        assert_eq!(model.name, "order");
        assert!(model.has_field("status"));
        assert!(!model.has_field("missing"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ModelRegistry::new();
        registry
            .register(&ORDER_MODEL)
            .expect("first registration should succeed");

        let err = registry
            .register(&ORDER_MODEL)
            .expect_err("duplicate registration should fail");
        assert_eq!(
            err,
            QueryError::ModelAlreadyRegistered {
                name: "order".to_string()
            }
        );
    }

    #[test]
    fn missing_model_lookup_names_the_model() {
        let registry = ModelRegistry::new();
        let err = registry
            .try_get("ghost")
            .expect_err("unregistered model should fail lookup");
        assert_eq!(
            err,
            QueryError::ModelNotRegistered {
                name: "ghost".to_string()
            }
        );
    }
}
