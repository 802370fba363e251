use crate::value::Value;

///
/// FieldValues
///
/// Runtime record interface consumed by the predicate compiler and the
/// in-memory sorter. Decouples local evaluation from concrete record
/// types: any row-like value that can expose fields by name qualifies.
///

pub trait FieldValues {
    /// Return the value of a named field, or `None` if the record does
    /// not carry that field.
    fn get_value(&self, field: &str) -> Option<Value>;
}

impl FieldValues for std::collections::BTreeMap<String, Value> {
    fn get_value(&self, field: &str) -> Option<Value> {
        self.get(field).cloned()
    }
}

impl FieldValues for std::collections::HashMap<String, Value> {
    fn get_value(&self, field: &str) -> Option<Value> {
        self.get(field).cloned()
    }
}
