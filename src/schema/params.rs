//! Parameters after schema parsing.

use serde::Serialize;
use serde_json::{Map, Value};

// == Normalized Params ==
/// Coerced, defaulted parameter bag produced by one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedParams(Map<String, Value>);

impl NormalizedParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Wraps a raw value without validation. Anything but an object becomes empty.
    pub fn passthrough(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Removes `key` and returns its value.
    pub fn take(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_passthrough_non_object_is_empty() {
        assert!(NormalizedParams::passthrough(json!(null)).is_empty());
        assert!(NormalizedParams::passthrough(json!([1, 2])).is_empty());
    }

    #[test]
    fn test_take_removes_key() {
        let mut params = NormalizedParams::passthrough(json!({"id": 7, "name": "Panadol"}));
        assert_eq!(params.take("id"), Some(json!(7)));
        assert!(!params.contains("id"));
        assert_eq!(params.get_str("name"), Some("Panadol"));
    }
}
