//! Keyed stores for stage findings, metrics and attributes.

use super::lookup::resolve_path;
use serde::Serialize;
use serde_json::{Map, Value};

/// An insertion-ordered map of JSON values.
///
/// Writing an existing key overwrites it; nothing is ever removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ContextStore {
    data: Map<String, Value>,
}

impl ContextStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    /// Gets a top-level value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Resolves a dot-separated path through nested objects.
    ///
    /// JSON `null` is treated as absent.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&Value> {
        match path.split_once('.') {
            Some((head, rest)) => resolve_path(self.data.get(head)?, rest),
            None => self.data.get(path).filter(|v| !v.is_null()),
        }
    }

    /// Checks if a top-level key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Returns the keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Map<String, Value>> for ContextStore {
    fn from(data: Map<String, Value>) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_overwrites() {
        let mut store = ContextStore::new();
        store.set("total_outliers", json!(3));
        store.set("total_outliers", json!(5));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("total_outliers"), Some(&json!(5)));
    }

    #[test]
    fn test_resolve_nested_path() {
        let mut store = ContextStore::new();
        store.set(
            "outlier_detection",
            json!({"outlier_info": {"age": {"iqr": {"outlier_count": 1}}}}),
        );

        assert_eq!(
            store.resolve("outlier_detection.outlier_info.age.iqr.outlier_count"),
            Some(&json!(1))
        );
        assert!(store.resolve("outlier_detection.missing").is_none());
        assert!(store.resolve("absent").is_none());
    }

    #[test]
    fn test_resolve_null_is_absent() {
        let mut store = ContextStore::new();
        store.set("value", Value::Null);
        assert!(store.resolve("value").is_none());
        assert!(store.contains_key("value"));
    }

    #[test]
    fn test_keys_keep_insertion_order() {
        let mut store = ContextStore::new();
        store.set("b", json!(1));
        store.set("a", json!(2));
        assert_eq!(store.keys(), vec!["b", "a"]);
    }
}
