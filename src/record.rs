//! Insertion-ordered records
//!
//! A [`Record`] is a string-keyed, insertion-ordered property bag. Field
//! order is significant for output and is preserved by every pipeline
//! stage, so records are backed by an [`IndexMap`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One record of a dataset: an ordered mapping from field name to value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, Value>);

/// An ordered sequence of records, threaded through the pipeline stages.
pub type Dataset = Vec<Record>;

impl Record {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Direct (top-level) field lookup.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Dot-path lookup into nested objects, e.g. `user.name`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.0.get(parts.next()?)?;

        for key in parts {
            match current {
                Value::Object(map) => current = map.get(key)?,
                _ => return None,
            }
        }

        Some(current)
    }

    /// Dot-path lookup that treats a stored null like a missing field.
    /// The condition evaluator's presence checks work on this view.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        self.get_path(path).filter(|v| !v.is_null())
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Field names in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<IndexMap<String, Value>> for Record {
    fn from(map: IndexMap<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(json: serde_json::Value) -> Record {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_get_path_flat() {
        let r = rec(serde_json::json!({"name": "alice", "age": 30}));
        assert_eq!(r.get_path("name"), Some(&Value::Str("alice".into())));
        assert_eq!(r.get_path("age"), Some(&Value::Int(30)));
        assert_eq!(r.get_path("missing"), None);
    }

    #[test]
    fn test_get_path_nested() {
        let r = rec(serde_json::json!({"user": {"name": "bob", "meta": {"id": 7}}}));
        assert_eq!(r.get_path("user.name"), Some(&Value::Str("bob".into())));
        assert_eq!(r.get_path("user.meta.id"), Some(&Value::Int(7)));
        assert_eq!(r.get_path("user.missing"), None);
        // Traversing through a scalar dead-ends
        assert_eq!(r.get_path("user.name.x"), None);
    }

    #[test]
    fn test_lookup_treats_null_as_absent() {
        let r = rec(serde_json::json!({"a": null, "b": 1}));
        assert!(r.lookup("a").is_none());
        assert!(r.contains_field("a"));
        assert_eq!(r.lookup("b"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut r = Record::new();
        r.insert("z", Value::Int(1));
        r.insert("a", Value::Int(2));
        r.insert("m", Value::Int(3));
        let fields: Vec<&String> = r.fields().collect();
        assert_eq!(fields, ["z", "a", "m"]);
    }
}
