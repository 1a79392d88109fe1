use std::hash::Hash;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Bucket-key to count mapping.
///
/// Keys remember the order in which they were first seen so that peak lookups
/// resolve ties the same way on every run. Serializes as a plain JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternTable<K: Eq + Hash = String>(IndexMap<K, usize>);

impl<K: Eq + Hash> PatternTable<K> {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn add(&mut self, key: K, count: usize) {
        *self.0.entry(key).or_insert(0) += count;
    }

    pub fn increment(&mut self, key: K) {
        self.add(key, 1);
    }

    pub fn get(&self, key: &K) -> usize {
        self.0.get(key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, usize)> {
        self.0.iter().map(|(k, c)| (k, *c))
    }
}

impl<K: Eq + Hash> Default for PatternTable<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> FromIterator<(K, usize)> for PatternTable<K> {
    fn from_iter<I: IntoIterator<Item = (K, usize)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (key, count) in iter {
            table.add(key, count);
        }
        table
    }
}

/// The busiest bucket of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peak<K> {
    pub key: K,
    pub count: usize,
}

/// Mean of a value within one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketAverage {
    pub key: String,
    pub mean: f64,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_accumulates_and_keeps_first_seen_order() {
        let mut table = PatternTable::new();
        table.increment("b".to_string());
        table.increment("a".to_string());
        table.add("b".to_string(), 2);

        let order: Vec<_> = table.iter().map(|(k, c)| (k.as_str(), c)).collect();
        assert_eq!(order, vec![("b", 3), ("a", 1)]);
        assert_eq!(table.total(), 4);
        assert_eq!(table.get(&"missing".to_string()), 0);
    }

    #[test]
    fn serializes_as_object_in_insertion_order() {
        let table: PatternTable<String> =
            vec![("walk".to_string(), 2), ("read".to_string(), 1)].into_iter().collect();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"walk":2,"read":1}"#);
    }

    #[test]
    fn integer_keys_survive_json() {
        let table: PatternTable<u32> = vec![(9, 4), (21, 1)].into_iter().collect();
        let json = serde_json::to_string(&table).unwrap();
        let back: PatternTable<u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&9), 4);
        assert_eq!(back.get(&21), 1);
    }

    #[test]
    fn deserialized_table_keeps_document_order() {
        let back: PatternTable<String> =
            serde_json::from_str(r#"{"tuesday":3,"monday":3,"friday":1}"#).unwrap();
        let keys: Vec<_> = back.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["tuesday", "monday", "friday"]);
    }
}
