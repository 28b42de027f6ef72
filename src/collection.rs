//! Insertion-ordered key/value collections
//!
//! [`KvCollection`] is both the pipeline input and the output of every
//! stage. Keys are unique; iteration follows insertion order, which is the
//! order the inline stage path visits pairs and the order the pooled path
//! submits them.

use crate::error::{MapReduceError, MapReduceResult};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

/// Contract for collection keys: comparable, hashable and stringifiable
pub trait Key: Eq + Hash + Clone + Display + Send + Sync + 'static {}

impl<T> Key for T where T: Eq + Hash + Clone + Display + Send + Sync + 'static {}

/// Ordered mapping from unique keys to values
#[derive(Debug, Clone)]
pub struct KvCollection<K, V> {
    entries: Vec<(K, V)>,
    index: HashMap<K, usize>,
}

impl<K: Key, V> KvCollection<K, V> {
    /// Create an empty collection
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build a collection from pairs, rejecting duplicate keys
    pub fn try_from_pairs<I>(pairs: I) -> MapReduceResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut collection = Self::new();
        for (key, value) in pairs {
            if collection.contains_key(&key) {
                return Err(MapReduceError::invalid_argument(
                    "data",
                    format!("duplicate key `{}`", key),
                ));
            }
            collection.insert(key, value);
        }
        Ok(collection)
    }

    /// Insert or overwrite the value stored under `key`
    ///
    /// Overwriting keeps the key's original position.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&pos) = self.index.get(&key) {
            return Some(std::mem::replace(&mut self.entries[pos].1, value));
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        match self.index.get(key) {
            Some(&pos) => Some(&mut self.entries[pos].1),
            None => None,
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl<K: Key, T> KvCollection<K, Vec<T>> {
    /// Append `value` to the list under `key`, creating the list if absent
    pub fn append(&mut self, key: K, value: T) {
        match self.get_mut(&key) {
            Some(values) => values.push(value),
            None => {
                self.insert(key, vec![value]);
            }
        }
    }
}

impl KvCollection<String, Value> {
    /// Parse a JSON input collection
    ///
    /// Accepts an object (`{"k": v}`) or a flat array alternating keys and
    /// values (`["k1", v1, "k2", v2]`). Array keys must be strings.
    pub fn from_json(value: Value) -> MapReduceResult<Self> {
        match value {
            Value::Object(map) => Self::try_from_pairs(map),
            Value::Array(items) => {
                if items.len() % 2 != 0 {
                    return Err(MapReduceError::invalid_argument(
                        "data",
                        format!(
                            "flat key/value array has odd length {}",
                            items.len()
                        ),
                    ));
                }
                let mut pairs = Vec::with_capacity(items.len() / 2);
                let mut items = items.into_iter();
                while let (Some(key), Some(value)) = (items.next(), items.next()) {
                    match key {
                        Value::String(key) => pairs.push((key, value)),
                        other => {
                            return Err(MapReduceError::invalid_argument(
                                "data",
                                format!("key must be a string, found {}", other),
                            ))
                        }
                    }
                }
                Self::try_from_pairs(pairs)
            }
            other => Err(MapReduceError::invalid_argument(
                "data",
                format!("expected an object or flat array, found {}", other),
            )),
        }
    }
}

impl<K: Key, V> Default for KvCollection<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key, V: PartialEq> PartialEq for KvCollection<K, V> {
    /// Equality ignores insertion order
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: Key, V> IntoIterator for KvCollection<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Key, V: Serialize> Serialize for KvCollection<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(&key.to_string(), value)?;
        }
        map.end()
    }
}
