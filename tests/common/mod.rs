//! Shared fixtures for integration tests

#![allow(dead_code)]

use mapreduce::KvCollection;
use std::collections::HashMap;
use std::hash::Hash;

/// Build a `String -> String` collection from literal pairs
pub fn text_collection(pairs: &[(&str, &str)]) -> KvCollection<String, String> {
    KvCollection::try_from_pairs(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())))
        .expect("fixture keys are unique")
}

/// Count occurrences of each value, ignoring order
pub fn multiset<T: Eq + Hash + Clone>(values: &[T]) -> HashMap<T, usize> {
    let mut counts = HashMap::new();
    for value in values {
        *counts.entry(value.clone()).or_insert(0) += 1;
    }
    counts
}
