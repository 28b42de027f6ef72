//! Word-count map and reduce functions
//!
//! The map side splits a text value on whitespace and emits `(word, 1)` for
//! every word; the reduce side sums the ones.

use crate::function::{FunctionRegistry, MapFn, ReduceFn, StageFn};

pub const WORD_COUNT_MAP: &str = "word_count_map";
pub const WORD_COUNT_MAP_NORMALIZED: &str = "word_count_map_normalized";
pub const WORD_COUNT_REDUCE: &str = "word_count_reduce";

pub type WordCountRegistry = FunctionRegistry<String, String, String, u64, u64>;

/// Emit `(word, 1)` for every whitespace-separated word
pub fn word_count_map() -> MapFn<String, String, String, u64> {
    StageFn::new(WORD_COUNT_MAP, |_key: &String, text: &String| {
        Ok(text
            .split_whitespace()
            .map(|word| (word.to_string(), 1))
            .collect())
    })
}

/// Like [`word_count_map`], but counts `Word,` and `word` as the same word
pub fn word_count_map_normalized() -> MapFn<String, String, String, u64> {
    StageFn::new(WORD_COUNT_MAP_NORMALIZED, |_key: &String, text: &String| {
        Ok(text
            .split_whitespace()
            .filter_map(normalize_word)
            .map(|word| (word, 1))
            .collect())
    })
}

/// Sum the counts for one word
pub fn word_count_reduce() -> ReduceFn<String, u64, u64> {
    StageFn::new(WORD_COUNT_REDUCE, |_word: &String, counts: &Vec<u64>| {
        Ok(vec![counts.iter().sum()])
    })
}

/// Lowercase a word and trim non-alphanumeric characters from both ends
///
/// Returns `None` when nothing is left.
pub fn normalize_word(word: &str) -> Option<String> {
    let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric());
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Registry holding every word-count function
pub fn registry() -> WordCountRegistry {
    FunctionRegistry::new()
        .register_map(word_count_map())
        .register_map(word_count_map_normalized())
        .register_reduce(word_count_reduce())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_emits_one_per_word() {
        let out = word_count_map()
            .call(&"a".to_string(), &"y  y\tx\n".to_string())
            .unwrap();
        assert_eq!(
            out,
            vec![
                ("y".to_string(), 1),
                ("y".to_string(), 1),
                ("x".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_normalized_map_folds_case_and_punctuation() {
        let out = word_count_map_normalized()
            .call(&"a".to_string(), &"The cat, the -- CAT!".to_string())
            .unwrap();
        let words: Vec<_> = out.into_iter().map(|(w, _)| w).collect();
        assert_eq!(words, vec!["the", "cat", "the", "cat"]);
    }

    #[test]
    fn test_normalize_word() {
        assert_eq!(normalize_word("\"Hello,\""), Some("hello".to_string()));
        assert_eq!(normalize_word("don't"), Some("don't".to_string()));
        assert_eq!(normalize_word("..."), None);
    }

    #[test]
    fn test_reduce_sums() {
        let out = word_count_reduce()
            .call(&"y".to_string(), &vec![1, 1, 1])
            .unwrap();
        assert_eq!(out, vec![3]);
    }

    #[test]
    fn test_registry_names() {
        let registry = registry();
        assert_eq!(
            registry.map_names(),
            vec![WORD_COUNT_MAP, WORD_COUNT_MAP_NORMALIZED]
        );
        assert!(registry.resolve_reduce(WORD_COUNT_REDUCE).is_ok());
    }
}
