use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::document::Field;

/// Settings consumed by [`crate::tokenizer::Normalizer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    pub min_word_length: usize,
    pub max_word_length: usize,
    /// Optional newline-delimited list extending the built-in stopwords.
    pub stopwords_path: Option<PathBuf>,
    /// Optional newline-delimited list of multi-word units for the segmenter.
    pub compounds_path: Option<PathBuf>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self { min_word_length: 2, max_word_length: 50, stopwords_path: None, compounds_path: None }
    }
}

/// Per-field importance used at indexing time. A weight is applied by
/// repeating each term `weight as usize` times, so fractional parts are lost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldWeights {
    weights: BTreeMap<Field, f32>,
    default_weight: f32,
}

impl Default for FieldWeights {
    fn default() -> Self {
        let weights = [
            (Field::Title, 2.0),
            (Field::Description, 1.0),
            (Field::Genre, 1.5),
            (Field::Cast, 1.2),
            (Field::Director, 1.3),
        ]
        .into_iter()
        .collect();
        Self { weights, default_weight: 1.0 }
    }
}

impl FieldWeights {
    /// Every field weighs 1.0.
    pub fn uniform() -> Self {
        Self { weights: BTreeMap::new(), default_weight: 1.0 }
    }

    pub fn with(mut self, field: Field, weight: f32) -> Self {
        self.weights.insert(field, weight);
        self
    }

    pub fn weight(&self, field: Field) -> f32 {
        self.weights.get(&field).copied().unwrap_or(self.default_weight)
    }

    /// Number of times a term from `field` is appended to the token stream.
    pub fn repeat_count(&self, field: Field) -> usize {
        let w = self.weight(field);
        if w.is_finite() && w > 0.0 { w as usize } else { 0 }
    }
}

/// Serving and evaluation knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub results_per_page: usize,
    pub evaluation_k: usize,
    pub suggestion_limit: usize,
    pub popular_limit: usize,
    /// Queries shorter than this (in characters) get no suggestions.
    pub min_suggestion_len: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { results_per_page: 10, evaluation_k: 10, suggestion_limit: 5, popular_limit: 12, min_suggestion_len: 2 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_count_truncates_fractional_weights() {
        let w = FieldWeights::default();
        assert_eq!(w.repeat_count(Field::Title), 2);
        assert_eq!(w.repeat_count(Field::Genre), 1);
        assert_eq!(w.repeat_count(Field::Cast), 1);
        assert_eq!(w.repeat_count(Field::Country), 1);
        assert_eq!(w.clone().with(Field::Country, 0.5).repeat_count(Field::Country), 0);
    }
}
