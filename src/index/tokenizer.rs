//! Text tokenization for indexing and querying
//!
//! Index and query text pass through the identical pipeline: whitespace
//! split, punctuation strip, lower-casing, then the configured filters
//! (skip-words, small-word threshold, weight words). Asymmetry between the
//! two sides would make indexed terms unreachable.

use crate::index::IndexError;
use std::collections::{HashMap, HashSet};

/// Normalizes a single term: lower-case, alphanumeric characters only
pub fn normalize_term(word: &str) -> String {
    word.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Splits text into normalized tokens, dropping empties
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(normalize_term)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Token filter configured from an indexer: skip-words, the small-word
/// threshold, and per-term weight multipliers
#[derive(Debug, Clone, Default)]
pub struct TokenFilter {
    skip: HashSet<String>,
    weights: HashMap<String, f64>,
    small_words_threshold: usize,
}

impl TokenFilter {
    /// Builds a filter from indexer configuration
    ///
    /// # Arguments
    ///
    /// * `skip_words` - Words excluded from indexing entirely
    /// * `weight_words` - `word=factor` multiplier entries
    /// * `small_words_threshold` - Minimum token length to index
    pub fn new(
        skip_words: &[String],
        weight_words: &[String],
        small_words_threshold: usize,
    ) -> Result<Self, IndexError> {
        let skip = skip_words.iter().map(|w| normalize_term(w)).collect();

        let mut weights = HashMap::new();
        for entry in weight_words {
            let (word, factor) = entry
                .split_once('=')
                .ok_or_else(|| IndexError::InvalidWeightWord(entry.clone()))?;
            let factor: f64 = factor
                .trim()
                .parse()
                .map_err(|_| IndexError::InvalidWeightWord(entry.clone()))?;
            weights.insert(normalize_term(word), factor);
        }

        Ok(Self {
            skip,
            weights,
            small_words_threshold,
        })
    }

    /// Decides whether a normalized token survives filtering
    ///
    /// Skip-words never survive. Tokens shorter than the threshold survive
    /// only when they carry a weight entry.
    pub fn keep(&self, token: &str) -> bool {
        if self.skip.contains(token) {
            return false;
        }
        token.chars().count() >= self.small_words_threshold || self.weights.contains_key(token)
    }

    /// Returns the score multiplier for a token (1.0 when unweighted)
    pub fn weight(&self, token: &str) -> f64 {
        self.weights.get(token).copied().unwrap_or(1.0)
    }
}
