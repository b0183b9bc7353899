//! Q-gram index over the distinct terms of an index
//!
//! Each term is decomposed into overlapping `$`-padded substrings of length
//! q. A query token shares enough q-grams with a candidate term only if the
//! two are close, so the q-gram postings act as a cheap pre-filter before
//! the exact prefix edit distance is computed.

use crate::index::ped::prefix_edit_distance;

/// Divisor for the fuzzy matching budget: a token of length n tolerates
/// n / FUZZY_DELTA_DIVISOR errors
pub const FUZZY_DELTA_DIVISOR: usize = 4;

/// Returns the prefix-edit-distance budget for a token of the given length
pub fn fuzzy_delta(token_len: usize) -> usize {
    token_len / FUZZY_DELTA_DIVISOR
}

/// Computes q-grams for the padded version of the given word
///
/// The word is prefixed with q-1 `$` characters, so the first grams anchor
/// on the word start: `compute_qgrams("freiburg", 3)` yields
/// `$$f $fr fre rei eib ibu bur urg`.
pub fn compute_qgrams(word: &str, q: usize) -> Vec<String> {
    let padding = "$".repeat(q.saturating_sub(1));
    let padded: Vec<char> = padding.chars().chain(word.chars()).collect();
    let word_len = word.chars().count();

    let mut grams = Vec::with_capacity(word_len);
    for i in 0..word_len {
        grams.push(padded[i..(i + q).min(padded.len())].iter().collect());
    }
    grams
}

/// A fuzzy match produced by `find_matches`
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    /// Index of the matched term
    pub term_id: usize,
    /// Prefix edit distance between the query token and the term
    pub ped: usize,
}

/// Q-gram index mapping grams to (term id, in-term frequency) postings
#[derive(Debug, Default)]
pub struct QGramIndex {
    q: usize,
    inverted: std::collections::HashMap<String, Vec<(usize, u32)>>,
    terms: Vec<String>,
}

impl QGramIndex {
    /// Creates an empty q-gram index for grams of length `q`
    pub fn new(q: usize) -> Self {
        Self {
            q,
            inverted: std::collections::HashMap::new(),
            terms: Vec::new(),
        }
    }

    /// Inserts a term, returning its id
    ///
    /// Terms are expected to arrive already normalized and deduplicated;
    /// the builder inserts each distinct term exactly once.
    pub fn insert(&mut self, term: &str) -> usize {
        let term_id = self.terms.len();
        self.terms.push(term.to_string());

        for gram in compute_qgrams(term, self.q) {
            let postings = self.inverted.entry(gram).or_default();
            match postings.last_mut() {
                Some(last) if last.0 == term_id => last.1 += 1,
                _ => postings.push((term_id, 1)),
            }
        }
        term_id
    }

    /// Returns the term string for an id
    pub fn term(&self, term_id: usize) -> &str {
        &self.terms[term_id]
    }

    /// Returns the number of indexed terms
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns whether the index holds no terms
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Merges q-gram postings lists, summing frequencies per term id
    fn merge_lists(lists: Vec<&Vec<(usize, u32)>>) -> Vec<(usize, u32)> {
        let mut entries: Vec<(usize, u32)> =
            lists.into_iter().flatten().copied().collect();
        entries.sort_unstable();

        let mut merged: Vec<(usize, u32)> = Vec::with_capacity(entries.len());
        for (term_id, freq) in entries {
            match merged.last_mut() {
                Some(last) if last.0 == term_id => last.1 += freq,
                _ => merged.push((term_id, freq)),
            }
        }
        merged
    }

    /// Finds all terms within prefix edit distance `delta` of `token`
    ///
    /// Candidates must share at least `|token| - q * delta` q-grams with the
    /// token; only those survivors pay for a PED computation. Results are
    /// unordered; callers rank them.
    pub fn find_matches(&self, token: &str, delta: usize) -> Vec<FuzzyMatch> {
        let token_len = token.chars().count();
        if token_len == 0 {
            return Vec::new();
        }

        let threshold = token_len as i64 - (self.q * delta) as i64;

        let lists: Vec<&Vec<(usize, u32)>> = compute_qgrams(token, self.q)
            .iter()
            .filter_map(|gram| self.inverted.get(gram))
            .collect();

        let mut matches = Vec::new();
        for (term_id, shared) in Self::merge_lists(lists) {
            if (shared as i64) < threshold {
                continue;
            }
            let ped = prefix_edit_distance(token, &self.terms[term_id], delta);
            if ped <= delta {
                matches.push(FuzzyMatch { term_id, ped });
            }
        }
        matches
    }
}
