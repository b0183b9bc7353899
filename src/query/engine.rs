//! Ranked search and autosuggest
//!
//! Query text passes through the same pipeline as indexing (tokenize,
//! filter, synonym canonicalization). Each surviving token is resolved to an
//! indexed term, fuzzily when no exact match exists: q-gram candidates are
//! ranked by prefix edit distance, then document frequency. The postings of
//! the resolved terms are unioned, summing scores per document, and the
//! boosting formula turns per-field sums into the final ranking score.

use crate::index::{fuzzy_delta, tokenize, IndexArtifact};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Maximum number of autosuggest completions returned
pub const SUGGESTION_LIMIT: usize = 10;

/// One ranked search result
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub document_id: i64,
    pub url: String,
    /// Values aligned with `SearchResults::headers`; empty string where the
    /// document has no value for a field
    pub fields: Vec<String>,
    pub organic_score: f64,
    pub boosted_score: f64,
}

/// A full ranked result set
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub headers: Vec<String>,
    pub docs: Vec<SearchHit>,
}

/// Resolves a query token to an indexed term
///
/// Exact hits win. Otherwise the closest indexed term by (PED, document
/// frequency descending, term) is used, so a typo still reaches the
/// postings it meant.
fn resolve_term(artifact: &IndexArtifact, token: &str) -> Option<String> {
    if artifact.postings.contains_key(token) {
        return Some(token.to_string());
    }

    let delta = fuzzy_delta(token.chars().count());
    let mut matches = artifact.qgrams.find_matches(token, delta);
    matches.sort_by(|a, b| {
        a.ped
            .cmp(&b.ped)
            .then_with(|| artifact.term_df[b.term_id].cmp(&artifact.term_df[a.term_id]))
            .then_with(|| artifact.qgrams.term(a.term_id).cmp(artifact.qgrams.term(b.term_id)))
    });
    matches
        .first()
        .map(|m| artifact.qgrams.term(m.term_id).to_string())
}

/// Answers a ranked search against a published artifact
///
/// Results are sorted by boosted score descending with ascending document id
/// as the tie-break; documents whose organic score is zero are dropped.
pub fn search(artifact: &IndexArtifact, query: &str) -> SearchResults {
    let headers: Vec<String> = artifact
        .headers
        .iter()
        .map(|(_, name)| name.clone())
        .collect();

    // Same pipeline as indexing, then resolve each distinct token
    let terms: BTreeSet<String> = tokenize(query)
        .into_iter()
        .filter(|token| artifact.filter.keep(token))
        .map(|token| artifact.canonicalize(&token))
        .filter_map(|token| resolve_term(artifact, &token))
        .collect();

    let mut organic: HashMap<i64, f64> = HashMap::new();
    let mut field_sums: HashMap<(i64, i64), f64> = HashMap::new();

    for term in &terms {
        let Some(postings) = artifact.postings.get(term) else {
            continue;
        };
        for posting in postings {
            *organic.entry(posting.doc_id).or_insert(0.0) += posting.score;
            *field_sums
                .entry((posting.doc_id, posting.inspector_id))
                .or_insert(0.0) += posting.score;
        }
    }

    let mut docs: Vec<SearchHit> = Vec::new();
    for (&doc_id, &organic_score) in &organic {
        if organic_score == 0.0 {
            continue;
        }
        let Some(doc) = artifact.docs.get(&doc_id) else {
            continue;
        };

        let boosted_score = match &artifact.formula {
            Some(expr) => {
                let mut bound: HashMap<String, f64> = HashMap::new();
                for (&(field_doc, inspector_id), &sum) in &field_sums {
                    if field_doc != doc_id {
                        continue;
                    }
                    if let Some(name) = artifact.variables.get(&inspector_id) {
                        *bound.entry(name.clone()).or_insert(0.0) += sum;
                    }
                }
                expr.eval(&bound)
            }
            None => organic_score,
        };

        let fields = artifact
            .headers
            .iter()
            .map(|(inspector_id, _)| {
                doc.values
                    .iter()
                    .find(|(id, _)| id == inspector_id)
                    .map(|(_, value)| value.clone())
                    .unwrap_or_default()
            })
            .collect();

        docs.push(SearchHit {
            document_id: doc_id,
            url: doc.url.clone(),
            fields,
            organic_score,
            boosted_score,
        });
    }

    docs.sort_by(|a, b| {
        b.boosted_score
            .partial_cmp(&a.boosted_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.document_id.cmp(&b.document_id))
    });

    SearchResults { headers, docs }
}

/// Computes autosuggest completions for a partial query
///
/// The token being typed (the last one) is matched against the indexed
/// terms through the q-gram structure; candidates are ordered by prefix
/// edit distance, then document frequency (more common terms first), then
/// term, and capped at `SUGGESTION_LIMIT`.
pub fn suggest(artifact: &IndexArtifact, partial: &str) -> Vec<String> {
    let tokens = tokenize(partial);
    let Some(token) = tokens.last() else {
        return Vec::new();
    };
    let token = artifact.canonicalize(token);

    let delta = fuzzy_delta(token.chars().count());
    let mut matches = artifact.qgrams.find_matches(&token, delta);
    matches.sort_by(|a, b| {
        a.ped
            .cmp(&b.ped)
            .then_with(|| artifact.term_df[b.term_id].cmp(&artifact.term_df[a.term_id]))
            .then_with(|| artifact.qgrams.term(a.term_id).cmp(artifact.qgrams.term(b.term_id)))
    });

    matches
        .into_iter()
        .take(SUGGESTION_LIMIT)
        .map(|m| artifact.qgrams.term(m.term_id).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{build_artifact, BuildInput, SynonymMap};
    use crate::storage::test_fixtures::{sample_indexer, sample_inspector};
    use crate::storage::{InspectorRecord, StoredValue};

    fn stored(document_id: i64, inspector_id: i64, value: &str) -> StoredValue {
        StoredValue {
            document_id,
            inspector_id,
            value: value.to_string(),
            url: format!("https://example.com/p/{}", document_id),
        }
    }

    fn inspector(id: i64, name: &str, variable: Option<&str>) -> InspectorRecord {
        let mut record = sample_inspector();
        record.id = id;
        record.name = name.to_string();
        record.variable_name = variable.map(|v| v.to_string());
        record
    }

    fn catalog_artifact() -> IndexArtifact {
        let values = vec![
            stored(1, 1, "red ceramic lamp"),
            stored(2, 1, "blue ceramic bowl"),
            stored(3, 1, "red woolen rug with lamp pattern"),
        ];
        let (artifact, _) = build_artifact(BuildInput {
            indexer: sample_indexer(),
            inspectors: vec![inspector(1, "title", Some("title"))],
            values,
            synonyms: SynonymMap::empty(),
        })
        .unwrap();
        artifact
    }

    #[test]
    fn test_search_finds_matching_documents() {
        let artifact = catalog_artifact();
        let results = search(&artifact, "lamp");

        assert_eq!(results.headers, vec!["title"]);
        let ids: Vec<i64> = results.docs.iter().map(|d| d.document_id).collect();
        assert!(ids.contains(&1));
        assert!(ids.contains(&3));
        assert!(!ids.contains(&2));
    }

    #[test]
    fn test_search_ranks_by_score_then_id() {
        let artifact = catalog_artifact();
        let results = search(&artifact, "red lamp");

        for window in results.docs.windows(2) {
            let (a, b) = (&window[0], &window[1]);
            assert!(
                a.boosted_score > b.boosted_score
                    || (a.boosted_score == b.boosted_score && a.document_id < b.document_id)
            );
        }
    }

    #[test]
    fn test_equal_scores_tie_break_on_ascending_id() {
        // Two symmetric documents: identical scores, ids 2 and 5. The third
        // document keeps the shared terms from appearing in every document,
        // which would zero their idf.
        let values = vec![
            stored(2, 1, "green chair"),
            stored(5, 1, "green chair"),
            stored(9, 1, "oak table"),
        ];
        let (artifact, _) = build_artifact(BuildInput {
            indexer: sample_indexer(),
            inspectors: vec![inspector(1, "title", None)],
            values,
            synonyms: SynonymMap::empty(),
        })
        .unwrap();

        let results = search(&artifact, "chair");
        let ids: Vec<i64> = results.docs.iter().map(|d| d.document_id).collect();
        assert_eq!(ids, vec![2, 5]);
    }

    #[test]
    fn test_typo_matches_through_qgrams() {
        let artifact = catalog_artifact();
        // "ceramik" is one edit from "ceramic"
        let results = search(&artifact, "ceramik");
        assert!(!results.docs.is_empty());
    }

    #[test]
    fn test_unmatched_query_is_empty() {
        let artifact = catalog_artifact();
        let results = search(&artifact, "zzzzzzzz");
        assert!(results.docs.is_empty());
    }

    #[test]
    fn test_synonym_query_matches_other_spelling() {
        let mut indexer = sample_indexer();
        indexer.use_synonyms = true;
        let (artifact, _) = build_artifact(BuildInput {
            indexer,
            inspectors: vec![inspector(1, "title", None)],
            values: vec![stored(1, 1, "motorcycle jacket")],
            synonyms: SynonymMap::parse("motorbike;motorcycle\n"),
        })
        .unwrap();

        let results = search(&artifact, "motorbike");
        assert_eq!(results.docs.len(), 1);
        assert_eq!(results.docs[0].document_id, 1);
    }

    #[test]
    fn test_skip_words_ignored_in_query() {
        let mut indexer = sample_indexer();
        indexer.skip_words = vec!["the".to_string()];
        let (artifact, _) = build_artifact(BuildInput {
            indexer,
            inspectors: vec![inspector(1, "title", None)],
            values: vec![stored(1, 1, "red lamp"), stored(2, 1, "blue bowl")],
            synonyms: SynonymMap::empty(),
        })
        .unwrap();

        let with_skip = search(&artifact, "the lamp");
        let without = search(&artifact, "lamp");
        assert_eq!(with_skip.docs.len(), without.docs.len());
    }

    #[test]
    fn test_search_fields_align_with_headers() {
        let values = vec![
            stored(1, 1, "red lamp"),
            stored(1, 2, "ceramic"),
            stored(2, 1, "blue bowl"),
        ];
        let (artifact, _) = build_artifact(BuildInput {
            indexer: {
                let mut indexer = sample_indexer();
                indexer.inspector_ids = vec![1, 2];
                indexer
            },
            inspectors: vec![
                inspector(1, "title", None),
                inspector(2, "material", None),
            ],
            values,
            synonyms: SynonymMap::empty(),
        })
        .unwrap();

        let results = search(&artifact, "lamp");
        assert_eq!(results.headers, vec!["title", "material"]);
        assert_eq!(results.docs.len(), 1);
        assert_eq!(results.docs[0].fields, vec!["red lamp", "ceramic"]);

        // Document 2 has no "material" value; its row pads with an empty
        // string
        let results = search(&artifact, "bowl");
        assert_eq!(results.docs[0].fields, vec!["blue bowl", ""]);
    }

    #[test]
    fn test_suggest_completes_prefix() {
        let artifact = catalog_artifact();
        let suggestions = suggest(&artifact, "cer");
        assert_eq!(suggestions.first().map(String::as_str), Some("ceramic"));
    }

    #[test]
    fn test_suggest_uses_last_token() {
        let artifact = catalog_artifact();
        let suggestions = suggest(&artifact, "red cer");
        assert_eq!(suggestions.first().map(String::as_str), Some("ceramic"));
    }

    #[test]
    fn test_suggest_orders_by_frequency_on_ties() {
        // "ceramic" appears in two documents, "woolen" in one; for a prefix
        // matching both at the same distance the common one leads
        let values = vec![
            stored(1, 1, "woven ceramic"),
            stored(2, 1, "woolen ceramic"),
        ];
        let (artifact, _) = build_artifact(BuildInput {
            indexer: sample_indexer(),
            inspectors: vec![inspector(1, "title", None)],
            values,
            synonyms: SynonymMap::empty(),
        })
        .unwrap();

        let suggestions = suggest(&artifact, "wo");
        assert!(!suggestions.is_empty());
        // "ceramic" (df 2) is not a prefix match for "wo"; both wo* terms
        // have df 1, so the tie falls back to lexicographic order
        assert_eq!(suggestions[0], "woolen");
    }

    #[test]
    fn test_suggest_caps_results() {
        let values: Vec<StoredValue> = (0..30)
            .map(|i| stored(i, 1, &format!("lampshade{:02}", i)))
            .collect();
        let (artifact, _) = build_artifact(BuildInput {
            indexer: sample_indexer(),
            inspectors: vec![inspector(1, "title", None)],
            values,
            synonyms: SynonymMap::empty(),
        })
        .unwrap();

        let suggestions = suggest(&artifact, "lampshade");
        assert!(suggestions.len() <= SUGGESTION_LIMIT);
    }

    #[test]
    fn test_suggest_empty_input() {
        let artifact = catalog_artifact();
        assert!(suggest(&artifact, "").is_empty());
        assert!(suggest(&artifact, "   ").is_empty());
    }
}
