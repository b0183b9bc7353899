//! Built index artifacts and the registry that publishes them
//!
//! An artifact is immutable once built. The registry maps indexer ids to
//! their last completed artifact behind a read-write lock; queries clone the
//! `Arc` out and never observe a partially built index, and a failed rebuild
//! leaves the previous artifact in place.

use crate::index::formula::Expr;
use crate::index::qgram::QGramIndex;
use crate::index::tokenizer::TokenFilter;
use crate::index::SynonymMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// One scored posting: a term occurrence in one field of one document
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub doc_id: i64,
    pub inspector_id: i64,
    pub score: f64,
}

/// Display data for one document in search results
#[derive(Debug, Clone)]
pub struct DocFields {
    pub url: String,
    /// (inspector id, extracted value), in header order
    pub values: Vec<(i64, String)>,
}

/// An immutable, query-ready index
#[derive(Debug)]
pub struct IndexArtifact {
    pub indexer_id: i64,
    /// term -> postings sorted by (doc id, inspector id)
    pub postings: HashMap<String, Vec<Posting>>,
    /// q-gram structure over the distinct indexed terms
    pub qgrams: QGramIndex,
    /// document frequency per q-gram term id
    pub term_df: Vec<u64>,
    pub synonyms: SynonymMap,
    pub use_synonyms: bool,
    pub filter: TokenFilter,
    pub formula: Option<Expr>,
    /// inspector id -> boosting variable name
    pub variables: HashMap<i64, String>,
    /// document id -> display fields, ordered for deterministic iteration
    pub docs: BTreeMap<i64, DocFields>,
    /// (inspector id, inspector name) in display order
    pub headers: Vec<(i64, String)>,
}

impl IndexArtifact {
    /// Maps a normalized query token through the synonym classes
    pub fn canonicalize(&self, token: &str) -> String {
        if self.use_synonyms {
            self.synonyms.canonicalize(token)
        } else {
            token.to_string()
        }
    }

    /// Returns the number of indexed documents
    pub fn doc_count(&self) -> usize {
        self.docs.len()
    }
}

/// Registry of published artifacts, shared between builds and queries
#[derive(Debug, Clone, Default)]
pub struct IndexRegistry {
    inner: Arc<RwLock<HashMap<i64, Arc<IndexArtifact>>>>,
}

impl IndexRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a freshly built artifact, replacing any previous one
    pub fn publish(&self, artifact: IndexArtifact) {
        let indexer_id = artifact.indexer_id;
        let mut registry = self.inner.write().unwrap();
        registry.insert(indexer_id, Arc::new(artifact));
    }

    /// Returns the last published artifact for an indexer, if any
    pub fn get(&self, indexer_id: i64) -> Option<Arc<IndexArtifact>> {
        self.inner.read().unwrap().get(&indexer_id).cloned()
    }

    /// Returns the indexer ids that currently serve an artifact
    pub fn published_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.inner.read().unwrap().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
