//! Index build pipeline
//!
//! This module turns stored inspector values into an immutable, searchable
//! artifact: an inverted index with BM25 scores, a q-gram index over the
//! distinct terms for fuzzy matching and autosuggest, synonym handling, and
//! the boosting formula that combines per-field scores into a document
//! score. Builds never mutate a published artifact; they construct a new one
//! and swap it into the registry on completion.

mod artifact;
mod builder;
mod dictionary;
mod formula;
mod ped;
mod qgram;
mod tokenizer;

pub use artifact::{DocFields, IndexArtifact, IndexRegistry, Posting};
pub use builder::{build_artifact, execute_build, BuildInput};
pub use dictionary::SynonymMap;
pub use formula::Expr;
pub use ped::prefix_edit_distance;
pub use qgram::{compute_qgrams, fuzzy_delta, FuzzyMatch, QGramIndex};
pub use tokenizer::{normalize_term, tokenize, TokenFilter};

use thiserror::Error;

/// Errors that can occur while building an index
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("Dictionary error: {0}")]
    Dictionary(String),

    #[error("Invalid weight word entry: {0}")]
    InvalidWeightWord(String),

    #[error("Formula error: {0}")]
    Formula(String),

    #[error("Build refused: {0}")]
    BuildRefused(String),
}
