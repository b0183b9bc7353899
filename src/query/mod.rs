//! Query engine
//!
//! Read-only ranked search and autosuggest over a published index artifact.
//! Any number of concurrent readers may hold the artifact; a rebuild swaps
//! in a new one without disturbing them.

mod engine;

pub use engine::{search, suggest, SearchHit, SearchResults, SUGGESTION_LIMIT};
