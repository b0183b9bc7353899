/// Indexer status definitions for tracking index builds
///
/// A build walks `New -> Dictionary -> Indexing -> Completed`. Any failure
/// along the way lands in `Exit`; a previously completed artifact for the
/// same indexer stays published and servable.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current status of an index build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexerStatus {
    /// Indexer has been configured but never built
    New,

    /// Loading skip-word and synonym dictionaries
    Dictionary,

    /// Building the inverted index and BM25 statistics
    Indexing,

    /// Build finished; the artifact is searchable
    Completed,

    /// Build failed or was aborted
    Exit,
}

impl IndexerStatus {
    /// Returns true if the indexer currently serves a query-ready artifact
    pub fn is_servable(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if a build is in flight
    pub fn is_building(&self) -> bool {
        matches!(self, Self::Dictionary | Self::Indexing)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Dictionary => "dictionary",
            Self::Indexing => "indexing",
            Self::Completed => "completed",
            Self::Exit => "exit",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "dictionary" => Some(Self::Dictionary),
            "indexing" => Some(Self::Indexing),
            "completed" => Some(Self::Completed),
            "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}

impl fmt::Display for IndexerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
