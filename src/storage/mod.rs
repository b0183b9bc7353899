//! Storage module for persisting entities and crawl data
//!
//! This module handles all database operations, including:
//! - Crawler, inspector and indexer configuration persistence
//! - Runner rows with status and statistics snapshots
//! - The document store: extracted inspector values, one row per
//!   (document, inspector) pair, written atomically per document
//! - Soft deletion: entities carry a `deleted` flag, rows are never removed

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::{IndexerStatus, RunnerStatus, StatisticsSnapshot};
use serde::{Deserialize, Serialize};

/// The kind of value an inspector extracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Element text content
    Text,
    /// Image source URL
    Image,
    /// Link target URL
    Link,
}

impl ValueKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Link => "link",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "link" => Some(Self::Link),
            _ => None,
        }
    }

    /// The attribute read when the inspector does not name one explicitly
    pub fn default_attribute(&self) -> Option<&'static str> {
        match self {
            Self::Text => None,
            Self::Image => Some("src"),
            Self::Link => Some("href"),
        }
    }
}

/// A page action executed before extraction starts
///
/// The original rule set modeled these as a class hierarchy; here they are a
/// single tagged enum dispatched by one match. With the static fetcher only
/// `Wait` has an effect; `Click` and `Scroll` need a live browser session
/// and are logged and skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PageAction {
    Wait { seconds: u64 },
    Click { selector: String },
    Scroll { times: u32 },
}

/// A crawler configuration row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerRecord {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub seed_url: String,
    #[serde(default = "default_threads")]
    pub threads: u32,
    #[serde(default)]
    pub retry: u32,
    #[serde(default)]
    pub sleep_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_pages")]
    pub max_pages: u64,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default)]
    pub robot_file_url: Option<String>,
    #[serde(default)]
    pub excluded_urls: Vec<String>,
    #[serde(default)]
    pub scope_selectors: Vec<String>,
    #[serde(default)]
    pub before_actions: Vec<PageAction>,
    pub template_id: i64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub deleted: bool,
}

fn default_threads() -> u32 {
    1
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_pages() -> u64 {
    100
}

fn default_max_depth() -> u32 {
    2
}

/// An extraction rule row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectorRecord {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub selector: String,
    #[serde(default)]
    pub attribute: Option<String>,
    pub kind: ValueKind,
    #[serde(default)]
    pub variable_name: Option<String>,
    #[serde(default)]
    pub cleanup_expressions: Vec<String>,
    pub template_id: i64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub deleted: bool,
}

/// A crawl run row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerRecord {
    pub id: i64,
    pub crawler_id: i64,
    pub status: RunnerStatus,
    pub collected_documents: u64,
    pub statistics: StatisticsSnapshot,
    pub error_message: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub deleted: bool,
}

/// An indexer configuration row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerRecord {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default = "IndexerRecord::default_status")]
    pub status: IndexerStatus,
    pub inspector_ids: Vec<i64>,
    #[serde(default = "default_k")]
    pub k_parameter: f64,
    #[serde(default = "default_b")]
    pub b_parameter: f64,
    #[serde(default = "default_q")]
    pub q_gram_q: usize,
    #[serde(default)]
    pub use_synonyms: bool,
    #[serde(default)]
    pub dictionary_path: Option<String>,
    #[serde(default)]
    pub skip_words: Vec<String>,
    #[serde(default)]
    pub weight_words: Vec<String>,
    #[serde(default = "default_small_words_threshold")]
    pub small_words_threshold: usize,
    #[serde(default)]
    pub boosting_formula: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

impl IndexerRecord {
    fn default_status() -> IndexerStatus {
        IndexerStatus::New
    }
}

fn default_k() -> f64 {
    1.75
}

fn default_b() -> f64 {
    0.75
}

fn default_q() -> usize {
    3
}

fn default_small_words_threshold() -> usize {
    2
}

/// A value written into the document store during extraction
#[derive(Debug, Clone, PartialEq)]
pub struct NewValue {
    pub inspector_id: i64,
    pub value: String,
    pub attribute: Option<String>,
    pub kind: ValueKind,
}

/// A stored value as read back by the index builder
#[derive(Debug, Clone)]
pub struct StoredValue {
    pub document_id: i64,
    pub inspector_id: i64,
    pub value: String,
    pub url: String,
}

/// One exported document with its named field values
#[derive(Debug, Clone, Serialize)]
pub struct DocumentExport {
    pub document_id: i64,
    pub url: String,
    pub fields: Vec<ExportField>,
}

/// A single named value inside a document export
#[derive(Debug, Clone, Serialize)]
pub struct ExportField {
    pub inspector: String,
    pub value: String,
}

/// A per-value score pair written back after an index build
#[derive(Debug, Clone, Copy)]
pub struct ScoreWriteBack {
    pub document_id: i64,
    pub inspector_id: i64,
    pub organic_score: f64,
    pub boosted_score: f64,
}

#[cfg(test)]
pub mod test_fixtures {
    //! Shared entity fixtures for unit tests across the crate

    use super::*;

    pub fn sample_crawler() -> CrawlerRecord {
        CrawlerRecord {
            id: 0,
            name: "shop".to_string(),
            seed_url: "https://shop.example.com/catalog".to_string(),
            threads: 2,
            retry: 2,
            sleep_ms: 10,
            timeout_ms: 5_000,
            max_pages: 50,
            max_depth: 3,
            robot_file_url: None,
            excluded_urls: vec![],
            scope_selectors: vec![],
            before_actions: vec![],
            template_id: 1,
            created_at: String::new(),
            deleted: false,
        }
    }

    pub fn sample_inspector() -> InspectorRecord {
        InspectorRecord {
            id: 0,
            name: "title".to_string(),
            selector: ".product .title".to_string(),
            attribute: None,
            kind: ValueKind::Text,
            variable_name: Some("title".to_string()),
            cleanup_expressions: vec![],
            template_id: 1,
            created_at: String::new(),
            deleted: false,
        }
    }

    pub fn sample_indexer() -> IndexerRecord {
        IndexerRecord {
            id: 0,
            name: "catalog-index".to_string(),
            status: IndexerStatus::New,
            inspector_ids: vec![1],
            k_parameter: 1.75,
            b_parameter: 0.75,
            q_gram_q: 3,
            use_synonyms: false,
            dictionary_path: None,
            skip_words: vec![],
            weight_words: vec![],
            small_words_threshold: 2,
            boosting_formula: None,
            error_message: None,
            created_at: String::new(),
            completed_at: None,
            deleted: false,
        }
    }
}
