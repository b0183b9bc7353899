//! Crawldex: a crawl-and-search engine
//!
//! This crate implements a web crawler driven by per-crawler extraction rules
//! ("inspectors"), a SQLite document store for the extracted values, and a
//! q-gram/BM25 index with fuzzy search and autosuggest over the stored values.
//! An HTTP API exposes the crawler/runner/indexer lifecycle to an admin UI.

pub mod api;
pub mod config;
pub mod context;
pub mod crawler;
pub mod index;
pub mod query;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Crawldex operations
#[derive(Debug, Error)]
pub enum CrawldexError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Index error: {0}")]
    Index(#[from] index::IndexError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid selector in inspector {inspector}: {selector}")]
    InvalidSelector { inspector: String, selector: String },

    #[error("Robots file unreachable: {url}")]
    RobotsUnreachable { url: String },

    #[error("Seed URL disallowed by robots rules: {url}")]
    SeedDisallowed { url: String },

    #[error("Runner {0} not found")]
    RunnerNotFound(i64),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Crawldex operations
pub type Result<T> = std::result::Result<T, CrawldexError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::AppConfig;
pub use context::AppContext;
pub use self::url::normalize_url;
pub use state::{IndexerStatus, RunStatistics, RunnerStatus};
