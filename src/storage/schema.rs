//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Crawldex
//! database. List-valued columns (excluded URLs, scope selectors, clean-up
//! rules, skip/weight words) are stored as JSON arrays.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Crawler configurations
CREATE TABLE IF NOT EXISTS crawlers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    seed_url TEXT NOT NULL,
    threads INTEGER NOT NULL,
    retry INTEGER NOT NULL,
    sleep_ms INTEGER NOT NULL,
    timeout_ms INTEGER NOT NULL,
    max_pages INTEGER NOT NULL,
    max_depth INTEGER NOT NULL,
    robot_file_url TEXT,
    excluded_urls TEXT NOT NULL,
    scope_selectors TEXT NOT NULL,
    before_actions TEXT NOT NULL,
    template_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    deleted INTEGER NOT NULL DEFAULT 0
);

-- Extraction rules, grouped into schemas by template_id
CREATE TABLE IF NOT EXISTS inspectors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    selector TEXT NOT NULL,
    attribute TEXT,
    kind TEXT NOT NULL,
    variable_name TEXT,
    cleanup_expressions TEXT NOT NULL,
    template_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    deleted INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_inspectors_template ON inspectors(template_id);

-- Crawl runs
CREATE TABLE IF NOT EXISTS runners (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    crawler_id INTEGER NOT NULL REFERENCES crawlers(id),
    status TEXT NOT NULL,
    collected_documents INTEGER NOT NULL DEFAULT 0,
    statistics TEXT NOT NULL,
    error_message TEXT,
    created_at TEXT NOT NULL,
    completed_at TEXT,
    deleted INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_runners_status ON runners(status);

-- One document per aligned group of inspector matches on a page
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    template_id INTEGER NOT NULL,
    runner_id INTEGER NOT NULL REFERENCES runners(id),
    url TEXT NOT NULL,
    fingerprint TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(template_id, fingerprint)
);

CREATE INDEX IF NOT EXISTS idx_documents_runner ON documents(runner_id);

-- Extracted values, one per (document, inspector) pair
CREATE TABLE IF NOT EXISTS inspector_values (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id INTEGER NOT NULL REFERENCES documents(id),
    inspector_id INTEGER NOT NULL REFERENCES inspectors(id),
    value TEXT NOT NULL,
    attribute TEXT,
    url TEXT NOT NULL,
    kind TEXT NOT NULL,
    organic_score REAL NOT NULL DEFAULT 0,
    boosted_score REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    UNIQUE(document_id, inspector_id)
);

CREATE INDEX IF NOT EXISTS idx_values_inspector ON inspector_values(inspector_id);

-- Index build configurations
CREATE TABLE IF NOT EXISTS indexers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    status TEXT NOT NULL,
    inspector_ids TEXT NOT NULL,
    k_parameter REAL NOT NULL,
    b_parameter REAL NOT NULL,
    q_gram_q INTEGER NOT NULL,
    use_synonyms INTEGER NOT NULL DEFAULT 0,
    dictionary_path TEXT,
    skip_words TEXT NOT NULL,
    weight_words TEXT NOT NULL,
    small_words_threshold INTEGER NOT NULL,
    boosting_formula TEXT,
    error_message TEXT,
    created_at TEXT NOT NULL,
    completed_at TEXT,
    deleted INTEGER NOT NULL DEFAULT 0
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
