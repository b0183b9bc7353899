//! Storage trait and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::{IndexerStatus, RunnerStatus, StatisticsSnapshot};
use crate::storage::{
    CrawlerRecord, DocumentExport, IndexerRecord, InspectorRecord, NewValue, RunnerRecord,
    ScoreWriteBack, StoredValue,
};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Crawler not found: {0}")]
    CrawlerNotFound(i64),

    #[error("Inspector not found: {0}")]
    InspectorNotFound(i64),

    #[error("Runner not found: {0}")]
    RunnerNotFound(i64),

    #[error("Indexer not found: {0}")]
    IndexerNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// All list methods return only rows with `deleted = 0`; soft-deleted rows
/// stay addressable through the `get_*` methods because indexing and
/// statistics depend on historical records.
pub trait Storage {
    // ===== Crawlers =====

    /// Inserts a crawler configuration, returning its id
    fn insert_crawler(&mut self, crawler: &CrawlerRecord) -> StorageResult<i64>;

    /// Replaces a crawler configuration (including the `deleted` flag)
    fn update_crawler(&mut self, crawler: &CrawlerRecord) -> StorageResult<()>;

    /// Gets a crawler by id, soft-deleted or not
    fn get_crawler(&self, id: i64) -> StorageResult<CrawlerRecord>;

    /// Lists non-deleted crawlers in creation order
    fn list_crawlers(&self) -> StorageResult<Vec<CrawlerRecord>>;

    // ===== Inspectors =====

    /// Inserts an extraction rule, returning its id
    fn insert_inspector(&mut self, inspector: &InspectorRecord) -> StorageResult<i64>;

    /// Replaces an extraction rule
    fn update_inspector(&mut self, inspector: &InspectorRecord) -> StorageResult<()>;

    /// Gets an inspector by id, soft-deleted or not
    fn get_inspector(&self, id: i64) -> StorageResult<InspectorRecord>;

    /// Lists non-deleted inspectors, optionally restricted to one template
    fn list_inspectors(&self, template_id: Option<i64>) -> StorageResult<Vec<InspectorRecord>>;

    /// Loads a specific set of inspectors by id (deleted ones included)
    fn list_inspectors_by_ids(&self, ids: &[i64]) -> StorageResult<Vec<InspectorRecord>>;

    // ===== Runners =====

    /// Creates a runner row in status `new` for a crawler
    fn create_runner(&mut self, crawler_id: i64) -> StorageResult<i64>;

    /// Gets a runner by id
    fn get_runner(&self, id: i64) -> StorageResult<RunnerRecord>;

    /// Lists non-deleted runners in creation order
    fn list_runners(&self) -> StorageResult<Vec<RunnerRecord>>;

    /// Moves a runner to a new status; terminal statuses also stamp
    /// `completed_at`
    fn update_runner_status(
        &mut self,
        id: i64,
        status: RunnerStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()>;

    /// Soft-deletes a runner row
    fn mark_runner_deleted(&mut self, id: i64) -> StorageResult<()>;

    /// Writes the current statistics snapshot onto the runner row
    fn snapshot_runner(
        &mut self,
        id: i64,
        snapshot: &StatisticsSnapshot,
        collected_documents: u64,
    ) -> StorageResult<()>;

    /// Checks whether any runner feeding the given inspectors is still
    /// `running` (an index build must not start against one)
    fn any_runner_running_for_inspectors(&self, inspector_ids: &[i64]) -> StorageResult<bool>;

    // ===== Document store =====

    /// Writes one document and all its values in a single transaction
    ///
    /// The document fingerprint is derived from the ordered value/attribute
    /// pairs; re-crawling an unchanged page reuses the existing document row
    /// and upserts its values, so the operation is idempotent.
    ///
    /// Returns the document id.
    fn write_document(
        &mut self,
        template_id: i64,
        runner_id: i64,
        url: &str,
        values: &[NewValue],
    ) -> StorageResult<i64>;

    /// Bulk-reads all values belonging to the given inspectors, ordered by
    /// (document id, inspector id) for build determinism
    fn list_values_by_inspectors(&self, inspector_ids: &[i64]) -> StorageResult<Vec<StoredValue>>;

    /// Writes organic/boosted scores back onto value rows after a build
    fn write_back_scores(&mut self, scores: &[ScoreWriteBack]) -> StorageResult<()>;

    /// Exports all documents collected by one runner
    fn export_runner_documents(&self, runner_id: i64) -> StorageResult<Vec<DocumentExport>>;

    /// Counts documents collected by one runner
    fn count_runner_documents(&self, runner_id: i64) -> StorageResult<u64>;

    // ===== Indexers =====

    /// Inserts an indexer configuration, returning its id
    fn insert_indexer(&mut self, indexer: &IndexerRecord) -> StorageResult<i64>;

    /// Replaces an indexer configuration
    fn update_indexer(&mut self, indexer: &IndexerRecord) -> StorageResult<()>;

    /// Gets an indexer by id, soft-deleted or not
    fn get_indexer(&self, id: i64) -> StorageResult<IndexerRecord>;

    /// Lists non-deleted indexers in creation order
    fn list_indexers(&self) -> StorageResult<Vec<IndexerRecord>>;

    /// Moves an indexer to a new build status; `completed` also stamps
    /// `completed_at`
    fn update_indexer_status(
        &mut self,
        id: i64,
        status: IndexerStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()>;
}
