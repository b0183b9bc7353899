//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::{IndexerStatus, RunnerStatus, StatisticsSnapshot};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    CrawlerRecord, DocumentExport, ExportField, IndexerRecord, InspectorRecord, NewValue,
    RunnerRecord, ScoreWriteBack, StoredValue, ValueKind,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Parses a JSON list column, mapping failures into rusqlite's error type so
/// row closures stay composable
fn json_col<T: serde::de::DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Computes the content fingerprint of a document from its ordered values
fn document_fingerprint(values: &[NewValue]) -> String {
    let mut hasher = Sha256::new();
    for value in values {
        hasher.update(value.value.as_bytes());
        if let Some(attribute) = &value.attribute {
            hasher.update(attribute.as_bytes());
        }
    }
    hex::encode(hasher.finalize())
}

fn row_to_crawler(row: &Row<'_>) -> rusqlite::Result<CrawlerRecord> {
    Ok(CrawlerRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        seed_url: row.get(2)?,
        threads: row.get(3)?,
        retry: row.get(4)?,
        sleep_ms: row.get(5)?,
        timeout_ms: row.get(6)?,
        max_pages: row.get(7)?,
        max_depth: row.get(8)?,
        robot_file_url: row.get(9)?,
        excluded_urls: json_col(10, &row.get::<_, String>(10)?)?,
        scope_selectors: json_col(11, &row.get::<_, String>(11)?)?,
        before_actions: json_col(12, &row.get::<_, String>(12)?)?,
        template_id: row.get(13)?,
        created_at: row.get(14)?,
        deleted: row.get(15)?,
    })
}

const CRAWLER_COLUMNS: &str = "id, name, seed_url, threads, retry, sleep_ms, timeout_ms, \
     max_pages, max_depth, robot_file_url, excluded_urls, scope_selectors, before_actions, \
     template_id, created_at, deleted";

fn row_to_inspector(row: &Row<'_>) -> rusqlite::Result<InspectorRecord> {
    let kind_raw: String = row.get(4)?;
    Ok(InspectorRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        selector: row.get(2)?,
        attribute: row.get(3)?,
        kind: ValueKind::from_db_string(&kind_raw).unwrap_or(ValueKind::Text),
        variable_name: row.get(5)?,
        cleanup_expressions: json_col(6, &row.get::<_, String>(6)?)?,
        template_id: row.get(7)?,
        created_at: row.get(8)?,
        deleted: row.get(9)?,
    })
}

const INSPECTOR_COLUMNS: &str = "id, name, selector, attribute, kind, variable_name, \
     cleanup_expressions, template_id, created_at, deleted";

fn row_to_runner(row: &Row<'_>) -> rusqlite::Result<RunnerRecord> {
    let status_raw: String = row.get(2)?;
    let statistics: StatisticsSnapshot = json_col(4, &row.get::<_, String>(4)?)?;
    Ok(RunnerRecord {
        id: row.get(0)?,
        crawler_id: row.get(1)?,
        status: RunnerStatus::from_db_string(&status_raw).unwrap_or(RunnerStatus::Exit),
        collected_documents: row.get(3)?,
        statistics,
        error_message: row.get(5)?,
        created_at: row.get(6)?,
        completed_at: row.get(7)?,
        deleted: row.get(8)?,
    })
}

const RUNNER_COLUMNS: &str = "id, crawler_id, status, collected_documents, statistics, \
     error_message, created_at, completed_at, deleted";

fn row_to_indexer(row: &Row<'_>) -> rusqlite::Result<IndexerRecord> {
    let status_raw: String = row.get(2)?;
    Ok(IndexerRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        status: IndexerStatus::from_db_string(&status_raw).unwrap_or(IndexerStatus::Exit),
        inspector_ids: json_col(3, &row.get::<_, String>(3)?)?,
        k_parameter: row.get(4)?,
        b_parameter: row.get(5)?,
        q_gram_q: row.get::<_, i64>(6)? as usize,
        use_synonyms: row.get(7)?,
        dictionary_path: row.get(8)?,
        skip_words: json_col(9, &row.get::<_, String>(9)?)?,
        weight_words: json_col(10, &row.get::<_, String>(10)?)?,
        small_words_threshold: row.get::<_, i64>(11)? as usize,
        boosting_formula: row.get(12)?,
        error_message: row.get(13)?,
        created_at: row.get(14)?,
        completed_at: row.get(15)?,
        deleted: row.get(16)?,
    })
}

const INDEXER_COLUMNS: &str = "id, name, status, inspector_ids, k_parameter, b_parameter, \
     q_gram_q, use_synonyms, dictionary_path, skip_words, weight_words, \
     small_words_threshold, boosting_formula, error_message, created_at, completed_at, deleted";

/// Renders an id list into a SQL IN clause body
///
/// The ids are integers, so direct formatting is injection-safe; rusqlite has
/// no native array binding.
fn id_list(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Storage for SqliteStorage {
    // ===== Crawlers =====

    fn insert_crawler(&mut self, crawler: &CrawlerRecord) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO crawlers (name, seed_url, threads, retry, sleep_ms, timeout_ms, \
             max_pages, max_depth, robot_file_url, excluded_urls, scope_selectors, \
             before_actions, template_id, created_at, deleted) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, 0)",
            params![
                crawler.name,
                crawler.seed_url,
                crawler.threads,
                crawler.retry,
                crawler.sleep_ms,
                crawler.timeout_ms,
                crawler.max_pages,
                crawler.max_depth,
                crawler.robot_file_url,
                serde_json::to_string(&crawler.excluded_urls)?,
                serde_json::to_string(&crawler.scope_selectors)?,
                serde_json::to_string(&crawler.before_actions)?,
                crawler.template_id,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_crawler(&mut self, crawler: &CrawlerRecord) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE crawlers SET name = ?1, seed_url = ?2, threads = ?3, retry = ?4, \
             sleep_ms = ?5, timeout_ms = ?6, max_pages = ?7, max_depth = ?8, \
             robot_file_url = ?9, excluded_urls = ?10, scope_selectors = ?11, \
             before_actions = ?12, template_id = ?13, deleted = ?14 WHERE id = ?15",
            params![
                crawler.name,
                crawler.seed_url,
                crawler.threads,
                crawler.retry,
                crawler.sleep_ms,
                crawler.timeout_ms,
                crawler.max_pages,
                crawler.max_depth,
                crawler.robot_file_url,
                serde_json::to_string(&crawler.excluded_urls)?,
                serde_json::to_string(&crawler.scope_selectors)?,
                serde_json::to_string(&crawler.before_actions)?,
                crawler.template_id,
                crawler.deleted,
                crawler.id,
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::CrawlerNotFound(crawler.id));
        }
        Ok(())
    }

    fn get_crawler(&self, id: i64) -> StorageResult<CrawlerRecord> {
        let sql = format!("SELECT {} FROM crawlers WHERE id = ?1", CRAWLER_COLUMNS);
        self.conn
            .query_row(&sql, params![id], row_to_crawler)
            .optional()?
            .ok_or(StorageError::CrawlerNotFound(id))
    }

    fn list_crawlers(&self) -> StorageResult<Vec<CrawlerRecord>> {
        let sql = format!(
            "SELECT {} FROM crawlers WHERE deleted = 0 ORDER BY created_at, id",
            CRAWLER_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_crawler)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ===== Inspectors =====

    fn insert_inspector(&mut self, inspector: &InspectorRecord) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO inspectors (name, selector, attribute, kind, variable_name, \
             cleanup_expressions, template_id, created_at, deleted) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)",
            params![
                inspector.name,
                inspector.selector,
                inspector.attribute,
                inspector.kind.to_db_string(),
                inspector.variable_name,
                serde_json::to_string(&inspector.cleanup_expressions)?,
                inspector.template_id,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_inspector(&mut self, inspector: &InspectorRecord) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE inspectors SET name = ?1, selector = ?2, attribute = ?3, kind = ?4, \
             variable_name = ?5, cleanup_expressions = ?6, template_id = ?7, deleted = ?8 \
             WHERE id = ?9",
            params![
                inspector.name,
                inspector.selector,
                inspector.attribute,
                inspector.kind.to_db_string(),
                inspector.variable_name,
                serde_json::to_string(&inspector.cleanup_expressions)?,
                inspector.template_id,
                inspector.deleted,
                inspector.id,
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::InspectorNotFound(inspector.id));
        }
        Ok(())
    }

    fn get_inspector(&self, id: i64) -> StorageResult<InspectorRecord> {
        let sql = format!("SELECT {} FROM inspectors WHERE id = ?1", INSPECTOR_COLUMNS);
        self.conn
            .query_row(&sql, params![id], row_to_inspector)
            .optional()?
            .ok_or(StorageError::InspectorNotFound(id))
    }

    fn list_inspectors(&self, template_id: Option<i64>) -> StorageResult<Vec<InspectorRecord>> {
        let base = format!(
            "SELECT {} FROM inspectors WHERE deleted = 0",
            INSPECTOR_COLUMNS
        );
        let mut stmt;
        let rows = match template_id {
            Some(template) => {
                stmt = self
                    .conn
                    .prepare(&format!("{} AND template_id = ?1 ORDER BY created_at, id", base))?;
                stmt.query_map(params![template], row_to_inspector)?
            }
            None => {
                stmt = self
                    .conn
                    .prepare(&format!("{} ORDER BY created_at, id", base))?;
                stmt.query_map([], row_to_inspector)?
            }
        };
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn list_inspectors_by_ids(&self, ids: &[i64]) -> StorageResult<Vec<InspectorRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM inspectors WHERE id IN ({}) ORDER BY id",
            INSPECTOR_COLUMNS,
            id_list(ids)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_inspector)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ===== Runners =====

    fn create_runner(&mut self, crawler_id: i64) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        let empty_stats = serde_json::to_string(&StatisticsSnapshot::default())?;
        self.conn.execute(
            "INSERT INTO runners (crawler_id, status, collected_documents, statistics, \
             created_at, deleted) VALUES (?1, ?2, 0, ?3, ?4, 0)",
            params![crawler_id, RunnerStatus::New.to_db_string(), empty_stats, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_runner(&self, id: i64) -> StorageResult<RunnerRecord> {
        let sql = format!("SELECT {} FROM runners WHERE id = ?1", RUNNER_COLUMNS);
        self.conn
            .query_row(&sql, params![id], row_to_runner)
            .optional()?
            .ok_or(StorageError::RunnerNotFound(id))
    }

    fn list_runners(&self) -> StorageResult<Vec<RunnerRecord>> {
        let sql = format!(
            "SELECT {} FROM runners WHERE deleted = 0 ORDER BY created_at, id",
            RUNNER_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_runner)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn update_runner_status(
        &mut self,
        id: i64,
        status: RunnerStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let completed_at = if status.is_terminal() {
            Some(Utc::now().to_rfc3339())
        } else {
            None
        };
        let changed = self.conn.execute(
            "UPDATE runners SET status = ?1, error_message = ?2, \
             completed_at = COALESCE(?3, completed_at) WHERE id = ?4",
            params![status.to_db_string(), error_message, completed_at, id],
        )?;
        if changed == 0 {
            return Err(StorageError::RunnerNotFound(id));
        }
        Ok(())
    }

    fn mark_runner_deleted(&mut self, id: i64) -> StorageResult<()> {
        let changed = self
            .conn
            .execute("UPDATE runners SET deleted = 1 WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StorageError::RunnerNotFound(id));
        }
        Ok(())
    }

    fn snapshot_runner(
        &mut self,
        id: i64,
        snapshot: &StatisticsSnapshot,
        collected_documents: u64,
    ) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE runners SET statistics = ?1, collected_documents = ?2 WHERE id = ?3",
            params![serde_json::to_string(snapshot)?, collected_documents, id],
        )?;
        if changed == 0 {
            return Err(StorageError::RunnerNotFound(id));
        }
        Ok(())
    }

    fn any_runner_running_for_inspectors(&self, inspector_ids: &[i64]) -> StorageResult<bool> {
        if inspector_ids.is_empty() {
            return Ok(false);
        }
        let sql = format!(
            "SELECT COUNT(*) FROM runners r JOIN crawlers c ON r.crawler_id = c.id \
             WHERE r.status = 'running' AND c.template_id IN \
             (SELECT DISTINCT template_id FROM inspectors WHERE id IN ({}))",
            id_list(inspector_ids)
        );
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count > 0)
    }

    // ===== Document store =====

    fn write_document(
        &mut self,
        template_id: i64,
        runner_id: i64,
        url: &str,
        values: &[NewValue],
    ) -> StorageResult<i64> {
        let fingerprint = document_fingerprint(values);
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;

        // Re-crawling an unchanged page reuses the existing document row
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM documents WHERE template_id = ?1 AND fingerprint = ?2",
                params![template_id, fingerprint],
                |row| row.get(0),
            )
            .optional()?;

        let document_id = match existing {
            Some(id) => id,
            None => {
                tx.execute(
                    "INSERT INTO documents (template_id, runner_id, url, fingerprint, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![template_id, runner_id, url, fingerprint, now],
                )?;
                tx.last_insert_rowid()
            }
        };

        for value in values {
            tx.execute(
                "INSERT INTO inspector_values (document_id, inspector_id, value, attribute, \
                 url, kind, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
                 ON CONFLICT(document_id, inspector_id) DO UPDATE SET \
                 value = excluded.value, attribute = excluded.attribute, url = excluded.url",
                params![
                    document_id,
                    value.inspector_id,
                    value.value,
                    value.attribute,
                    url,
                    value.kind.to_db_string(),
                    now,
                ],
            )?;
        }

        tx.commit()?;
        Ok(document_id)
    }

    fn list_values_by_inspectors(&self, inspector_ids: &[i64]) -> StorageResult<Vec<StoredValue>> {
        if inspector_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT document_id, inspector_id, value, url FROM inspector_values \
             WHERE inspector_id IN ({}) ORDER BY document_id, inspector_id",
            id_list(inspector_ids)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(StoredValue {
                document_id: row.get(0)?,
                inspector_id: row.get(1)?,
                value: row.get(2)?,
                url: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn write_back_scores(&mut self, scores: &[ScoreWriteBack]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        for score in scores {
            tx.execute(
                "UPDATE inspector_values SET organic_score = ?1, boosted_score = ?2 \
                 WHERE document_id = ?3 AND inspector_id = ?4",
                params![
                    score.organic_score,
                    score.boosted_score,
                    score.document_id,
                    score.inspector_id,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn export_runner_documents(&self, runner_id: i64) -> StorageResult<Vec<DocumentExport>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.id, d.url, i.name, v.value FROM documents d \
             JOIN inspector_values v ON v.document_id = d.id \
             JOIN inspectors i ON i.id = v.inspector_id \
             WHERE d.runner_id = ?1 ORDER BY d.id, v.inspector_id",
        )?;
        let rows = stmt.query_map(params![runner_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut exports: Vec<DocumentExport> = Vec::new();
        for row in rows {
            let (document_id, url, inspector, value) = row?;
            match exports.last_mut() {
                Some(last) if last.document_id == document_id => {
                    last.fields.push(ExportField { inspector, value });
                }
                _ => exports.push(DocumentExport {
                    document_id,
                    url,
                    fields: vec![ExportField { inspector, value }],
                }),
            }
        }
        Ok(exports)
    }

    fn count_runner_documents(&self, runner_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE runner_id = ?1",
            params![runner_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Indexers =====

    fn insert_indexer(&mut self, indexer: &IndexerRecord) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO indexers (name, status, inspector_ids, k_parameter, b_parameter, \
             q_gram_q, use_synonyms, dictionary_path, skip_words, weight_words, \
             small_words_threshold, boosting_formula, created_at, deleted) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 0)",
            params![
                indexer.name,
                IndexerStatus::New.to_db_string(),
                serde_json::to_string(&indexer.inspector_ids)?,
                indexer.k_parameter,
                indexer.b_parameter,
                indexer.q_gram_q as i64,
                indexer.use_synonyms,
                indexer.dictionary_path,
                serde_json::to_string(&indexer.skip_words)?,
                serde_json::to_string(&indexer.weight_words)?,
                indexer.small_words_threshold as i64,
                indexer.boosting_formula,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_indexer(&mut self, indexer: &IndexerRecord) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE indexers SET name = ?1, inspector_ids = ?2, k_parameter = ?3, \
             b_parameter = ?4, q_gram_q = ?5, use_synonyms = ?6, dictionary_path = ?7, \
             skip_words = ?8, weight_words = ?9, small_words_threshold = ?10, \
             boosting_formula = ?11, deleted = ?12 WHERE id = ?13",
            params![
                indexer.name,
                serde_json::to_string(&indexer.inspector_ids)?,
                indexer.k_parameter,
                indexer.b_parameter,
                indexer.q_gram_q as i64,
                indexer.use_synonyms,
                indexer.dictionary_path,
                serde_json::to_string(&indexer.skip_words)?,
                serde_json::to_string(&indexer.weight_words)?,
                indexer.small_words_threshold as i64,
                indexer.boosting_formula,
                indexer.deleted,
                indexer.id,
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::IndexerNotFound(indexer.id));
        }
        Ok(())
    }

    fn get_indexer(&self, id: i64) -> StorageResult<IndexerRecord> {
        let sql = format!("SELECT {} FROM indexers WHERE id = ?1", INDEXER_COLUMNS);
        self.conn
            .query_row(&sql, params![id], row_to_indexer)
            .optional()?
            .ok_or(StorageError::IndexerNotFound(id))
    }

    fn list_indexers(&self) -> StorageResult<Vec<IndexerRecord>> {
        let sql = format!(
            "SELECT {} FROM indexers WHERE deleted = 0 ORDER BY created_at, id",
            INDEXER_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_indexer)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn update_indexer_status(
        &mut self,
        id: i64,
        status: IndexerStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let completed_at = if status.is_servable() {
            Some(Utc::now().to_rfc3339())
        } else {
            None
        };
        let changed = self.conn.execute(
            "UPDATE indexers SET status = ?1, error_message = ?2, \
             completed_at = COALESCE(?3, completed_at) WHERE id = ?4",
            params![status.to_db_string(), error_message, completed_at, id],
        )?;
        if changed == 0 {
            return Err(StorageError::IndexerNotFound(id));
        }
        Ok(())
    }
}
