//! Shared helpers for integration tests

use crawldex::config::{AppConfig, IndexConfig, ServerConfig, StorageConfig, UserAgentConfig};
use crawldex::context::AppContext;
use crawldex::state::RunnerStatus;
use crawldex::storage::{
    CrawlerRecord, InspectorRecord, RunnerRecord, SqliteStorage, Storage, ValueKind,
};
use std::time::{Duration, Instant};

/// Builds a test application config
pub fn test_config(dictionaries_dir: &str) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
        },
        storage: StorageConfig {
            database_path: ":memory:".to_string(),
        },
        user_agent: UserAgentConfig {
            crawler_name: "CrawldexBot".to_string(),
            crawler_version: "0.3".to_string(),
            contact_url: "https://example.com/bot".to_string(),
            contact_email: "bot@example.com".to_string(),
        },
        index: IndexConfig {
            dictionaries_dir: dictionaries_dir.to_string(),
        },
    }
}

/// Builds a context over an in-memory database
pub fn test_context(dictionaries_dir: &str) -> AppContext {
    AppContext::with_storage(
        test_config(dictionaries_dir),
        SqliteStorage::new_in_memory().expect("in-memory storage"),
    )
    .expect("context")
}

/// A crawler config pointing at a mock server
pub fn crawler_for(seed_url: &str, template_id: i64) -> CrawlerRecord {
    CrawlerRecord {
        id: 0,
        name: "test-crawler".to_string(),
        seed_url: seed_url.to_string(),
        threads: 2,
        retry: 1,
        sleep_ms: 5,
        timeout_ms: 2_000,
        max_pages: 50,
        max_depth: 3,
        robot_file_url: None,
        excluded_urls: vec![],
        scope_selectors: vec![],
        before_actions: vec![],
        template_id,
        created_at: String::new(),
        deleted: false,
    }
}

/// A text inspector for the given selector
pub fn inspector_for(selector: &str, name: &str, template_id: i64) -> InspectorRecord {
    InspectorRecord {
        id: 0,
        name: name.to_string(),
        selector: selector.to_string(),
        attribute: None,
        kind: ValueKind::Text,
        variable_name: Some(name.to_string()),
        cleanup_expressions: vec![],
        template_id,
        created_at: String::new(),
        deleted: false,
    }
}

/// Polls a runner row until it reaches a terminal status
pub async fn wait_for_terminal(context: &AppContext, runner_id: i64) -> RunnerRecord {
    let deadline = Instant::now() + Duration::from_secs(15);
    loop {
        let runner = context
            .storage
            .lock()
            .unwrap()
            .get_runner(runner_id)
            .expect("runner row");
        if runner.status.is_terminal() {
            return runner;
        }
        assert!(
            Instant::now() < deadline,
            "runner {} never reached a terminal status (last: {})",
            runner_id,
            runner.status
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Creates a crawler row and a new runner for it, returning both ids
pub fn seed_crawler_and_runner(
    context: &AppContext,
    crawler: &CrawlerRecord,
) -> (i64, i64) {
    let mut storage = context.storage.lock().unwrap();
    let crawler_id = storage.insert_crawler(crawler).expect("insert crawler");
    let runner_id = storage.create_runner(crawler_id).expect("create runner");
    (crawler_id, runner_id)
}

/// Asserts that a runner ended in the given status
pub fn assert_status(runner: &RunnerRecord, status: RunnerStatus) {
    assert_eq!(
        runner.status, status,
        "runner {} ended as {:?} (error: {:?})",
        runner.id, runner.status, runner.error_message
    );
}
