//! Process-wide application context
//!
//! One explicit context object owns everything the API handlers, crawl
//! runs and index builds share: the storage handle, the HTTP client, the
//! registry of live runs (for stop signals) and the registry of published
//! index artifacts. It is constructed once at startup and passed in; the
//! core has no ambient globals.

use crate::config::AppConfig;
use crate::crawler::{build_http_client, run_crawl, RunSetup};
use crate::index::{execute_build, IndexRegistry};
use crate::query::{search, suggest, SearchResults};
use crate::state::RunnerStatus;
use crate::storage::{SqliteStorage, Storage};
use crate::CrawldexError;
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Shared storage handle; rusqlite connections are not Sync, so tasks take
/// turns through one mutex
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Registry of live crawl runs and their stop signals
#[derive(Debug, Clone, Default)]
pub struct RunnerRegistry {
    inner: Arc<Mutex<HashMap<i64, watch::Sender<bool>>>>,
}

impl RunnerRegistry {
    /// Registers a run's stop channel
    fn insert(&self, runner_id: i64, stop_tx: watch::Sender<bool>) {
        self.inner.lock().unwrap().insert(runner_id, stop_tx);
    }

    /// Drops a finished run
    fn remove(&self, runner_id: i64) {
        self.inner.lock().unwrap().remove(&runner_id);
    }

    /// Sends the stop signal to a live run
    ///
    /// Returns false when the run is not live (already terminal or never
    /// started).
    pub fn stop(&self, runner_id: i64) -> bool {
        match self.inner.lock().unwrap().get(&runner_id) {
            Some(stop_tx) => stop_tx.send(true).is_ok(),
            None => false,
        }
    }

    /// Returns whether a run is currently live
    pub fn is_live(&self, runner_id: i64) -> bool {
        self.inner.lock().unwrap().contains_key(&runner_id)
    }
}

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub storage: SharedStorage,
    pub client: Client,
    pub runners: RunnerRegistry,
    pub indexes: IndexRegistry,
}

impl AppContext {
    /// Builds the context from the application config
    ///
    /// Opens (or creates) the database and builds the shared HTTP client.
    pub fn new(config: AppConfig) -> crate::Result<Self> {
        let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
        Self::with_storage(config, storage)
    }

    /// Builds the context over an existing storage handle (tests use an
    /// in-memory database)
    pub fn with_storage(config: AppConfig, storage: SqliteStorage) -> crate::Result<Self> {
        let client = build_http_client(&config.user_agent)?;
        Ok(Self {
            config,
            storage: Arc::new(Mutex::new(storage)),
            client,
            runners: RunnerRegistry::default(),
            indexes: IndexRegistry::new(),
        })
    }

    /// Starts the crawl run for an existing runner row
    ///
    /// The runner must be in status `new`; the run executes on its own
    /// task and the registry carries its stop channel until it finishes.
    pub fn start_runner(&self, runner_id: i64) -> crate::Result<()> {
        let (crawler, inspectors, status) = {
            let storage = self.storage.lock().unwrap();
            let runner = storage.get_runner(runner_id)?;
            let crawler = storage.get_crawler(runner.crawler_id)?;
            let inspectors = storage.list_inspectors(Some(crawler.template_id))?;
            (crawler, inspectors, runner.status)
        };

        if !status.can_transition(RunnerStatus::Running) {
            return Err(CrawldexError::InvalidTransition {
                from: status.to_string(),
                to: RunnerStatus::Running.to_string(),
            });
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        self.runners.insert(runner_id, stop_tx);

        let setup = RunSetup {
            crawler,
            inspectors,
            user_agent: self.config.user_agent.header_value(),
        };
        let storage = self.storage.clone();
        let client = self.client.clone();
        let registry = self.runners.clone();

        tokio::spawn(async move {
            if let Err(e) = run_crawl(storage, client, setup, runner_id, stop_rx).await {
                tracing::error!("Runner {} failed: {}", runner_id, e);
            }
            registry.remove(runner_id);
        });

        Ok(())
    }

    /// Signals a live run to stop
    ///
    /// The run transitions to `exit` once every worker has observed the
    /// signal; partially written documents are never left behind because
    /// document writes are transactional.
    pub fn stop_runner(&self, runner_id: i64) -> crate::Result<()> {
        if self.runners.stop(runner_id) {
            Ok(())
        } else {
            Err(CrawldexError::RunnerNotFound(runner_id))
        }
    }

    /// Kicks off an index build on a blocking task
    ///
    /// The build walks the indexer through its status machine and publishes
    /// the artifact on completion; failures land in `exit` and leave any
    /// previously published artifact servable.
    pub fn start_index_build(&self, indexer_id: i64) -> crate::Result<()> {
        // Existence check up front so the API can 404 synchronously
        let _ = self.storage.lock().unwrap().get_indexer(indexer_id)?;

        let storage = self.storage.clone();
        let registry = self.indexes.clone();
        let dictionaries_dir = PathBuf::from(&self.config.index.dictionaries_dir);

        tokio::task::spawn_blocking(move || {
            if let Err(e) = execute_build(&storage, &registry, &dictionaries_dir, indexer_id) {
                tracing::error!("Index build {} failed: {}", indexer_id, e);
            }
        });

        Ok(())
    }

    /// Answers a ranked search from the last published artifact
    ///
    /// Returns `None` when the indexer has never completed a build; the
    /// API surfaces this as an explicit "not ready" rather than an error.
    pub fn search(&self, indexer_id: i64, query: &str) -> Option<SearchResults> {
        self.indexes
            .get(indexer_id)
            .map(|artifact| search(&artifact, query))
    }

    /// Answers autosuggest from the last published artifact
    ///
    /// Never blocks and never errors: with no completed artifact the
    /// suggestion list is empty.
    pub fn suggest(&self, indexer_id: i64, partial: &str) -> Vec<String> {
        match self.indexes.get(indexer_id) {
            Some(artifact) => suggest(&artifact, partial),
            None => Vec::new(),
        }
    }

    /// Lists the indexer ids that currently serve a completed artifact
    pub fn available_indexers(&self) -> Vec<i64> {
        self.indexes.published_ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IndexConfig, ServerConfig, StorageConfig, UserAgentConfig};

    fn test_config() -> AppConfig {
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
            index: IndexConfig::default(),
        }
    }

    fn test_context() -> AppContext {
        AppContext::with_storage(test_config(), SqliteStorage::new_in_memory().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_stop_unknown_runner_is_error() {
        let context = test_context();
        assert!(context.stop_runner(42).is_err());
    }

    #[tokio::test]
    async fn test_start_runner_requires_new_status() {
        let context = test_context();
        let runner_id = {
            let mut storage = context.storage.lock().unwrap();
            let crawler_id = storage
                .insert_crawler(&crate::storage::test_fixtures::sample_crawler())
                .unwrap();
            let runner_id = storage.create_runner(crawler_id).unwrap();
            storage
                .update_runner_status(runner_id, RunnerStatus::Completed, None)
                .unwrap();
            runner_id
        };

        assert!(matches!(
            context.start_runner(runner_id),
            Err(CrawldexError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_search_without_artifact_is_not_ready() {
        let context = test_context();
        assert!(context.search(1, "lamp").is_none());
        assert!(context.suggest(1, "lam").is_empty());
        assert!(context.available_indexers().is_empty());
    }

    #[tokio::test]
    async fn test_start_build_unknown_indexer_is_error() {
        let context = test_context();
        assert!(context.start_index_build(99).is_err());
    }
}
