//! Crawl run orchestration
//!
//! Owns one run end to end: setup (validation, rule compilation, robots
//! fetch), the bounded worker pool, the shared frontier and statistics, the
//! stop signal, and the terminal status transition. Workers never share
//! mutable state with each other directly; everything shared sits behind
//! the frontier and statistics locks.

use crate::config::validate_crawler;
use crate::crawler::extractor::RunInspector;
use crate::crawler::fetcher::FetchPolicy;
use crate::crawler::scheduler::{Frontier, FrontierNext};
use crate::crawler::worker::{process_page, PageOutcome};
use crate::robots::{fetch_robots, ParsedRobots};
use crate::state::{RunStatistics, RunnerStatus};
use crate::storage::{CrawlerRecord, InspectorRecord, SqliteStorage, Storage};
use crate::url::{same_host, ExclusionRules};
use crate::{normalize_url, CrawldexError};
use reqwest::Client;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{watch, Notify};
use url::Url;

/// Snapshot cadence: pages between statistics snapshots to the runner row
const SNAPSHOT_EVERY_PAGES: u64 = 10;

/// Idle re-check interval for workers parked on an empty frontier
const IDLE_RECHECK_MS: u64 = 50;

/// Everything a run needs that the caller resolves up front
#[derive(Debug)]
pub struct RunSetup {
    pub crawler: CrawlerRecord,
    pub inspectors: Vec<InspectorRecord>,
    pub user_agent: String,
}

/// Shared state for one run's worker pool
struct RunContext {
    client: Client,
    storage: Arc<Mutex<SqliteStorage>>,
    frontier: Mutex<Frontier>,
    stats: Mutex<RunStatistics>,
    notify: Notify,
    exclusion: ExclusionRules,
    robots: ParsedRobots,
    user_agent: String,
    seed: Url,
    seed_error: Mutex<Option<String>>,
    policy: FetchPolicy,
    scope_selectors: Vec<String>,
    before_actions: Vec<crate::storage::PageAction>,
    inspectors: Vec<RunInspector>,
    template_id: i64,
    runner_id: i64,
    threads: usize,
}

impl RunContext {
    /// Writes the current statistics snapshot onto the runner row
    fn snapshot(&self) {
        let (snapshot, collected) = {
            let stats = self.stats.lock().unwrap();
            (stats.snapshot(), stats.collected_documents)
        };
        if let Err(e) = self
            .storage
            .lock()
            .unwrap()
            .snapshot_runner(self.runner_id, &snapshot, collected)
        {
            tracing::warn!("Failed to snapshot runner {}: {}", self.runner_id, e);
        }
    }
}

/// Runs a crawl to its terminal status
///
/// Setup failures (invalid config, unreachable robots file) move the runner
/// straight to `exit`. A drained frontier or an exhausted page budget ends
/// in `completed`; an observed stop signal ends in `exit`.
///
/// # Arguments
///
/// * `storage` - Shared storage handle
/// * `client` - Shared HTTP client
/// * `setup` - The crawler config, its inspectors, and the user agent
/// * `runner_id` - The runner row to drive
/// * `stop_rx` - Stop signal; observed by every worker at its next
///   suspension point
pub async fn run_crawl(
    storage: Arc<Mutex<SqliteStorage>>,
    client: Client,
    setup: RunSetup,
    runner_id: i64,
    stop_rx: watch::Receiver<bool>,
) -> crate::Result<()> {
    let context = match prepare_run(storage.clone(), client, setup, runner_id).await {
        Ok(context) => Arc::new(context),
        Err(e) => {
            let message = e.to_string();
            tracing::error!("Runner {} setup failed: {}", runner_id, message);
            storage.lock().unwrap().update_runner_status(
                runner_id,
                RunnerStatus::Exit,
                Some(&message),
            )?;
            return Err(e);
        }
    };

    storage
        .lock()
        .unwrap()
        .update_runner_status(runner_id, RunnerStatus::Running, None)?;
    tracing::info!(
        "Runner {} started: seed {}, {} workers",
        runner_id,
        context.seed,
        context.threads
    );

    let started = Instant::now();
    let workers: Vec<_> = (0..context.threads)
        .map(|slot| {
            let context = context.clone();
            let stop_rx = stop_rx.clone();
            tokio::spawn(worker_loop(context, slot, stop_rx))
        })
        .collect();

    futures::future::join_all(workers).await;

    context.snapshot();

    let stopped = *stop_rx.borrow();
    let seed_error = context.seed_error.lock().unwrap().clone();
    let collected = context.stats.lock().unwrap().collected_documents;

    let (status, message) = if stopped {
        (RunnerStatus::Exit, Some("stopped by user".to_string()))
    } else if let Some(error) = seed_error.filter(|_| collected == 0) {
        (RunnerStatus::Exit, Some(format!("seed unreachable: {}", error)))
    } else {
        (RunnerStatus::Completed, None)
    };

    storage
        .lock()
        .unwrap()
        .update_runner_status(runner_id, status, message.as_deref())?;
    tracing::info!(
        "Runner {} finished as {} in {:?}: {} pages, {} documents",
        runner_id,
        status,
        started.elapsed(),
        context.frontier.lock().unwrap().dispatched(),
        collected
    );

    Ok(())
}

/// Validates config, compiles rules, fetches robots, seeds the frontier
async fn prepare_run(
    storage: Arc<Mutex<SqliteStorage>>,
    client: Client,
    setup: RunSetup,
    runner_id: i64,
) -> crate::Result<RunContext> {
    let crawler = setup.crawler;
    validate_crawler(&crawler)?;

    let exclusion = ExclusionRules::compile(&crawler.excluded_urls)?;

    let mut inspectors = Vec::with_capacity(setup.inspectors.len());
    for record in setup.inspectors {
        if record.deleted {
            continue;
        }
        inspectors.push(RunInspector::compile(record)?);
    }

    let robots = match &crawler.robot_file_url {
        Some(robots_url) if !robots_url.trim().is_empty() => {
            fetch_robots(&client, robots_url).await?
        }
        _ => ParsedRobots::allow_all(),
    };

    let seed = normalize_url(&crawler.seed_url)?;

    let mut frontier = Frontier::new(crawler.max_pages, crawler.max_depth);
    if !robots.is_allowed(seed.as_str(), &setup.user_agent) {
        return Err(CrawldexError::SeedDisallowed {
            url: seed.to_string(),
        });
    }
    frontier.enqueue(&seed, 0);

    Ok(RunContext {
        client,
        storage,
        frontier: Mutex::new(frontier),
        stats: Mutex::new(RunStatistics::new()),
        notify: Notify::new(),
        exclusion,
        robots,
        user_agent: setup.user_agent,
        seed,
        seed_error: Mutex::new(None),
        policy: FetchPolicy {
            timeout_ms: crawler.timeout_ms,
            retry: crawler.retry,
            sleep_ms: crawler.sleep_ms,
        },
        scope_selectors: crawler.scope_selectors.clone(),
        before_actions: crawler.before_actions.clone(),
        inspectors,
        template_id: crawler.template_id,
        runner_id,
        threads: crawler.threads as usize,
    })
}

/// One worker slot: pull, process, merge, repeat
async fn worker_loop(context: Arc<RunContext>, slot: usize, mut stop_rx: watch::Receiver<bool>) {
    loop {
        if *stop_rx.borrow() {
            tracing::debug!("Worker {} observed stop signal", slot);
            break;
        }

        let next = context.frontier.lock().unwrap().next();
        match next {
            FrontierNext::Task { url, depth } => {
                context
                    .stats
                    .lock()
                    .unwrap()
                    .set_current_url(slot, url.as_str());

                process_task(&context, &url, depth).await;

                {
                    let mut stats = context.stats.lock().unwrap();
                    stats.clear_current_url(slot);
                }
                context.frontier.lock().unwrap().task_done();
                context.notify.notify_waiters();

                let visited = context.stats.lock().unwrap().visited_pages;
                if visited % SNAPSHOT_EVERY_PAGES == 0 {
                    context.snapshot();
                }
            }
            FrontierNext::Wait => {
                tokio::select! {
                    _ = context.notify.notified() => {}
                    _ = tokio::time::sleep(std::time::Duration::from_millis(IDLE_RECHECK_MS)) => {}
                    _ = stop_rx.changed() => {}
                }
            }
            FrontierNext::Done => break,
        }
    }
}

/// Processes one dispatched page and folds its outcome into shared state
async fn process_task(context: &RunContext, url: &Url, depth: u32) {
    let started = Instant::now();
    let outcome = process_page(
        &context.client,
        url,
        context.policy,
        &context.before_actions,
        &context.scope_selectors,
        &context.inspectors,
    )
    .await;
    let processing_ms = started.elapsed().as_millis() as u64;

    match outcome {
        PageOutcome::Fetched {
            extracted,
            status_code,
            load_time_ms,
            page_bytes,
        } => {
            let mut documents_written = 0u64;
            for values in &extracted.documents {
                let result = context.storage.lock().unwrap().write_document(
                    context.template_id,
                    context.runner_id,
                    url.as_str(),
                    values,
                );
                match result {
                    Ok(_) => documents_written += 1,
                    Err(e) => {
                        tracing::error!("Failed to write document from {}: {}", url, e)
                    }
                }
            }

            let mut enqueued = 0usize;
            {
                let mut frontier = context.frontier.lock().unwrap();
                for link in &extracted.links {
                    if !same_host(&context.seed, link) {
                        continue;
                    }
                    if context.exclusion.is_excluded(link.as_str()) {
                        continue;
                    }
                    if !context.robots.is_allowed(link.as_str(), &context.user_agent) {
                        continue;
                    }
                    if frontier.enqueue(link, depth + 1) {
                        enqueued += 1;
                    }
                }
            }
            if enqueued > 0 {
                context.notify.notify_waiters();
            }

            let mut stats = context.stats.lock().unwrap();
            stats.record_http_code(status_code);
            stats.record_page(load_time_ms, processing_ms, page_bytes, documents_written);
            tracing::debug!(
                "Processed {} (depth {}): {} documents, {} new links",
                url,
                depth,
                documents_written,
                enqueued
            );
        }
        PageOutcome::Skipped { reason, status_code } => {
            let mut stats = context.stats.lock().unwrap();
            stats.record_http_code(status_code);
            stats.record_page(0, processing_ms, 0, 0);
            tracing::debug!("Skipped {}: {}", url, reason);
        }
        PageOutcome::Failed { error, status_code } => {
            if depth == 0 {
                let mut seed_error = context.seed_error.lock().unwrap();
                if seed_error.is_none() {
                    *seed_error = Some(error.clone());
                }
            }
            let mut stats = context.stats.lock().unwrap();
            stats.record_http_code(status_code);
            stats.record_page(0, processing_ms, 0, 0);
            tracing::debug!("Failed {} ({}): {}", url, status_code, error);
        }
    }
}
