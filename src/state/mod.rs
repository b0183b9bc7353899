//! Lifecycle state for runners and indexers
//!
//! This module defines the status machines for crawl runs and index builds,
//! and the statistics a running crawl accumulates.

mod indexer_status;
mod runner_status;
mod stats;

pub use indexer_status::IndexerStatus;
pub use runner_status::RunnerStatus;
pub use stats::{RunStatistics, StatisticsSnapshot};
