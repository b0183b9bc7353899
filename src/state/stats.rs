//! Run statistics accumulation
//!
//! Every worker reports into one shared `RunStatistics` behind a mutex; the
//! UI polls the derived `StatisticsSnapshot` through the runner row. Failed
//! fetches land in the HTTP-code histogram instead of failing the run;
//! network-level errors that never produced a status code count under 0.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mutable statistics owned by a running crawl
#[derive(Debug, Default)]
pub struct RunStatistics {
    /// Pages fetched (successfully or not)
    pub visited_pages: u64,

    /// Documents written to the store
    pub collected_documents: u64,

    /// HTTP status code histogram; code 0 = network error
    pub http_codes: HashMap<u16, u64>,

    /// URL currently being processed, per worker slot
    pub current_urls: HashMap<usize, String>,

    total_processing_ms: u64,
    total_load_ms: u64,
    total_page_bytes: u64,
}

impl RunStatistics {
    /// Creates empty statistics for a new run
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one fetch attempt in the HTTP-code histogram
    ///
    /// # Arguments
    ///
    /// * `status_code` - The final HTTP status, or 0 for a network error
    pub fn record_http_code(&mut self, status_code: u16) {
        *self.http_codes.entry(status_code).or_insert(0) += 1;
    }

    /// Records a fully processed page
    ///
    /// # Arguments
    ///
    /// * `load_ms` - Time spent fetching the page
    /// * `processing_ms` - Total time from dispatch to outcome handling
    /// * `page_bytes` - Size of the fetched body
    /// * `documents` - Number of documents extracted from the page
    pub fn record_page(
        &mut self,
        load_ms: u64,
        processing_ms: u64,
        page_bytes: u64,
        documents: u64,
    ) {
        self.visited_pages += 1;
        self.collected_documents += documents;
        self.total_load_ms += load_ms;
        self.total_processing_ms += processing_ms;
        self.total_page_bytes += page_bytes;
    }

    /// Marks a worker slot as currently processing a URL
    pub fn set_current_url(&mut self, slot: usize, url: &str) {
        self.current_urls.insert(slot, url.to_string());
    }

    /// Clears a worker slot once it goes idle
    pub fn clear_current_url(&mut self, slot: usize) {
        self.current_urls.remove(&slot);
    }

    /// Produces the serializable snapshot the UI polls
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let pages = self.visited_pages;
        let avg = |total: u64| -> f64 {
            if pages == 0 {
                0.0
            } else {
                total as f64 / pages as f64
            }
        };

        StatisticsSnapshot {
            visited_pages: pages,
            average_docs_per_page: avg(self.collected_documents),
            average_processing_time_ms: avg(self.total_processing_ms),
            average_load_time_ms: avg(self.total_load_ms),
            average_page_size_bytes: avg(self.total_page_bytes),
            http_codes: self
                .http_codes
                .iter()
                .map(|(code, count)| (code.to_string(), *count))
                .collect(),
            current_crawled_url: self
                .current_urls
                .iter()
                .map(|(slot, url)| (slot.to_string(), url.clone()))
                .collect(),
        }
    }
}

/// Point-in-time statistics view stored on the runner row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub visited_pages: u64,
    pub average_docs_per_page: f64,
    pub average_processing_time_ms: f64,
    pub average_load_time_ms: f64,
    pub average_page_size_bytes: f64,
    pub http_codes: HashMap<String, u64>,
    pub current_crawled_url: HashMap<String, String>,
}
