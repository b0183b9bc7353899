//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client with a proper user agent string
//! - GET requests bounded by the crawler's timeout
//! - Retry with backoff sleep for transient failures
//! - Error classification into the outcome the worker reports

use crate::config::UserAgentConfig;
use reqwest::Client;
use std::time::{Duration, Instant};

/// Per-request fetch behavior taken from the crawler config
#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Number of retries after the first attempt
    pub retry: u32,
    /// Sleep between attempts in milliseconds
    pub sleep_ms: u64,
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    /// Successfully fetched the page
    Success {
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value
        content_type: String,
        /// Page body content
        body: String,
        /// Time spent fetching, including retries
        load_time_ms: u64,
    },

    /// Terminal HTTP error (4xx, or 5xx after the retry budget)
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error after the retry budget (timeout, connection refused)
    NetworkError {
        /// Error description
        error: String,
    },
}

/// Builds the HTTP client shared by all workers
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns whether a status code is worth retrying
fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error()
}

/// Fetches a URL with retry logic
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 4xx | Terminal, no retry |
/// | HTTP 5xx | Retry up to `retry` times, `sleep_ms` between attempts |
/// | Timeout | Retry up to `retry` times |
/// | Connection error | Retry up to `retry` times |
///
/// Exhausting the budget converts the last transient failure into the
/// terminal outcome.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `policy` - Timeout and retry configuration
pub async fn fetch_page(client: &Client, url: &str, policy: FetchPolicy) -> FetchOutcome {
    let started = Instant::now();
    let timeout = Duration::from_millis(policy.timeout_ms);
    let mut attempt: u32 = 0;

    loop {
        let result = client.get(url).timeout(timeout).send().await;

        match result {
            Ok(response) => {
                let status = response.status();

                if is_transient_status(status) && attempt < policy.retry {
                    attempt += 1;
                    tracing::debug!(
                        "Transient HTTP {} for {}, retry {}/{}",
                        status.as_u16(),
                        url,
                        attempt,
                        policy.retry
                    );
                    tokio::time::sleep(Duration::from_millis(policy.sleep_ms)).await;
                    continue;
                }

                if !status.is_success() {
                    return FetchOutcome::HttpError {
                        status_code: status.as_u16(),
                    };
                }

                let content_type = response
                    .headers()
                    .get("content-type")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();

                match response.text().await {
                    Ok(body) => {
                        return FetchOutcome::Success {
                            status_code: status.as_u16(),
                            content_type,
                            body,
                            load_time_ms: started.elapsed().as_millis() as u64,
                        }
                    }
                    Err(e) => {
                        return FetchOutcome::NetworkError {
                            error: format!("Failed to read body: {}", e),
                        }
                    }
                }
            }
            Err(e) => {
                let transient = e.is_timeout() || e.is_connect();
                if transient && attempt < policy.retry {
                    attempt += 1;
                    tracing::debug!(
                        "Network error for {} ({}), retry {}/{}",
                        url,
                        e,
                        attempt,
                        policy.retry
                    );
                    tokio::time::sleep(Duration::from_millis(policy.sleep_ms)).await;
                    continue;
                }

                let error = if e.is_timeout() {
                    "Request timeout".to_string()
                } else if e.is_connect() {
                    "Connection failed".to_string()
                } else {
                    e.to_string()
                };
                return FetchOutcome::NetworkError { error };
            }
        }
    }
}
