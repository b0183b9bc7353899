//! Robots.txt handling
//!
//! A crawler config may name an explicit robots file URL. When it does, the
//! file is fetched once at run start and every discovered link is checked
//! against it before entering the frontier. A missing config entry means no
//! robots filtering; a configured-but-unreachable file is a setup error that
//! fails the run (the operator asked for rules we cannot apply).

mod parser;

pub use parser::ParsedRobots;

use crate::CrawldexError;
use reqwest::Client;

/// Fetches and parses a robots file from an explicit URL
///
/// # Arguments
///
/// * `client` - The shared HTTP client
/// * `robots_url` - The robots file URL from the crawler config
///
/// # Returns
///
/// * `Ok(ParsedRobots)` - Parsed rules ready for `is_allowed` checks
/// * `Err(CrawldexError::RobotsUnreachable)` - The file could not be fetched
pub async fn fetch_robots(client: &Client, robots_url: &str) -> Result<ParsedRobots, CrawldexError> {
    let response = client.get(robots_url).send().await.map_err(|e| {
        tracing::warn!("Failed to fetch robots file {}: {}", robots_url, e);
        CrawldexError::RobotsUnreachable {
            url: robots_url.to_string(),
        }
    })?;

    if !response.status().is_success() {
        return Err(CrawldexError::RobotsUnreachable {
            url: robots_url.to_string(),
        });
    }

    let content = response
        .text()
        .await
        .map_err(|e| CrawldexError::Http {
            url: robots_url.to_string(),
            source: e,
        })?;

    Ok(ParsedRobots::from_content(&content))
}
