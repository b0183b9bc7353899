//! URL handling for the crawler
//!
//! This module handles URL normalization (the identity used for frontier
//! deduplication), host extraction, and the excluded-URL pattern rules.

mod matcher;
mod normalize;

pub use matcher::ExclusionRules;
pub use normalize::normalize_url;

use url::Url;

/// Extracts the lowercased host from a URL
///
/// Returns `None` for URLs without a host component (e.g. `mailto:`).
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether two URLs point at the same host
///
/// The crawler never leaves the seed's host; every discovered link is run
/// through this check before it can enter the frontier.
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (extract_host(a), extract_host(b)) {
        (Some(ha), Some(hb)) => ha == hb,
        _ => false,
    }
}
