//! Configuration validation
//!
//! Validates the process config at startup and entity configs
//! (crawlers, inspectors, indexers) when they arrive through the API and
//! again before a run or build starts. A config that passes here can still
//! fail at runtime (an unreachable robots file, for example), but every
//! statically checkable mistake is rejected up front.

use crate::config::AppConfig;
use crate::storage::{CrawlerRecord, IndexerRecord, InspectorRecord};
use crate::url::ExclusionRules;
use crate::ConfigError;
use std::net::SocketAddr;

/// Validates the process-level configuration
///
/// # Arguments
///
/// * `config` - The parsed application config
///
/// # Returns
///
/// * `Ok(())` - Configuration is usable
/// * `Err(ConfigError)` - A field is malformed
pub fn validate_app_config(config: &AppConfig) -> Result<(), ConfigError> {
    config
        .server
        .bind_address
        .parse::<SocketAddr>()
        .map_err(|_| {
            ConfigError::Validation(format!(
                "bind-address is not a socket address: {}",
                config.server.bind_address
            ))
        })?;

    if config.storage.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database-path must not be empty".to_string(),
        ));
    }

    if config.user_agent.crawler_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name must not be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a crawler configuration
///
/// Checked statically: the seed URL parses and is HTTP(S), the thread count
/// is at least one, limits are non-zero, excluded-URL patterns compile, and
/// scope selectors parse.
pub fn validate_crawler(crawler: &CrawlerRecord) -> Result<(), ConfigError> {
    let seed = url::Url::parse(&crawler.seed_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", crawler.seed_url, e)))?;
    if seed.scheme() != "http" && seed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "seed URL must be http(s): {}",
            crawler.seed_url
        )));
    }

    if crawler.threads == 0 {
        return Err(ConfigError::Validation(
            "threads must be at least 1".to_string(),
        ));
    }
    if crawler.max_pages == 0 {
        return Err(ConfigError::Validation(
            "max_pages must be at least 1".to_string(),
        ));
    }

    // Compiling is the validation
    ExclusionRules::compile(&crawler.excluded_urls)?;

    for selector in &crawler.scope_selectors {
        if scraper::Selector::parse(selector).is_err() {
            return Err(ConfigError::InvalidPattern(format!(
                "scope selector does not parse: {}",
                selector
            )));
        }
    }

    if let Some(robots) = &crawler.robot_file_url {
        url::Url::parse(robots)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", robots, e)))?;
    }

    Ok(())
}

/// Validates an inspector configuration
pub fn validate_inspector(inspector: &InspectorRecord) -> Result<(), ConfigError> {
    if scraper::Selector::parse(&inspector.selector).is_err() {
        return Err(ConfigError::InvalidPattern(format!(
            "inspector selector does not parse: {}",
            inspector.selector
        )));
    }

    for rule in &inspector.cleanup_expressions {
        let Some((pattern, _replacement)) = rule.split_once('=') else {
            return Err(ConfigError::InvalidPattern(format!(
                "clean-up rule is not pattern=replacement: {}",
                rule
            )));
        };
        regex::Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("clean-up pattern {}: {}", pattern, e))
        })?;
    }

    Ok(())
}

/// Validates an indexer configuration
pub fn validate_indexer(indexer: &IndexerRecord) -> Result<(), ConfigError> {
    if indexer.inspector_ids.is_empty() {
        return Err(ConfigError::Validation(
            "an indexer must name at least one inspector".to_string(),
        ));
    }
    if indexer.q_gram_q < 2 {
        return Err(ConfigError::Validation(
            "q_gram_q must be at least 2".to_string(),
        ));
    }
    if indexer.k_parameter < 0.0 {
        return Err(ConfigError::Validation(
            "k_parameter must be non-negative".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&indexer.b_parameter) {
        return Err(ConfigError::Validation(
            "b_parameter must be between 0 and 1".to_string(),
        ));
    }

    for entry in &indexer.weight_words {
        let Some((word, factor)) = entry.split_once('=') else {
            return Err(ConfigError::Validation(format!(
                "weight word is not word=factor: {}",
                entry
            )));
        };
        if word.trim().is_empty() || factor.trim().parse::<f64>().is_err() {
            return Err(ConfigError::Validation(format!(
                "weight word has no numeric factor: {}",
                entry
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_fixtures::{sample_crawler, sample_indexer, sample_inspector};

    #[test]
    fn test_valid_crawler_passes() {
        let crawler = sample_crawler();
        assert!(validate_crawler(&crawler).is_ok());
    }

    #[test]
    fn test_crawler_rejects_bad_seed() {
        let mut crawler = sample_crawler();
        crawler.seed_url = "not a url".to_string();
        assert!(validate_crawler(&crawler).is_err());

        crawler.seed_url = "ftp://example.com".to_string();
        assert!(validate_crawler(&crawler).is_err());
    }

    #[test]
    fn test_crawler_rejects_zero_threads() {
        let mut crawler = sample_crawler();
        crawler.threads = 0;
        assert!(validate_crawler(&crawler).is_err());
    }

    #[test]
    fn test_crawler_rejects_bad_pattern() {
        let mut crawler = sample_crawler();
        crawler.excluded_urls = vec!["(unclosed".to_string()];
        assert!(validate_crawler(&crawler).is_err());
    }

    #[test]
    fn test_crawler_rejects_bad_scope_selector() {
        let mut crawler = sample_crawler();
        crawler.scope_selectors = vec![":::nope".to_string()];
        assert!(validate_crawler(&crawler).is_err());
    }

    #[test]
    fn test_inspector_rejects_bad_cleanup_rule() {
        let mut inspector = sample_inspector();
        inspector.cleanup_expressions = vec!["no-equals-sign".to_string()];
        assert!(validate_inspector(&inspector).is_err());

        inspector.cleanup_expressions = vec!["(bad=x".to_string()];
        assert!(validate_inspector(&inspector).is_err());
    }

    #[test]
    fn test_inspector_accepts_cleanup_rules() {
        let mut inspector = sample_inspector();
        inspector.cleanup_expressions =
            vec!["[^0-9.]=".to_string(), ",=.".to_string()];
        assert!(validate_inspector(&inspector).is_ok());
    }

    #[test]
    fn test_indexer_bounds() {
        let mut indexer = sample_indexer();
        assert!(validate_indexer(&indexer).is_ok());

        indexer.q_gram_q = 1;
        assert!(validate_indexer(&indexer).is_err());
        indexer.q_gram_q = 3;

        indexer.b_parameter = 1.5;
        assert!(validate_indexer(&indexer).is_err());
        indexer.b_parameter = 0.75;

        indexer.inspector_ids.clear();
        assert!(validate_indexer(&indexer).is_err());
    }

    #[test]
    fn test_indexer_weight_words() {
        let mut indexer = sample_indexer();
        indexer.weight_words = vec!["sale=2".to_string(), "premium=1.5".to_string()];
        assert!(validate_indexer(&indexer).is_ok());

        indexer.weight_words = vec!["broken".to_string()];
        assert!(validate_indexer(&indexer).is_err());

        indexer.weight_words = vec!["word=abc".to_string()];
        assert!(validate_indexer(&indexer).is_err());
    }
}
