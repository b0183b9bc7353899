//! Excluded-URL pattern matching
//!
//! A crawler config carries a list of regex patterns for URLs the run must
//! never enter (faceted navigation, login pages, endless calendars). The
//! patterns are compiled once per run and checked before a discovered link
//! is merged into the frontier.

use crate::ConfigError;
use regex::Regex;

/// Compiled excluded-URL rules for one crawl run
#[derive(Debug, Default)]
pub struct ExclusionRules {
    patterns: Vec<Regex>,
}

impl ExclusionRules {
    /// Compiles a list of patterns into exclusion rules
    ///
    /// An invalid pattern is a configuration error: the run must not start
    /// with rules the operator thinks are active but that silently never
    /// match.
    ///
    /// # Arguments
    ///
    /// * `patterns` - Regex patterns, one per excluded URL class
    pub fn compile(patterns: &[String]) -> Result<Self, ConfigError> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let trimmed = pattern.trim();
            if trimmed.is_empty() {
                continue;
            }
            let regex = Regex::new(trimmed).map_err(|e| {
                ConfigError::InvalidPattern(format!("{}: {}", trimmed, e))
            })?;
            compiled.push(regex);
        }
        Ok(Self { patterns: compiled })
    }

    /// Checks whether a URL matches any excluded pattern
    pub fn is_excluded(&self, url: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(url))
    }

    /// Returns the number of active patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns whether there are no active patterns
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
