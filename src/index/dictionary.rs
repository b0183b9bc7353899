//! Synonym dictionary loading
//!
//! A dictionary file holds one equivalence class per line, members separated
//! by `;` (for example `motorbike;motorcycle;bike`). Every member maps to
//! the class representative (the first member), and the mapping is applied
//! at both index and query time so either spelling finds documents carrying
//! the other.

use crate::index::tokenizer::normalize_term;
use crate::index::IndexError;
use std::collections::HashMap;
use std::path::Path;

/// Loaded synonym equivalence classes
#[derive(Debug, Clone, Default)]
pub struct SynonymMap {
    canonical: HashMap<String, String>,
}

impl SynonymMap {
    /// Creates an empty map (the state when synonyms are disabled)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads a dictionary file
    ///
    /// Blank lines and lines starting with `#` are ignored. Members are
    /// normalized with the index tokenizer so dictionary spelling quirks
    /// cannot split a class.
    ///
    /// # Arguments
    ///
    /// * `path` - The dictionary file path
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            IndexError::Dictionary(format!("{}: {}", path.display(), e))
        })?;
        Ok(Self::parse(&content))
    }

    /// Parses dictionary content
    pub fn parse(content: &str) -> Self {
        let mut canonical = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let members: Vec<String> = line
                .split(';')
                .map(normalize_term)
                .filter(|m| !m.is_empty())
                .collect();

            let Some(representative) = members.first().cloned() else {
                continue;
            };
            for member in members {
                canonical.entry(member).or_insert_with(|| representative.clone());
            }
        }

        Self { canonical }
    }

    /// Maps a normalized term to its class representative
    ///
    /// Terms outside every class map to themselves.
    pub fn canonicalize(&self, term: &str) -> String {
        self.canonical
            .get(term)
            .cloned()
            .unwrap_or_else(|| term.to_string())
    }

    /// Returns the number of mapped members
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    /// Returns whether no classes are loaded
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_classes() {
        let map = SynonymMap::parse("motorbike;motorcycle;bike\ncouch;sofa\n");

        assert_eq!(map.canonicalize("motorcycle"), "motorbike");
        assert_eq!(map.canonicalize("bike"), "motorbike");
        assert_eq!(map.canonicalize("motorbike"), "motorbike");
        assert_eq!(map.canonicalize("sofa"), "couch");
    }

    #[test]
    fn test_unknown_term_is_identity() {
        let map = SynonymMap::parse("couch;sofa\n");
        assert_eq!(map.canonicalize("table"), "table");
    }

    #[test]
    fn test_comments_and_blanks_ignored() {
        let map = SynonymMap::parse("# furniture\n\ncouch;sofa\n");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_members_are_normalized() {
        let map = SynonymMap::parse("Motor-Bike;MOTORCYCLE\n");
        assert_eq!(map.canonicalize("motorcycle"), "motorbike");
    }

    #[test]
    fn test_empty_map() {
        let map = SynonymMap::empty();
        assert!(map.is_empty());
        assert_eq!(map.canonicalize("anything"), "anything");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"motorbike;motorcycle\n").unwrap();

        let map = SynonymMap::load(file.path()).unwrap();
        assert_eq!(map.canonicalize("motorcycle"), "motorbike");
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(SynonymMap::load(Path::new("/nonexistent/dict.txt")).is_err());
    }
}
