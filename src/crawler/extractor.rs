//! HTML extraction: links and inspector values
//!
//! Extraction is restricted to the crawler's scope selectors (the whole
//! document when none are configured). Within scope, `<a href>` targets
//! become frontier candidates and every inspector's selector/attribute/
//! clean-up pipeline produces value drafts. The i-th match of each
//! inspector forms the i-th document candidate; inspectors matching unequal
//! counts on a page produce no documents for that page, since the groups
//! cannot be aligned.

use crate::storage::{InspectorRecord, NewValue, ValueKind};
use crate::ConfigError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// An inspector with its clean-up rules compiled for the run
///
/// Selectors are kept as strings and parsed per page: the parsed form does
/// not travel between workers, and validation has already proven they
/// parse.
#[derive(Debug, Clone)]
pub struct RunInspector {
    pub record: InspectorRecord,
    cleanup: Vec<(Regex, String)>,
}

impl RunInspector {
    /// Compiles an inspector's clean-up rules
    ///
    /// # Arguments
    ///
    /// * `record` - The inspector row
    pub fn compile(record: InspectorRecord) -> Result<Self, ConfigError> {
        let mut cleanup = Vec::with_capacity(record.cleanup_expressions.len());
        for rule in &record.cleanup_expressions {
            let (pattern, replacement) = rule.split_once('=').ok_or_else(|| {
                ConfigError::InvalidPattern(format!("clean-up rule: {}", rule))
            })?;
            let regex = Regex::new(pattern).map_err(|e| {
                ConfigError::InvalidPattern(format!("clean-up pattern {}: {}", pattern, e))
            })?;
            cleanup.push((regex, replacement.to_string()));
        }
        Ok(Self { record, cleanup })
    }

    /// Applies the clean-up rules in declared order to one raw value
    ///
    /// Every value starts from the first rule again; rules never carry
    /// state between values.
    pub fn clean(&self, raw: &str) -> String {
        let mut value = raw.to_string();
        for (regex, replacement) in &self.cleanup {
            value = regex.replace_all(&value, replacement.as_str()).into_owned();
        }
        value.trim().to_string()
    }
}

/// Everything extracted from one page
#[derive(Debug, Default)]
pub struct ExtractedPage {
    /// Aligned document candidates, each a full set of inspector values
    pub documents: Vec<Vec<NewValue>>,
    /// Outbound link candidates (absolute, fragment-stripped)
    pub links: Vec<Url>,
}

/// Parses a page and extracts links and inspector values
///
/// # Arguments
///
/// * `html` - The fetched page body
/// * `page_url` - The page URL, used to resolve relative links
/// * `scope_selectors` - CSS selectors bounding extraction; empty = whole page
/// * `inspectors` - The compiled extraction rules of the crawler's template
pub fn extract_page(
    html: &str,
    page_url: &Url,
    scope_selectors: &[String],
    inspectors: &[RunInspector],
) -> ExtractedPage {
    let document = Html::parse_document(html);

    let roots = scope_roots(&document, scope_selectors);

    let links = collect_links(&roots, page_url);
    let documents = collect_documents(&roots, inspectors, page_url);

    ExtractedPage { documents, links }
}

/// Resolves the scope roots for extraction
///
/// Selectors that match nothing contribute nothing; with no selectors
/// configured (or none parsing) the document root is the single scope.
fn scope_roots<'a>(document: &'a Html, scope_selectors: &[String]) -> Vec<ElementRef<'a>> {
    let mut roots = Vec::new();
    for raw in scope_selectors {
        let Ok(selector) = Selector::parse(raw) else {
            tracing::warn!("Scope selector does not parse, skipping: {}", raw);
            continue;
        };
        roots.extend(document.select(&selector));
    }

    if scope_selectors.is_empty() {
        roots.push(document.root_element());
    }
    roots
}

/// Collects link candidates from the scope roots
fn collect_links(roots: &[ElementRef<'_>], page_url: &Url) -> Vec<Url> {
    let Ok(anchor) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let mut links = Vec::new();

    for root in roots {
        for element in root.select(&anchor) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            // Fragments never name a different resource
            let href = href.split('#').next().unwrap_or("").trim();
            if href.is_empty()
                || href.starts_with("javascript:")
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
                || href.starts_with("data:")
            {
                continue;
            }
            let Ok(absolute) = page_url.join(href) else {
                continue;
            };
            if absolute.scheme() == "http" || absolute.scheme() == "https" {
                links.push(absolute);
            }
        }
    }
    links
}

/// Extracts the raw value and attribute content for one matched element
fn element_value(element: &ElementRef<'_>, inspector: &RunInspector) -> (String, Option<String>) {
    let attribute_name = inspector
        .record
        .attribute
        .as_deref()
        .filter(|name| !name.is_empty())
        .or_else(|| inspector.record.kind.default_attribute());

    let attribute = attribute_name
        .and_then(|name| element.value().attr(name))
        .map(|v| v.to_string());

    let text: String = element.text().collect::<String>().trim().to_string();

    let raw = match inspector.record.kind {
        ValueKind::Text => text,
        // Image/link inspectors are about the target, not the anchor text
        ValueKind::Image | ValueKind::Link => attribute.clone().unwrap_or(text),
    };

    (raw, attribute)
}

/// Applies every inspector inside the scope roots and aligns the matches
/// into document candidates
fn collect_documents(
    roots: &[ElementRef<'_>],
    inspectors: &[RunInspector],
    page_url: &Url,
) -> Vec<Vec<NewValue>> {
    if inspectors.is_empty() {
        return Vec::new();
    }

    let mut per_inspector: Vec<Vec<NewValue>> = Vec::with_capacity(inspectors.len());
    for inspector in inspectors {
        let Ok(selector) = Selector::parse(&inspector.record.selector) else {
            tracing::warn!(
                "Inspector selector does not parse, skipping page: {}",
                inspector.record.selector
            );
            return Vec::new();
        };

        let mut values = Vec::new();
        for root in roots {
            for element in root.select(&selector) {
                let (raw, attribute) = element_value(&element, inspector);
                values.push(NewValue {
                    inspector_id: inspector.record.id,
                    value: inspector.clean(&raw),
                    attribute,
                    kind: inspector.record.kind,
                });
            }
        }
        per_inspector.push(values);
    }

    let counts: Vec<usize> = per_inspector.iter().map(|v| v.len()).collect();
    if counts.iter().any(|&c| c == 0) {
        return Vec::new();
    }
    if counts.windows(2).any(|w| w[0] != w[1]) {
        tracing::debug!(
            "Unaligned inspector matches on {} ({:?}), page yields no documents",
            page_url,
            counts
        );
        return Vec::new();
    }

    let documents_count = counts[0];
    let mut documents = Vec::with_capacity(documents_count);
    for i in 0..documents_count {
        let mut values = Vec::with_capacity(per_inspector.len());
        for inspector_values in &per_inspector {
            values.push(inspector_values[i].clone());
        }
        documents.push(values);
    }
    documents
}
