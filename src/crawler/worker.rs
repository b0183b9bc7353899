//! Crawl worker: the single-page contract
//!
//! Given a URL and the run's compiled rules, a worker fetches the page,
//! runs the configured before-actions, and extracts inspector values and
//! frontier candidates. Workers have no side effects beyond network I/O;
//! writing values and merging links is the runner's job.

use crate::crawler::extractor::{extract_page, ExtractedPage, RunInspector};
use crate::crawler::fetcher::{fetch_page, FetchOutcome, FetchPolicy};
use crate::storage::PageAction;
use reqwest::Client;
use url::Url;

/// Outcome of processing a single page
#[derive(Debug)]
pub enum PageOutcome {
    /// Page fetched and extracted
    Fetched {
        extracted: ExtractedPage,
        status_code: u16,
        load_time_ms: u64,
        page_bytes: u64,
    },

    /// Page fetched but not processed (for example, not HTML)
    Skipped { reason: String, status_code: u16 },

    /// Fetch failed after the retry budget
    Failed {
        error: String,
        /// The HTTP status, or 0 for network-level failures
        status_code: u16,
    },
}

/// Executes the crawler's before-actions
///
/// One switch over the action kinds. `Wait` sleeps; `Click` and `Scroll`
/// need a live browser session, which the static fetcher does not have, so
/// they are logged and skipped.
async fn run_before_actions(actions: &[PageAction]) {
    for action in actions {
        match action {
            PageAction::Wait { seconds } => {
                tokio::time::sleep(std::time::Duration::from_secs(*seconds)).await;
            }
            PageAction::Click { selector } => {
                tracing::debug!("Click action ({}) needs a browser session, skipped", selector);
            }
            PageAction::Scroll { times } => {
                tracing::debug!("Scroll action (x{}) needs a browser session, skipped", times);
            }
        }
    }
}

/// Fetches and extracts one page
///
/// # Arguments
///
/// * `client` - The shared HTTP client
/// * `url` - The page to process
/// * `policy` - Timeout/retry configuration
/// * `before_actions` - Actions run before extraction
/// * `scope_selectors` - Scope restriction for extraction
/// * `inspectors` - Compiled extraction rules
pub async fn process_page(
    client: &Client,
    url: &Url,
    policy: FetchPolicy,
    before_actions: &[PageAction],
    scope_selectors: &[String],
    inspectors: &[RunInspector],
) -> PageOutcome {
    let outcome = fetch_page(client, url.as_str(), policy).await;

    match outcome {
        FetchOutcome::Success {
            status_code,
            content_type,
            body,
            load_time_ms,
        } => {
            if !content_type.is_empty() && !content_type.contains("text/html") {
                return PageOutcome::Skipped {
                    reason: format!("Expected HTML, got {}", content_type),
                    status_code,
                };
            }

            run_before_actions(before_actions).await;

            let page_bytes = body.len() as u64;
            let extracted = extract_page(&body, url, scope_selectors, inspectors);

            PageOutcome::Fetched {
                extracted,
                status_code,
                load_time_ms,
                page_bytes,
            }
        }
        FetchOutcome::HttpError { status_code } => PageOutcome::Failed {
            error: format!("HTTP {}", status_code),
            status_code,
        },
        FetchOutcome::NetworkError { error } => PageOutcome::Failed {
            error,
            status_code: 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserAgentConfig;
    use crate::crawler::fetcher::build_http_client;
    use crate::storage::test_fixtures::sample_inspector;
    use crate::storage::ValueKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        build_http_client(&UserAgentConfig {
            crawler_name: "CrawldexBot".to_string(),
            crawler_version: "0.3".to_string(),
            contact_url: "https://example.com/bot".to_string(),
            contact_email: "bot@example.com".to_string(),
        })
        .unwrap()
    }

    fn policy() -> FetchPolicy {
        FetchPolicy {
            timeout_ms: 2_000,
            retry: 1,
            sleep_ms: 5,
        }
    }

    fn title_inspector() -> RunInspector {
        let mut record = sample_inspector();
        record.id = 1;
        record.selector = "h1".to_string();
        record.kind = ValueKind::Text;
        RunInspector::compile(record).unwrap()
    }

    #[tokio::test]
    async fn test_fetched_page_extracts_values_and_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/item"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(
                        r#"<html><body><h1>Lamp</h1><a href="/other">other</a></body></html>"#,
                        "text/html",
                    ),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/item", server.uri())).unwrap();
        let outcome = process_page(&client(), &url, policy(), &[], &[], &[title_inspector()]).await;

        match outcome {
            PageOutcome::Fetched {
                extracted,
                status_code,
                page_bytes,
                ..
            } => {
                assert_eq!(status_code, 200);
                assert!(page_bytes > 0);
                assert_eq!(extracted.documents.len(), 1);
                assert_eq!(extracted.documents[0][0].value, "Lamp");
                assert_eq!(extracted.links.len(), 1);
            }
            other => panic!("Expected Fetched, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_html_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("%PDF-1.4")
                    .insert_header("content-type", "application/pdf"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/file.pdf", server.uri())).unwrap();
        let outcome = process_page(&client(), &url, policy(), &[], &[], &[]).await;

        assert!(matches!(outcome, PageOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_http_error_is_failed_with_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let outcome = process_page(&client(), &url, policy(), &[], &[], &[]).await;

        match outcome {
            PageOutcome::Failed { status_code, .. } => assert_eq!(status_code, 404),
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_network_error_is_failed_with_zero_code() {
        let url = Url::parse("http://127.0.0.1:1/never").unwrap();
        let outcome = process_page(
            &client(),
            &url,
            FetchPolicy {
                timeout_ms: 300,
                retry: 0,
                sleep_ms: 1,
            },
            &[],
            &[],
            &[],
        )
        .await;

        match outcome {
            PageOutcome::Failed { status_code, .. } => assert_eq!(status_code, 0),
            other => panic!("Expected Failed, got {:?}", other),
        }
    }
}
