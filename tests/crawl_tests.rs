//! Integration tests for the crawl engine
//!
//! These tests use wiremock to stand in for the crawled site and drive full
//! runs through the application context, asserting on the terminal status,
//! the collected documents and the run statistics.

mod common;

use common::*;
use crawldex::state::RunnerStatus;
use crawldex::storage::Storage;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(body.to_string(), "text/html")
}

fn product(title: &str) -> String {
    format!(r#"<div class="product"><h2 class="title">{}</h2></div>"#, title)
}

#[tokio::test]
async fn test_full_crawl_collects_documents() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(
            r#"<html><body>{}<a href="/p1">p1</a><a href="/p2">p2</a></body></html>"#,
            product("Ceramic Lamp")
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/p1"))
        .respond_with(html(&format!(
            "<html><body>{}</body></html>",
            product("Woolen Rug")
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/p2"))
        .respond_with(html(&format!(
            "<html><body>{}</body></html>",
            product("Oak Table")
        )))
        .mount(&server)
        .await;

    let context = test_context(".");
    {
        let mut storage = context.storage.lock().unwrap();
        storage
            .insert_inspector(&inspector_for(".product .title", "title", 1))
            .unwrap();
    }
    let (_, runner_id) = seed_crawler_and_runner(&context, &crawler_for(&server.uri(), 1));

    context.start_runner(runner_id).unwrap();
    let runner = wait_for_terminal(&context, runner_id).await;

    assert_status(&runner, RunnerStatus::Completed);
    assert_eq!(runner.collected_documents, 3);
    assert_eq!(runner.statistics.visited_pages, 3);
    assert_eq!(runner.statistics.http_codes.get("200"), Some(&3));

    let values = context
        .storage
        .lock()
        .unwrap()
        .list_values_by_inspectors(&[1])
        .unwrap();
    let titles: Vec<&str> = values.iter().map(|v| v.value.as_str()).collect();
    assert!(titles.contains(&"Ceramic Lamp"));
    assert!(titles.contains(&"Woolen Rug"));
    assert!(titles.contains(&"Oak Table"));
}

#[tokio::test]
async fn test_no_url_fetched_twice() {
    let server = MockServer::start().await;

    // Pages link to each other in a cycle; each must be fetched exactly once
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<html><body><a href="/a">a</a><a href="/b">b</a></body></html>"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(r#"<html><body><a href="/">home</a><a href="/b">b</a></body></html>"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html(r#"<html><body><a href="/a">a</a><a href="/a#frag">a again</a></body></html>"#))
        .expect(1)
        .mount(&server)
        .await;

    let context = test_context(".");
    let (_, runner_id) = seed_crawler_and_runner(&context, &crawler_for(&server.uri(), 1));

    context.start_runner(runner_id).unwrap();
    let runner = wait_for_terminal(&context, runner_id).await;

    assert_status(&runner, RunnerStatus::Completed);
    assert_eq!(runner.statistics.visited_pages, 3);
    // Mock expectations verify the once-per-URL invariant on drop
}

#[tokio::test]
async fn test_max_pages_limits_dispatch() {
    let server = MockServer::start().await;

    let links: String = (0..20)
        .map(|i| format!(r#"<a href="/p{}">p{}</a>"#, i, i))
        .collect();
    Mock::given(method("GET"))
        .respond_with(html(&format!("<html><body>{}</body></html>", links)))
        .mount(&server)
        .await;

    let context = test_context(".");
    let mut crawler = crawler_for(&server.uri(), 1);
    crawler.max_pages = 5;
    let (_, runner_id) = seed_crawler_and_runner(&context, &crawler);

    context.start_runner(runner_id).unwrap();
    let runner = wait_for_terminal(&context, runner_id).await;

    assert_status(&runner, RunnerStatus::Completed);
    assert!(
        runner.statistics.visited_pages <= 5,
        "visited {} pages with max_pages 5",
        runner.statistics.visited_pages
    );
}

#[tokio::test]
async fn test_max_depth_limits_traversal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<html><body><a href="/level1">deeper</a></body></html>"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/level1"))
        .respond_with(html(r#"<html><body><a href="/level2">deeper</a></body></html>"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/level2"))
        .respond_with(html("<html><body>bottom</body></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let context = test_context(".");
    let mut crawler = crawler_for(&server.uri(), 1);
    crawler.max_depth = 1;
    let (_, runner_id) = seed_crawler_and_runner(&context, &crawler);

    context.start_runner(runner_id).unwrap();
    let runner = wait_for_terminal(&context, runner_id).await;

    assert_status(&runner, RunnerStatus::Completed);
    assert_eq!(runner.statistics.visited_pages, 2);
}

#[tokio::test]
async fn test_robots_rules_respected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><a href="/admin/users">admin</a><a href="/public">ok</a></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(html("<html><body>public</body></html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/users"))
        .respond_with(html("<html><body>secret</body></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let context = test_context(".");
    let mut crawler = crawler_for(&server.uri(), 1);
    crawler.robot_file_url = Some(format!("{}/robots.txt", server.uri()));
    let (_, runner_id) = seed_crawler_and_runner(&context, &crawler);

    context.start_runner(runner_id).unwrap();
    let runner = wait_for_terminal(&context, runner_id).await;

    assert_status(&runner, RunnerStatus::Completed);
    assert_eq!(runner.statistics.visited_pages, 2);
}

#[tokio::test]
async fn test_unreachable_robots_file_exits_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let context = test_context(".");
    let mut crawler = crawler_for(&server.uri(), 1);
    crawler.robot_file_url = Some(format!("{}/robots.txt", server.uri()));
    let (_, runner_id) = seed_crawler_and_runner(&context, &crawler);

    // Setup failure surfaces from start_runner's spawned task; the row
    // carries the terminal status either way
    let _ = context.start_runner(runner_id);
    let runner = wait_for_terminal(&context, runner_id).await;

    assert_status(&runner, RunnerStatus::Exit);
    assert!(runner.error_message.is_some());
}

#[tokio::test]
async fn test_excluded_urls_never_entered() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><a href="/cart/checkout">cart</a><a href="/catalog">catalog</a></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/catalog"))
        .respond_with(html("<html><body>catalog</body></html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cart/checkout"))
        .respond_with(html("<html><body>cart</body></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let context = test_context(".");
    let mut crawler = crawler_for(&server.uri(), 1);
    crawler.excluded_urls = vec!["/cart".to_string()];
    let (_, runner_id) = seed_crawler_and_runner(&context, &crawler);

    context.start_runner(runner_id).unwrap();
    let runner = wait_for_terminal(&context, runner_id).await;

    assert_status(&runner, RunnerStatus::Completed);
    assert_eq!(runner.statistics.visited_pages, 2);
}

#[tokio::test]
async fn test_failed_pages_recorded_not_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><a href="/gone">gone</a><a href="/ok">ok</a></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(html("<html><body>fine</body></html>"))
        .mount(&server)
        .await;

    let context = test_context(".");
    let (_, runner_id) = seed_crawler_and_runner(&context, &crawler_for(&server.uri(), 1));

    context.start_runner(runner_id).unwrap();
    let runner = wait_for_terminal(&context, runner_id).await;

    assert_status(&runner, RunnerStatus::Completed);
    assert_eq!(runner.statistics.http_codes.get("404"), Some(&1));
    assert_eq!(runner.statistics.http_codes.get("200"), Some(&2));
}

#[tokio::test]
async fn test_unreachable_seed_exits_run() {
    let context = test_context(".");
    // Nothing listens on port 1
    let mut crawler = crawler_for("http://127.0.0.1:1", 1);
    crawler.retry = 0;
    crawler.timeout_ms = 300;
    let (_, runner_id) = seed_crawler_and_runner(&context, &crawler);

    context.start_runner(runner_id).unwrap();
    let runner = wait_for_terminal(&context, runner_id).await;

    assert_status(&runner, RunnerStatus::Exit);
    let message = runner.error_message.unwrap_or_default();
    assert!(message.contains("seed unreachable"), "message: {}", message);
}

#[tokio::test]
async fn test_stop_transitions_to_exit() {
    let server = MockServer::start().await;

    let links: String = (0..30)
        .map(|i| format!(r#"<a href="/slow{}">s{}</a>"#, i, i))
        .collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!("<html><body>{}</body></html>", links)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(
            html("<html><body>slow</body></html>")
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .mount(&server)
        .await;

    let context = test_context(".");
    let mut crawler = crawler_for(&server.uri(), 1);
    crawler.threads = 1;
    let (_, runner_id) = seed_crawler_and_runner(&context, &crawler);

    context.start_runner(runner_id).unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    context.stop_runner(runner_id).unwrap();

    let runner = wait_for_terminal(&context, runner_id).await;
    assert_status(&runner, RunnerStatus::Exit);
    assert_eq!(runner.error_message.as_deref(), Some("stopped by user"));
    // Far fewer pages than the site offers: the stop was observed mid-run
    assert!(runner.statistics.visited_pages < 30);
}

#[tokio::test]
async fn test_invalid_config_exits_before_fetching() {
    let context = test_context(".");
    let mut crawler = crawler_for("https://example.com", 1);
    crawler.excluded_urls = vec!["(unclosed".to_string()];
    let (_, runner_id) = seed_crawler_and_runner(&context, &crawler);

    let _ = context.start_runner(runner_id);
    let runner = wait_for_terminal(&context, runner_id).await;

    assert_status(&runner, RunnerStatus::Exit);
    assert!(runner.error_message.is_some());
}
