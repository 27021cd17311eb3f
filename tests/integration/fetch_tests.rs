//! Integration tests for the fetcher
//!
//! These tests use wiremock to stand up mock HTTP servers and exercise the
//! real reqwest transport together with the robots cache.

use job_sieve::config::{parse_config, Config};
use job_sieve::crawler::{format_user_agent, FetchFailure, FetchRequest, Fetcher};
use job_sieve::SieveError;
use std::collections::BTreeMap;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with fast retries
fn create_test_config(crawler_extra: &str) -> Config {
    parse_config(&format!(
        r#"
[crawler]
retries = 2
backoff-ms = 1
timeout-secs = 5
robots-timeout-secs = 2
{}

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
database-path = "./unused.db"
"#,
        crawler_extra
    ))
    .expect("test config should parse")
}

fn html_page(title: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(
            format!(
                "<html><head><title>{}</title></head><body>{}</body></html>",
                title, title
            ),
            "text/html; charset=utf-8",
        )
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_many_pages_single_robots_fetch() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;

    for i in 0..6 {
        Mock::given(method("GET"))
            .and(path(format!("/jobs/{}", i)))
            .respond_with(html_page(&format!("Job {}", i)))
            .mount(&server)
            .await;
    }

    let fetcher = Fetcher::from_config(&create_test_config("concurrency = 3")).unwrap();
    let urls: Vec<String> = (0..6).map(|i| format!("{}/jobs/{}", server.uri(), i)).collect();

    let outcomes = fetcher.fetch_all(urls.clone()).await;

    assert_eq!(outcomes.len(), 6);
    for (outcome, url) in outcomes.iter().zip(&urls) {
        assert_eq!(&outcome.url, url);
        let page = outcome.result.as_ref().expect("page should be fetched");
        assert_eq!(page.status, 200);
        assert!(page.is_html());
    }
}

#[tokio::test]
async fn test_missing_robots_allows_everything() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(html_page("Private"))
        .mount(&server)
        .await;

    let fetcher = Fetcher::from_config(&create_test_config("")).unwrap();
    let result = fetcher
        .fetch_one(&FetchRequest::new(format!("{}/private/page", server.uri())))
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_robots_enforce_blocks_without_fetching() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private").await;
    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(html_page("Private"))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = Fetcher::from_config(&create_test_config("")).unwrap();
    let result = fetcher
        .fetch_one(&FetchRequest::new(format!("{}/private/page", server.uri())))
        .await;

    assert!(matches!(result, Err(SieveError::RobotsDisallowed { .. })));
}

#[tokio::test]
async fn test_robots_advise_fetches_anyway() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private").await;
    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(html_page("Private"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::from_config(&create_test_config(r#"robots-mode = "advise""#)).unwrap();
    let result = fetcher
        .fetch_one(&FetchRequest::new(format!("{}/private/page", server.uri())))
        .await;

    assert_eq!(result.unwrap().status, 200);
}

#[tokio::test]
async fn test_transient_failure_retried() {
    let server = MockServer::start().await;
    mount_robots(&server, "").await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(html_page("Recovered"))
        .mount(&server)
        .await;

    let fetcher = Fetcher::from_config(&create_test_config("")).unwrap();
    let page = fetcher
        .fetch_one(&FetchRequest::new(format!("{}/flaky", server.uri())))
        .await
        .unwrap();

    assert!(page.body.contains("Recovered"));
}

#[tokio::test]
async fn test_retries_exhausted() {
    let server = MockServer::start().await;
    mount_robots(&server, "").await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = Fetcher::from_config(&create_test_config("")).unwrap();
    let err = fetcher
        .fetch_one(&FetchRequest::new(format!("{}/down", server.uri())))
        .await
        .unwrap_err();

    match err {
        SieveError::Fetch {
            attempts, failure, ..
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(failure, FetchFailure::Status(500));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_conditional_request_not_modified() {
    let server = MockServer::start().await;
    mount_robots(&server, "").await;
    Mock::given(method("GET"))
        .and(path("/jobs/1"))
        .and(header("if-none-match", "\"v1\""))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;

    let fetcher = Fetcher::from_config(&create_test_config("")).unwrap();
    let mut headers = BTreeMap::new();
    headers.insert("If-None-Match".to_string(), "\"v1\"".to_string());
    let request = FetchRequest::new(format!("{}/jobs/1", server.uri())).with_headers(headers);

    let page = fetcher.fetch_one(&request).await.unwrap();

    assert!(page.not_modified());
    assert!(page.body.is_empty());
}

#[tokio::test]
async fn test_identifying_user_agent_sent() {
    let server = MockServer::start().await;
    let config = create_test_config("");
    let user_agent = format_user_agent(&config.user_agent);

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .and(header("user-agent", user_agent.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/1"))
        .and(header("user-agent", user_agent.as_str()))
        .respond_with(html_page("Job"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::from_config(&config).unwrap();
    let result = fetcher
        .fetch_one(&FetchRequest::new(format!("{}/jobs/1", server.uri())))
        .await;

    assert!(result.is_ok());
}
