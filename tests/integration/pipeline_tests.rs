//! Integration tests for the crawl pipeline
//!
//! A wiremock server plays the job site; the state store and artifacts live
//! in a temporary directory.

use async_trait::async_trait;
use job_sieve::capsule::Capsule;
use job_sieve::classify::{Classification, Classifier, ClassifierError, ClassifyMode, PageType};
use job_sieve::config::{parse_config, Config};
use job_sieve::crawler::Pipeline;
use job_sieve::output::{load_statistics, ArtifactMeta};
use job_sieve::storage::{inspect_state_store, SqliteStateStore, StateStore};
use job_sieve::{normalize, FetchStatus};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_config(dir: &Path) -> Config {
    parse_config(&format!(
        r#"
[crawler]
retries = 1
backoff-ms = 1
timeout-secs = 5
robots-timeout-secs = 2

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[capsule]
min-text-length = 100

[output]
database-path = {:?}
artifact-dir = {:?}
"#,
        dir.join("state.db").to_string_lossy(),
        dir.join("raw").to_string_lossy(),
    ))
    .expect("test config should parse")
}

/// Labels pages with "Hae" apply links as postings, everything else as listings
#[derive(Default)]
struct KeywordClassifier {
    calls: AtomicUsize,
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(
        &self,
        capsule: &Capsule,
        _mode: ClassifyMode,
    ) -> Result<Classification, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let page_type = if capsule.apply_links.is_empty() {
            PageType::Listing
        } else {
            PageType::JobPosting
        };
        Ok(Classification {
            page_type,
            confidence: 0.75,
            fields: serde_json::json!({}),
        })
    }
}

fn posting_body(title: &str) -> String {
    format!(
        r#"<html><head><title>{title}</title>
        <link rel="canonical" href="/jobs/canonical-{title}"></head>
        <body><h1>{title}</h1>
        <p>{filler}</p>
        <p>Hakuaika päättyy 2025-03-31.</p>
        <a href="/apply/{title}">Hae paikkaa</a>
        </body></html>"#,
        title = title,
        filler = "Etsimme kokenutta tekijää kasvavaan tiimiimme. ".repeat(5),
    )
}

fn listing_body() -> String {
    format!(
        r#"<html><head><title>Avoimet työpaikat</title></head><body>
        <p>{}</p>
        <a href="/jobs/a">Developer</a>
        <a href="/jobs/b">Designer</a>
        <a href="/news">Uutiset</a>
        </body></html>"#,
        "Tervetuloa urasivuillemme, katso avoimet tehtävät alta. ".repeat(4)
    )
}

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin"))
        .mount(server)
        .await;

    let pages = [
        ("/careers", listing_body()),
        ("/jobs/a", posting_body("a")),
        ("/thin", "<html><body><p>Coming soon</p></body></html>".to_string()),
    ];
    for (page_path, body) in pages {
        Mock::given(method("GET"))
            .and(path(page_path))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body, "text/html")
                    .insert_header("etag", format!("\"{}\"", page_path).as_str()),
            )
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_pipeline_run() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path());
    let store = Arc::new(SqliteStateStore::new(Path::new(&config.output.database_path)).unwrap());
    let classifier = Arc::new(KeywordClassifier::default());

    let pipeline = Pipeline::from_config(&config, store.clone())
        .unwrap()
        .with_classifier(classifier.clone(), ClassifyMode::Plain);

    let candidates = vec![
        format!("{}/careers?utm_campaign=spring", base),
        format!("{}/careers", base),
        format!("{}/jobs/a#apply", base),
        format!("{}/thin", base),
        format!("{}/admin/panel", base),
        format!("{}/gone", base),
        "not a url".to_string(),
    ];

    let report = pipeline.run(&candidates).await.unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.blocked, 1);
    assert_eq!(report.errors, 1);
    assert_eq!(report.invalid, 1);
    assert_eq!(report.classified, 2);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);

    // /jobs/a was itself a candidate, so only /jobs/b is new
    let links: Vec<&str> = report.job_links.iter().map(|l| l.url.as_str()).collect();
    assert_eq!(links, vec![format!("{}/jobs/b", base).as_str()]);

    let posting = store
        .get(&normalize(&format!("{}/jobs/a", base)).unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(posting.status, Some(FetchStatus::Fetched));
    assert_eq!(posting.classification_type, Some(PageType::JobPosting));
    assert_eq!(
        posting.canonical_url,
        Some(format!("{}/jobs/canonical-a", base))
    );
    assert_eq!(posting.etag.as_deref(), Some("\"/jobs/a\""));

    let listing = store
        .get(&normalize(&format!("{}/careers", base)).unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(listing.classification_type, Some(PageType::Listing));

    let gone = store
        .get(&normalize(&format!("{}/gone", base)).unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(gone.status, Some(FetchStatus::Error));
    assert_eq!(gone.http_status, Some(410));

    let stats = load_statistics(store.as_ref()).unwrap();
    assert_eq!(stats.total_urls, 5);
    assert_eq!(stats.status_count(FetchStatus::Blocked), 1);
}

#[tokio::test]
async fn test_artifacts_written_for_html_pages() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path());
    let store = Arc::new(SqliteStateStore::new(Path::new(&config.output.database_path)).unwrap());

    Pipeline::from_config(&config, store)
        .unwrap()
        .run([format!("{}/jobs/a", base)])
        .await
        .unwrap();

    let raw = tmp.path().join("raw");
    let html = raw.join("127-0-0-1_00001.html");
    let meta = raw.join("127-0-0-1_00001_meta.json");
    assert!(std::fs::read_to_string(&html).unwrap().contains("Hae paikkaa"));

    let meta: ArtifactMeta = serde_json::from_str(&std::fs::read_to_string(meta).unwrap()).unwrap();
    assert_eq!(meta.url, format!("{}/jobs/a", base));
    assert_eq!(meta.source, "127-0-0-1");
}

#[tokio::test]
async fn test_second_run_skips_fresh_urls() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path());
    let candidates = vec![format!("{}/careers", base), format!("{}/gone", base)];

    let store = Arc::new(SqliteStateStore::new(Path::new(&config.output.database_path)).unwrap());
    let first = Pipeline::from_config(&config, store)
        .unwrap()
        .run(&candidates)
        .await
        .unwrap();
    assert_eq!(first.fetched, 1);
    assert_eq!(first.errors, 1);

    // Reopen to read the persisted state
    let store = Arc::new(SqliteStateStore::new(Path::new(&config.output.database_path)).unwrap());
    let second = Pipeline::from_config(&config, store)
        .unwrap()
        .run(&candidates)
        .await
        .unwrap();

    // The fetched page is fresh; the failed one stays eligible
    assert_eq!(second.skipped, 1);
    assert_eq!(second.errors, 1);
    assert_eq!(second.fetched, 0);
}

#[tokio::test]
async fn test_planning_leaves_filesystem_untouched() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path());
    let db = Path::new(&config.output.database_path);
    let candidates = vec![format!("{}/careers", base), format!("{}/jobs/a", base)];

    let store = Arc::new(inspect_state_store(db).unwrap());
    let plan = Pipeline::for_planning(&config, store)
        .unwrap()
        .plan(&candidates)
        .unwrap();
    assert_eq!(plan.due.len(), 2);
    assert!(!db.exists());
    assert!(!tmp.path().join("raw").exists());

    let store = Arc::new(SqliteStateStore::new(db).unwrap());
    Pipeline::from_config(&config, store)
        .unwrap()
        .run([format!("{}/careers", base)])
        .await
        .unwrap();

    // Existing state is read but the artifact count stays the same
    let artifacts = std::fs::read_dir(tmp.path().join("raw")).unwrap().count();
    let store = Arc::new(inspect_state_store(db).unwrap());
    let plan = Pipeline::for_planning(&config, store)
        .unwrap()
        .plan(&candidates)
        .unwrap();
    assert_eq!(plan.due.len(), 1);
    assert_eq!(plan.skipped, 1);
    assert_eq!(std::fs::read_dir(tmp.path().join("raw")).unwrap().count(), artifacts);
}
