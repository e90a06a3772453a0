//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end against an on-disk database.

use ladang_crawler::config::{
    Config, CrawlConfig, CrawlProfile, CrawlStrategy, CrawlerConfig, OutputConfig,
    UserAgentConfig,
};
use ladang_crawler::crawler::{Coordinator, StopReason};
use ladang_crawler::service;
use ladang_crawler::storage::{open_storage, parse_time_span, SharedStorage};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a test configuration crawling the mock server
fn create_test_config(seeds: Vec<String>, db_path: &str, duration_secs: u64) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers: 2,
            duration_secs,
            idle_timeout_secs: 1,
            request_timeout_secs: 5,
            wait_for_in_flight: false,
            strategy: CrawlStrategy::Bfs,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
        crawl: CrawlConfig {
            seeds,
            keyword: "dairy".to_string(),
            // wiremock listens on 127.0.0.1, whose domain token is the address itself
            whitelist: vec!["127.0.0.1".to_string()],
        },
        profile: CrawlProfile {
            tag_container: Some("ul.td-tags".to_string()),
            ..CrawlProfile::default()
        },
    }
}

fn open_db(dir: &TempDir) -> (String, SharedStorage) {
    let db_path = dir.path().join("crawl.db");
    let storage = open_storage(&db_path).expect("Failed to open DB");
    (db_path.to_string_lossy().into_owned(), storage)
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Serves an endless chain of pages, each linking to the next one
struct ChainResponder {
    delay: Duration,
}

impl Respond for ChainResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let n: u64 = request
            .url
            .path()
            .trim_start_matches("/p")
            .parse()
            .unwrap_or(0);
        ResponseTemplate::new(200)
            .set_body_string(format!(
                r#"<html><head><title>Page {n}</title></head><body><p>dairy {n}</p><a href="/p{next}">next</a></body></html>"#,
                n = n,
                next = n + 1
            ))
            .set_delay(self.delay)
    }
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    // Start a mock server
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Seed page links to two local pages and one off-whitelist page
    mount_page(
        &mock_server,
        "/a",
        format!(
            r#"<html><head><title>Home</title></head><body>
<article><p>Dairy farming, milk prices</p></article>
<a href="/b/">B</a>
<a href="{}/c">C</a>
<a href="https://other.org/elsewhere">Elsewhere</a>
<ul class="td-tags"><li><a href="/tag/dairy">Dairy</a></li></ul>
</body></html>"#,
            base_url
        ),
    )
    .await;
    mount_page(
        &mock_server,
        "/b",
        r#"<html><head><title>B</title></head><body><p>Page B</p><a href="/a">home</a></body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &mock_server,
        "/c",
        r#"<html><head><title>C</title></head><body><p>Page C</p></body></html>"#.to_string(),
    )
    .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let (db_path, storage) = open_db(&dir);
    let seed = format!("{}/a", base_url);
    let config = create_test_config(vec![seed.clone()], &db_path, 30);

    // Run the crawl
    let mut coordinator =
        Coordinator::new(config, storage.clone()).expect("Failed to create coordinator");
    let report = coordinator.run().await.expect("Crawl failed");

    assert_eq!(report.stop_reason, StopReason::FrontierExhausted);
    assert_eq!(report.pages_persisted, 3);

    // Seed page content, metadata and link graph
    let pages = service::list_pages(&storage, None, None).expect("Failed to list pages");
    let home = pages
        .iter()
        .find(|p| p.url == seed)
        .expect("Seed page not stored");
    assert_eq!(home.title, "Home");
    assert!(home.html5);
    assert_eq!(home.content_text, "Dairy farming,milk prices,");
    assert_eq!(home.description, "-");
    assert_eq!(home.model_crawl, "BFS crawling");

    let guard = storage.lock().expect("Storage lock poisoned");
    let links = guard.list_links(home.id).expect("Failed to list links");
    assert!(links.contains(&format!("{}/b", base_url)));
    assert!(links.contains(&format!("{}/c", base_url)));
    assert!(links.contains(&"https://other.org/elsewhere".to_string()));
    assert_eq!(guard.list_tags(home.id).expect("Failed to list tags"), vec!["dairy"]);

    // The crawl job carries the final totals
    let job = guard
        .get_crawl_job(report.crawl_id)
        .expect("Crawl job missing");
    assert_eq!(job.total_page, 3);
    assert_eq!(job.start_urls, seed);
    let duration = parse_time_span(&job.duration_crawl).expect("Bad duration");
    assert!(duration >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_off_whitelist_link_is_recorded_but_not_crawled() {
    let mock_server = MockServer::start().await;
    let port = mock_server.address().port();

    // Same server, but reached through a host whose token is not whitelisted
    let outside = format!("http://localhost:{}/secret", port);
    mount_page(
        &mock_server,
        "/",
        format!(
            r#"<html><head><title>Home</title></head><body><a href="{}">secret</a></body></html>"#,
            outside
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/secret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let (db_path, storage) = open_db(&dir);
    let config = create_test_config(vec![format!("{}/", mock_server.uri())], &db_path, 30);

    let report = Coordinator::new(config, storage.clone())
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.pages_persisted, 1);

    let pages = service::list_pages(&storage, None, None).expect("Failed to list pages");
    let guard = storage.lock().expect("Storage lock poisoned");
    let links = guard.list_links(pages[0].id).expect("Failed to list links");
    assert_eq!(links, vec![outside]);
}

#[tokio::test]
async fn test_time_budget_stops_endless_site() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ChainResponder {
            delay: Duration::from_millis(200),
        })
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let (db_path, storage) = open_db(&dir);
    let config = create_test_config(vec![format!("{}/p0", mock_server.uri())], &db_path, 2);

    let report = Coordinator::new(config, storage)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.stop_reason, StopReason::BudgetExpired);
    assert!(report.pages_persisted >= 1);
    // Budget plus at most one request timeout
    assert!(report.elapsed < Duration::from_secs(2 + 5));
}

#[tokio::test]
async fn test_recrawl_is_idempotent() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/a",
        r#"<html><head><title>A</title></head><body><a href="/b">b</a></body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &mock_server,
        "/b",
        r#"<html><head><title>B</title></head><body><a href="/a">a</a></body></html>"#
            .to_string(),
    )
    .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let seeds = vec![format!("{}/a", mock_server.uri())];

    let first = {
        let (db_path, storage) = open_db(&dir);
        let config = create_test_config(seeds.clone(), &db_path, 30);
        Coordinator::new(config, storage)
            .expect("Failed to create coordinator")
            .run()
            .await
            .expect("Crawl failed")
    };

    // A fresh process on the same database
    let (db_path, storage) = open_db(&dir);
    let config = create_test_config(seeds, &db_path, 30);
    let second = Coordinator::new(config, storage.clone())
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(first.pages_persisted, 2);
    assert_eq!(second.pages_persisted, 0);
    assert_ne!(first.crawl_id, second.crawl_id);
    assert_eq!(
        service::list_pages(&storage, None, None)
            .expect("Failed to list pages")
            .len(),
        2
    );
}

#[tokio::test]
async fn test_keyword_priority_strategy() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        r#"<html><head><title>Home</title></head><body>
<a href="/weather">weather</a><a href="/dairy-news">dairy</a></body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &mock_server,
        "/weather",
        r#"<html><head><title>Weather</title></head><body></body></html>"#.to_string(),
    )
    .await;
    mount_page(
        &mock_server,
        "/dairy-news",
        r#"<html><head><title>Dairy</title></head><body></body></html>"#.to_string(),
    )
    .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let (db_path, storage) = open_db(&dir);
    let mut config = create_test_config(vec![format!("{}/", mock_server.uri())], &db_path, 30);
    config.crawler.strategy = CrawlStrategy::Msb;

    let report = Coordinator::new(config, storage.clone())
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.pages_persisted, 3);
    let pages = service::list_pages(&storage, None, None).expect("Failed to list pages");
    assert!(pages.iter().all(|p| p.model_crawl == "MSB crawling"));
}

#[tokio::test]
async fn test_start_crawl_runs_in_background() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        r#"<html><head><title>Home</title></head><body>hello</body></html>"#.to_string(),
    )
    .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let (db_path, storage) = open_db(&dir);
    let config = create_test_config(vec!["http://unused.test/".to_string()], &db_path, 30);

    let handle = service::start_crawl(
        config,
        vec![format!("{}/", mock_server.uri())],
        "hello".to_string(),
        Duration::from_secs(10),
        storage.clone(),
    )
    .expect("Failed to start crawl");
    let crawl_id = handle.crawl_id();

    let report = handle.join().await.expect("Crawl failed");
    assert_eq!(report.crawl_id, crawl_id);
    assert_eq!(report.pages_persisted, 1);

    let guard = storage.lock().expect("Storage lock poisoned");
    let job = guard.get_crawl_job(crawl_id).expect("Crawl job missing");
    assert_eq!(job.keyword, "hello");
}

#[tokio::test]
async fn test_import_file_round_trip() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (_, storage) = open_db(&dir);

    let crawl_id = {
        let mut guard = storage.lock().expect("Storage lock poisoned");
        guard
            .insert_crawl_job(&["https://example.com".to_string()], "farm", 0, Duration::ZERO)
            .expect("Failed to create crawl job")
    };

    let import_path = dir.path().join("pages.json");
    std::fs::write(
        &import_path,
        format!(
            r#"[{{"page_information": {{"url": "https://example.com/a", "crawl_id": {id},
  "html5": true, "title": "A", "description": "-", "keywords": "-",
  "content_text": "a,", "size_bytes": 10, "model_crawl": "BFS crawling"}},
  "page_linking": [{{"outgoing_link": "https://example.com/b"}}]}}]"#,
            id = crawl_id
        ),
    )
    .expect("Failed to write import file");

    let bundles = service::load_import_file(Path::new(&import_path)).expect("Bad import file");
    assert_eq!(bundles.len(), 1);

    let page_id = service::add_page(&storage, &bundles[0])
        .expect("Import failed")
        .expect("Page should be new");
    assert!(service::add_page(&storage, &bundles[0])
        .expect("Import failed")
        .is_none());

    let pages = service::get_pages_by_ids(&storage, &[page_id]).expect("Lookup failed");
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].url, "https://example.com/a");
}
