//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use tidepool::config::{
    Config, CrawlConfig, LimitsConfig, OutputConfig, PolitenessConfig, RetryConfig, TimeoutConfig,
    UserAgentConfig,
};
use tidepool::output::RunSummary;
use tidepool::storage::{sha256_hex, ManifestEntry};
use tidepool::CrawlEngine;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration scoped to the mock server's host
fn test_config(server: &MockServer, output_root: &Path) -> Config {
    let host = url::Url::parse(&server.uri())
        .expect("mock server URI should parse")
        .host_str()
        .expect("mock server URI should carry a host")
        .to_string();

    Config {
        crawl: CrawlConfig {
            seeds: vec![format!("{}/", server.uri())],
            allowed_domains: vec![host],
            exclude_patterns: vec![],
            page_types: vec![],
            download_file_types: vec!["png".to_string(), "pdf".to_string()],
            max_depth: 3,
            max_pages_per_domain: 100,
            max_file_size_mb: 1,
        },
        politeness: PolitenessConfig {
            min_delay_ms: 0,
            max_delay_ms: 0,
            progressive: false,
        },
        retry: RetryConfig {
            max_retries: 3,
            retry_delay_secs: 0,
        },
        limits: LimitsConfig {
            global_concurrency: 8,
            per_domain_concurrency: 4,
        },
        timeouts: TimeoutConfig {
            connect_secs: 5,
            request_secs: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
            rotate: false,
        },
        output: OutputConfig {
            root_dir: output_root.to_string_lossy().into_owned(),
            summary_path: output_root.join("summary.md").to_string_lossy().into_owned(),
        },
    }
}

async fn run_crawl(config: Config) -> RunSummary {
    let engine = CrawlEngine::new(config).expect("engine should build");
    engine.run().await.expect("crawl should complete")
}

/// Mounts a 200 text/html response for `route`
async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

/// Reads the manifest written for the mock server's domain (127.0.0.1)
fn read_manifest(output_root: &Path) -> BTreeMap<String, ManifestEntry> {
    let path = output_root.join("manifests/127.0.0.1.json");
    let json = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("manifest at {} should exist: {}", path.display(), e));
    serde_json::from_str(&json).expect("manifest should be valid JSON")
}

#[tokio::test]
async fn test_scope_and_quota_end_to_end() {
    let server = MockServer::start().await;
    let base = server.uri();

    // Page A links to in-scope B and out-of-scope C; B links to in-scope D.
    mount_page(
        &server,
        "/",
        format!(
            r#"<html><head><title>A</title></head><body>
            <a href="{}/b">B</a>
            <a href="https://external.example.org/c">C</a>
            </body></html>"#,
            base
        ),
    )
    .await;
    mount_page(
        &server,
        "/b",
        format!(
            r#"<html><head><title>B</title></head><body><a href="{}/d">D</a></body></html>"#,
            base
        ),
    )
    .await;
    // D must never be fetched: B's completion fills the quota before D's
    // admission is decided.
    Mock::given(method("GET"))
        .and(path("/d"))
        .respond_with(ResponseTemplate::new(200).set_body_string("never served"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&server, dir.path());
    config.crawl.max_pages_per_domain = 2;

    let summary = run_crawl(config).await;

    assert_eq!(summary.pages_stored, 2, "A and B stored");
    assert!(summary.rejections.get("out-of-scope").copied().unwrap_or(0) >= 1);
    assert!(summary.rejections.get("quota").copied().unwrap_or(0) >= 1);
    // The quota rejection of D lands on the crawled domain's own row.
    assert!(summary.domains["127.0.0.1"].rejected >= 1);
    assert!(summary.failures.is_empty());

    let manifest = read_manifest(dir.path());
    assert_eq!(manifest.len(), 2);
    assert!(manifest.contains_key(&format!("{}/", base)));
    assert!(manifest.contains_key(&format!("{}/b", base)));
}

#[tokio::test]
async fn test_duplicate_content_stored_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(
            r#"<html><body><a href="{}/copy1">1</a><a href="{}/copy2">2</a></body></html>"#,
            base, base
        ),
    )
    .await;
    let identical = "<html><body>same bytes</body></html>".to_string();
    mount_page(&server, "/copy1", identical.clone()).await;
    mount_page(&server, "/copy2", identical).await;

    let dir = tempfile::tempdir().unwrap();
    let summary = run_crawl(test_config(&server, dir.path())).await;

    // The seed plus exactly one of the identical twins.
    assert_eq!(summary.pages_stored, 2);
    assert_eq!(summary.duplicates, 1);

    let manifest = read_manifest(dir.path());
    assert_eq!(manifest.len(), 2);
    let copies_recorded = manifest
        .keys()
        .filter(|url| url.ends_with("/copy1") || url.ends_with("/copy2"))
        .count();
    assert_eq!(copies_recorded, 1);
}

#[tokio::test]
async fn test_transient_failures_retry_until_abandoned() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(r#"<html><body><a href="{}/flaky">flaky</a></body></html>"#, base),
    )
    .await;
    // 1 initial attempt + 3 retries, never a 5th dispatch.
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let summary = run_crawl(test_config(&server, dir.path())).await;

    assert_eq!(summary.pages_stored, 1);
    assert_eq!(summary.retries, 3);
    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].url.ends_with("/flaky"));
    assert_eq!(summary.failures[0].reason, "HTTP 503");
}

#[tokio::test]
async fn test_terminal_status_fails_without_retry() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(r#"<html><body><a href="{}/gone">gone</a></body></html>"#, base),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let summary = run_crawl(test_config(&server, dir.path())).await;

    assert_eq!(summary.retries, 0);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].reason, "HTTP 404");
}

#[tokio::test]
async fn test_manifest_hashes_match_stored_bytes() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(
            r#"<html><head><title>Home</title></head><body><a href="{}/about">about</a></body></html>"#,
            base
        ),
    )
    .await;
    mount_page(
        &server,
        "/about",
        "<html><head><title>About</title></head><body>About us</body></html>".to_string(),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let summary = run_crawl(test_config(&server, dir.path())).await;
    assert_eq!(summary.pages_stored, 2);

    let manifest = read_manifest(dir.path());
    assert_eq!(manifest.len(), 2);
    for (url, entry) in &manifest {
        let stored = std::fs::read(dir.path().join(&entry.file_path))
            .unwrap_or_else(|e| panic!("artifact for {} should exist: {}", url, e));
        assert_eq!(entry.hash, sha256_hex(&stored), "hash mismatch for {}", url);
        assert_eq!(entry.size, stored.len() as u64);
    }

    let home = &manifest[&format!("{}/", base)];
    assert_eq!(home.title, "Home");
    assert_eq!(home.depth, 0);
    assert_eq!(home.content_type, "text/html");
}

#[tokio::test]
async fn test_assets_stored_and_recorded() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(r#"<html><body><img src="{}/logo.png" /></body></html>"#, base),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0x89u8, 0x50, 0x4e, 0x47])
                .insert_header("content-type", "image/png"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let summary = run_crawl(test_config(&server, dir.path())).await;

    // The asset is stored but only the page counts toward the quota.
    assert_eq!(summary.pages_stored, 1);
    assert_eq!(summary.assets_stored, 1);

    let manifest = read_manifest(dir.path());
    assert!(manifest.contains_key(&format!("{}/logo.png", base)));
    assert!(dir.path().join("127.0.0.1/logo.png").exists());
}

#[tokio::test]
async fn test_oversize_body_dropped() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(r#"<html><body><a href="{}/huge">huge</a></body></html>"#, base),
    )
    .await;
    // 2 MiB body against a 1 MiB cap.
    Mock::given(method("GET"))
        .and(path("/huge"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![b'x'; 2 * 1024 * 1024])
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let summary = run_crawl(test_config(&server, dir.path())).await;

    assert_eq!(summary.pages_stored, 1);
    assert_eq!(summary.oversize, 1);
    assert!(summary.failures.is_empty(), "oversize is a drop, not a failure");

    let manifest = read_manifest(dir.path());
    assert!(!manifest.keys().any(|url| url.ends_with("/huge")));
}

#[tokio::test]
async fn test_excluded_pattern_never_fetched() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(
            r#"<html><body><a href="{}/private/secret">s</a><a href="{}/open">o</a></body></html>"#,
            base, base
        ),
    )
    .await;
    mount_page(&server, "/open", "<html><body>open</body></html>".to_string()).await;
    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("never served"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&server, dir.path());
    config.crawl.exclude_patterns = vec!["/private/".to_string()];

    let summary = run_crawl(config).await;

    assert_eq!(summary.pages_stored, 2);
    assert!(summary.rejections.get("excluded").copied().unwrap_or(0) >= 1);
}

#[tokio::test]
async fn test_same_domain_dispatches_respect_min_delay() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(
            r#"<html><body><a href="{}/p1">1</a><a href="{}/p2">2</a></body></html>"#,
            base, base
        ),
    )
    .await;
    mount_page(&server, "/p1", "<html><body>one</body></html>".to_string()).await;
    mount_page(&server, "/p2", "<html><body>two</body></html>".to_string()).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&server, dir.path());
    config.politeness.min_delay_ms = 150;
    config.politeness.max_delay_ms = 150;

    let summary = run_crawl(config).await;

    assert_eq!(summary.pages_stored, 3);
    // Three dispatches to one domain: at least two 150 ms gaps.
    assert!(
        summary.duration >= Duration::from_millis(300),
        "run took {:?}, expected at least 300ms of spacing",
        summary.duration
    );
}

#[tokio::test]
async fn test_depth_ceiling_stops_traversal() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(r#"<html><body><a href="{}/level1">down</a></body></html>"#, base),
    )
    .await;
    mount_page(
        &server,
        "/level1",
        format!(r#"<html><body><a href="{}/level2">down</a></body></html>"#, base),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/level2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("too deep"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&server, dir.path());
    config.crawl.max_depth = 1;

    let summary = run_crawl(config).await;

    assert_eq!(summary.pages_stored, 2);
    assert!(summary.rejections.get("depth").copied().unwrap_or(0) >= 1);
}

#[tokio::test]
async fn test_links_visited_once_across_pages() {
    let server = MockServer::start().await;
    let base = server.uri();

    // Both the seed and /a link to /shared; it must be fetched exactly once.
    mount_page(
        &server,
        "/",
        format!(
            r#"<html><body><a href="{}/a">a</a><a href="{}/shared">s</a></body></html>"#,
            base, base
        ),
    )
    .await;
    mount_page(
        &server,
        "/a",
        format!(r#"<html><body><a href="{}/shared">s</a></body></html>"#, base),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/shared"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html><body>shared</body></html>", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let summary = run_crawl(test_config(&server, dir.path())).await;

    assert_eq!(summary.pages_stored, 3);
    assert!(summary.rejections.get("visited").copied().unwrap_or(0) >= 1);
}
