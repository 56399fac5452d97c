//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use std::time::{Duration, Instant};
use surface_ripple::config::Config;
use surface_ripple::crawler::Coordinator;
use surface_ripple::{ArtifactCategory, CrawlReport};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast test configuration
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.crawler.concurrency = 4;
    config.crawler.request_timeout_ms = 2000;
    config.user_agent.crawler_name = "TestBot".to_string();
    config
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html")
        .set_body_string(body.into())
}

/// Bootstraps against the mock server and crawls it
async fn crawl(server: &MockServer, config: Config) -> CrawlReport {
    let coordinator = Coordinator::new(config).expect("valid config");
    let target = coordinator
        .bootstrap(&server.uri(), "http")
        .await
        .expect("bootstrap");
    coordinator.run(target).await.expect("crawl")
}

#[tokio::test]
async fn test_tracking_parameters_deduplicated() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
            <a href="/about">About</a>
            <a href="/about?utm_source=x">About (tracked)</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html("<html><body>About us</body></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let report = crawl(&server, create_test_config()).await;

    let about: Vec<&str> = report
        .values(ArtifactCategory::Pages)
        .into_iter()
        .filter(|v| v.ends_with("/about") || v.contains("/about?"))
        .collect();
    assert_eq!(about, vec![format!("{}/about", server.uri())]);
    assert_eq!(report.count(ArtifactCategory::Parameters), 0);
    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn test_robots_disallowed_never_fetched() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
            <a href="/private/data">Secret</a>
            <a href="/public">Public</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/private/data"))
        .respond_with(html("secret"))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(html("public"))
        .expect(1)
        .mount(&server)
        .await;

    let report = crawl(&server, create_test_config()).await;

    assert!(!report.contains_anywhere(&format!("{}/private/data", server.uri())));
    assert!(report.contains_anywhere(&format!("{}/public", server.uri())));
    assert!(report.disallowed >= 1);
}

#[tokio::test]
async fn test_inline_fetch_recorded_as_api_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
            <script>
              async function load() {
                const res = await fetch("/api/v1/users");
                return res.json();
              }
            </script>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    let report = crawl(&server, create_test_config()).await;

    assert!(report
        .values(ArtifactCategory::ApiEndpoints)
        .contains(&format!("{}/api/v1/users", server.uri()).as_str()));
    assert_eq!(report.count(ArtifactCategory::Parameters), 0);
}

#[tokio::test]
async fn test_max_urls_limits_fetches() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
            <a href="/p1">1</a><a href="/p2">2</a><a href="/p3">3</a>
            <a href="/p4">4</a><a href="/p5">5</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    for page in ["/p1", "/p2", "/p3", "/p4", "/p5"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html("page"))
            .expect(0)
            .mount(&server)
            .await;
    }

    let mut config = create_test_config();
    config.crawler.max_urls = 1;
    let report = crawl(&server, config).await;

    assert_eq!(report.processed, 1);
    assert_eq!(report.enqueued, 1);
    assert_eq!(report.failed, 0);
    // Rejected URLs are still discovered
    assert!(report.contains_anywhere(&format!("{}/p3", server.uri())));
}

#[tokio::test]
async fn test_sitemap_urls_fetched() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "User-agent: *\nAllow: /\nSitemap: {}/sitemap-pages.xml\n",
            base
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemap-pages.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/xml")
                .set_body_string(format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{base}/hidden-one</loc></url>
  <url><loc>{base}/hidden-two</loc></url>
  <url><loc>{base}/hidden-three</loc></url>
</urlset>"#
                )),
        )
        .mount(&server)
        .await;

    // The entry page links nowhere
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<html><body>Nothing to see</body></html>"))
        .mount(&server)
        .await;

    for page in ["/hidden-one", "/hidden-two", "/hidden-three"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html("hidden"))
            .expect(1)
            .mount(&server)
            .await;
    }

    let report = crawl(&server, create_test_config()).await;

    assert_eq!(report.processed, 4);
    assert!(report.contains_anywhere(&format!("{}/hidden-two", base)));
}

#[tokio::test]
async fn test_bootstrap_follows_redirect() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", format!("{}/home", base).as_str()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/home"))
        .respond_with(html(r#"<html><body><a href="/docs">Docs</a></body></html>"#))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(html("docs"))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(create_test_config()).unwrap();
    let target = coordinator.bootstrap(&base, "http").await.unwrap();

    assert_eq!(target.entry_url.path(), "/home");
    assert_eq!(target.root_domain, "127.0.0.1");

    let report = coordinator.run(target).await.unwrap();
    assert_eq!(report.processed, 2);
}

#[tokio::test]
async fn test_shutdown_abandons_queue() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            html(r#"<html><body><a href="/a">A</a><a href="/b">B</a></body></html>"#)
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    for page in ["/a", "/b"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html("never"))
            .expect(0)
            .mount(&server)
            .await;
    }

    let mut config = create_test_config();
    config.seeds.sitemaps = false;
    let coordinator = Coordinator::new(config).unwrap();
    let target = coordinator.bootstrap(&server.uri(), "http").await.unwrap();

    coordinator.shutdown_handle().trigger();
    let started = Instant::now();
    let report = coordinator.run(target).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(report.processed <= 1);
}

#[tokio::test]
async fn test_source_map_sources_recorded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><script src="/static/app.js"></script></head><body></body></html>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/static/app.js"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/javascript")
                .set_body_string("fetch(\"/api/items\");\n//# sourceMappingURL=app.js.map\n"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/static/app.js.map"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(
                    r#"{"version":3,"sources":["webpack:///src/App.tsx","webpack:///src/api.ts"],"mappings":""}"#,
                ),
        )
        .expect(1)
        .mount(&server)
        .await;

    let report = crawl(&server, create_test_config()).await;

    assert_eq!(
        report.values(ArtifactCategory::SourceFiles),
        vec!["webpack:///src/App.tsx", "webpack:///src/api.ts"]
    );
    assert!(report
        .values(ArtifactCategory::ApiEndpoints)
        .contains(&format!("{}/api/items", server.uri()).as_str()));
}

#[tokio::test]
async fn test_forms_and_emails_recorded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
            <p>Report issues to security@example.com</p>
            <form action="/login" method="post">
              <input name="username">
              <input type="password" name="password">
              <button type="submit" name="go">Sign in</button>
            </form>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    let report = crawl(&server, create_test_config()).await;

    assert_eq!(report.forms.len(), 1);
    let form = &report.forms[0];
    assert_eq!(form.method, "POST");
    assert_eq!(form.action, format!("{}/login", server.uri()));
    let names: Vec<&str> = form.inputs.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["username", "password", "go"]);

    assert!(report.values(ArtifactCategory::Emails).contains(&"security@example.com"));
    assert!(report.values(ArtifactCategory::Inputs).contains(&"password"));
}

#[tokio::test]
async fn test_deadline_cuts_crawl_delay_waits() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 2\nAllow: /"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
            <a href="/p1">1</a><a href="/p2">2</a><a href="/p3">3</a>
            <a href="/p4">4</a><a href="/p5">5</a><a href="/p6">6</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    // Every follow-up start is at least 2s after the entry fetch, past the deadline
    for page in ["/p1", "/p2", "/p3", "/p4", "/p5", "/p6"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html("page"))
            .expect(0)
            .mount(&server)
            .await;
    }

    let mut config = create_test_config();
    config.seeds.sitemaps = false;
    config.crawler.deadline_secs = Some(1);
    let coordinator = Coordinator::new(config).unwrap();
    let target = coordinator.bootstrap(&server.uri(), "http").await.unwrap();

    let started = Instant::now();
    let report = coordinator.run(target).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 0);
    assert!(report.contains_anywhere(&format!("{}/p6", server.uri())));
}
