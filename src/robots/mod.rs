//! Robots.txt handling module
//!
//! This module provides functionality for fetching and parsing robots.txt files.
//! Each host's file is fetched at most once per run; the politeness engine owns
//! the per-host cache.

mod parser;

pub use parser::ParsedRobots;

use crate::crawler::Transport;
use std::time::Duration;
use url::Url;

/// Fetches robots.txt for the origin of `url`
///
/// Any failure (transport error, non-200 status, unparseable location) yields a
/// permissive ruleset so that a missing robots.txt never blocks the crawl.
///
/// # Arguments
///
/// * `transport` - The transport used for every crawl request
/// * `url` - Any URL on the host whose robots.txt is wanted
/// * `timeout` - Per-request timeout
///
/// # Returns
///
/// The parsed robots.txt, or `ParsedRobots::allow_all()`
pub async fn fetch_robots(transport: &dyn Transport, url: &Url, timeout: Duration) -> ParsedRobots {
    let robots_url = match url.join("/robots.txt") {
        Ok(u) => u,
        Err(_) => return ParsedRobots::allow_all(),
    };

    match transport.fetch(&robots_url, timeout).await {
        Ok(response) if response.status == 200 => {
            tracing::debug!("Fetched {}", robots_url);
            ParsedRobots::from_content(&response.text())
        }
        Ok(response) => {
            tracing::debug!(
                "{} returned {}, allowing all",
                robots_url,
                response.status
            );
            ParsedRobots::allow_all()
        }
        Err(e) => {
            tracing::debug!("Failed to fetch {}: {}, allowing all", robots_url, e);
            ParsedRobots::allow_all()
        }
    }
}

/// Checks if a URL is allowed by robots.txt
///
/// # Arguments
///
/// * `robots` - The parsed robots.txt data
/// * `url` - The URL to check
/// * `user_agent` - The crawler's product token
///
/// # Returns
///
/// * `true` - If the URL is allowed
/// * `false` - If the URL is disallowed
pub fn is_allowed(robots: &ParsedRobots, url: &str, user_agent: &str) -> bool {
    robots.is_allowed(url, user_agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::FetchedResponse;
    use crate::TransportError;
    use async_trait::async_trait;
    use reqwest::header::HeaderMap;

    struct FixedTransport {
        status: u16,
        body: &'static str,
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn fetch(&self, url: &Url, _timeout: Duration) -> Result<FetchedResponse, TransportError> {
            assert_eq!(url.path(), "/robots.txt");
            Ok(FetchedResponse {
                status: self.status,
                headers: HeaderMap::new(),
                body: self.body.as_bytes().to_vec(),
                final_url: url.clone(),
                truncated: false,
            })
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn fetch(&self, url: &Url, _timeout: Duration) -> Result<FetchedResponse, TransportError> {
            Err(TransportError::Connect {
                url: url.to_string(),
            })
        }
    }

    fn page() -> Url {
        Url::parse("https://example.com/deep/page?x=1").unwrap()
    }

    #[tokio::test]
    async fn test_fetch_robots_ok() {
        let transport = FixedTransport {
            status: 200,
            body: "User-agent: *\nDisallow: /private",
        };
        let robots = fetch_robots(&transport, &page(), Duration::from_secs(1)).await;
        assert!(!robots.is_allowed("https://example.com/private/a", "TestBot"));
        assert!(is_allowed(&robots, "https://example.com/public", "TestBot"));
    }

    #[tokio::test]
    async fn test_fetch_robots_not_found_allows_all() {
        let transport = FixedTransport {
            status: 404,
            body: "User-agent: *\nDisallow: /",
        };
        let robots = fetch_robots(&transport, &page(), Duration::from_secs(1)).await;
        assert!(robots.is_allow_all());
    }

    #[tokio::test]
    async fn test_fetch_robots_error_allows_all() {
        let robots = fetch_robots(&FailingTransport, &page(), Duration::from_secs(1)).await;
        assert!(robots.is_allow_all());
    }
}
