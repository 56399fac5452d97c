//! HTTP fetching and the pluggable network capabilities
//!
//! This module handles all network access for the crawler:
//! - Building the HTTP client with the configured user agent
//! - The `Transport` capability and its reqwest implementation
//! - The optional `RenderBackend` capability for JavaScript application shells
//! - Response body size limits and error classification

use crate::config::{Config, UserAgentConfig};
use crate::TransportError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client};
use std::borrow::Cow;
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed per request
pub const MAX_REDIRECTS: usize = 5;

/// A completed HTTP exchange
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// HTTP status code
    pub status: u16,

    /// Response headers
    pub headers: HeaderMap,

    /// Response body, possibly truncated
    pub body: Vec<u8>,

    /// URL after following redirects
    pub final_url: Url,

    /// Whether the body was cut at the configured size limit
    pub truncated: bool,
}

impl FetchedResponse {
    /// Returns a header value if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header value
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Returns true for 2xx responses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single GET and reports the final URL after redirects
///
/// Implementations must be safe to share between workers.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches `url`, giving up after `timeout`
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedResponse, TransportError>;
}

/// Output of a rendered page
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    /// The DOM after scripts ran, serialized as HTML
    pub final_dom: String,

    /// URLs of every subresource the page requested while rendering
    pub subresources: Vec<String>,
}

/// Executes a page's scripts and reports what it loaded
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Renders `url`, giving up after `timeout`
    async fn render(&self, url: &Url, timeout: Duration) -> Result<RenderedPage, TransportError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `accept_invalid_certs` - Skip TLS certificate validation
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use surface_ripple::config::UserAgentConfig;
/// use surface_ripple::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), false).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    accept_invalid_certs: bool,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    Client::builder()
        .user_agent(config.header_value())
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .danger_accept_invalid_certs(accept_invalid_certs)
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    max_response_bytes: usize,
}

impl HttpTransport {
    /// Wraps an existing client
    pub fn new(client: Client, max_response_bytes: usize) -> Self {
        Self {
            client,
            max_response_bytes,
        }
    }

    /// Builds the client from the crawl configuration
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.user_agent, config.crawler.accept_invalid_certs)?;
        Ok(Self::new(client, config.crawler.max_response_bytes))
    }

    async fn fetch_inner(&self, url: &Url) -> Result<FetchedResponse, TransportError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let final_url = response.url().clone();

        let mut body = Vec::new();
        let mut truncated = false;
        while let Some(chunk) = response.chunk().await.map_err(|e| classify_error(url, e))? {
            let remaining = self.max_response_bytes.saturating_sub(body.len());
            if chunk.len() > remaining {
                body.extend_from_slice(&chunk[..remaining]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }

        if truncated {
            tracing::debug!(
                "Truncated response body of {} at {} bytes",
                url,
                self.max_response_bytes
            );
        }

        Ok(FetchedResponse {
            status,
            headers,
            body,
            final_url,
            truncated,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedResponse, TransportError> {
        // Covers connect, headers and body together
        match tokio::time::timeout(timeout, self.fetch_inner(url)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                url: url.to_string(),
            }),
        }
    }
}

/// Maps a reqwest error to the transport taxonomy
fn classify_error(url: &Url, error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        TransportError::Connect {
            url: url.to_string(),
        }
    } else {
        TransportError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(max_bytes: usize) -> HttpTransport {
        let client = build_http_client(&UserAgentConfig::default(), false).unwrap();
        HttpTransport::new(client, max_bytes)
    }

    #[test]
    fn test_build_http_client() {
        let config = UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: Some("https://example.com".to_string()),
            contact_email: Some("test@example.com".to_string()),
        };

        assert!(build_http_client(&config, false).is_ok());
        assert!(build_http_client(&config, true).is_ok());
    }

    #[test]
    fn test_response_helpers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        let response = FetchedResponse {
            status: 204,
            headers,
            body: b"hi".to_vec(),
            final_url: Url::parse("https://example.com/").unwrap(),
            truncated: false,
        };

        assert!(response.is_success());
        assert_eq!(response.content_type(), Some("text/html; charset=utf-8"));
        assert_eq!(response.header("content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(response.header("x-missing"), None);
        assert_eq!(response.text(), "hi");
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header_exists("user-agent"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html></html>"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        let response = transport(1024)
            .fetch(&url, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"<html></html>");
        assert_eq!(response.final_url, url);
        assert!(!response.truncated);
    }

    #[tokio::test]
    async fn test_fetch_follows_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("location", "/new"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/old", server.uri())).unwrap();
        let response = transport(1024)
            .fetch(&url, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.final_url.path(), "/new");
    }

    #[tokio::test]
    async fn test_fetch_truncates_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(100)))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/big", server.uri())).unwrap();
        let response = transport(10)
            .fetch(&url, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(response.body.len(), 10);
        assert!(response.truncated);
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/slow", server.uri())).unwrap();
        let result = transport(1024)
            .fetch(&url, Duration::from_millis(100))
            .await;

        assert!(matches!(result, Err(TransportError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Nothing listens on port 9 locally
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let result = transport(1024).fetch(&url, Duration::from_secs(5)).await;

        assert!(result.is_err());
    }
}
