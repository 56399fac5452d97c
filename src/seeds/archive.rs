//! Historical seeding from a URL archive index

use super::SeedSource;
use crate::crawler::{CrawlState, Transport};
use crate::url::canonicalize_absolute;
use crate::TransportError;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Wayback Machine CDX search endpoint
pub const DEFAULT_CDX_ENDPOINT: &str = "http://web.archive.org/cdx/search/cdx";

/// Rows requested from the CDX API per lookup
const CDX_ROW_LIMIT: &str = "300";

/// A source of URLs previously seen under a domain
#[async_trait]
pub trait HistoricalIndex: Send + Sync {
    /// Returns raw URLs recorded for `domain` and its subdomains
    async fn lookup(&self, domain: &str) -> Result<Vec<String>, TransportError>;
}

/// `HistoricalIndex` backed by the Wayback Machine CDX API
pub struct WaybackIndex {
    transport: Arc<dyn Transport>,
    endpoint: String,
    timeout: Duration,
}

impl WaybackIndex {
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self {
            transport,
            endpoint: DEFAULT_CDX_ENDPOINT.to_string(),
            timeout,
        }
    }

    /// Points the index at a different CDX-compatible endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn query_url(&self, domain: &str) -> Result<Url, TransportError> {
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("url", format!("*.{}/*", domain).as_str()),
                ("output", "json"),
                ("fl", "original"),
                ("collapse", "urlkey"),
                ("limit", CDX_ROW_LIMIT),
            ],
        )
        .map_err(|e| TransportError::Index(format!("invalid endpoint {}: {}", self.endpoint, e)))
    }
}

/// Extracts the `original` column from CDX JSON output
///
/// The first row is the field header.
fn parse_cdx_rows(body: &[u8]) -> Result<Vec<String>, TransportError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let rows: Vec<Vec<String>> = serde_json::from_slice(body)
        .map_err(|e| TransportError::Index(format!("malformed CDX response: {}", e)))?;

    Ok(rows
        .into_iter()
        .skip(1)
        .filter_map(|row| row.into_iter().next())
        .filter(|url| !url.is_empty())
        .collect())
}

#[async_trait]
impl HistoricalIndex for WaybackIndex {
    async fn lookup(&self, domain: &str) -> Result<Vec<String>, TransportError> {
        let url = self.query_url(domain)?;
        tracing::debug!("Querying historical index: {}", url);

        let response = self.transport.fetch(&url, self.timeout).await?;
        if !response.is_success() {
            return Err(TransportError::Index(format!(
                "CDX query returned {}",
                response.status
            )));
        }

        parse_cdx_rows(&response.body)
    }
}

/// Seeds the frontier from a historical index
pub struct HistoricalSeeder {
    index: Arc<dyn HistoricalIndex>,
    limit: usize,
}

impl HistoricalSeeder {
    /// Creates a seeder that takes at most `limit` URLs from `index`
    pub fn new(index: Arc<dyn HistoricalIndex>, limit: usize) -> Self {
        Self { index, limit }
    }
}

#[async_trait]
impl SeedSource for HistoricalSeeder {
    fn name(&self) -> &'static str {
        "historical"
    }

    async fn seed(&self, state: &CrawlState) -> Vec<Url> {
        let raw = match self.index.lookup(&state.target.root_domain).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Historical index lookup failed: {}", e);
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        raw.iter()
            .filter_map(|value| canonicalize_absolute(value).ok())
            .filter(|url| seen.insert(url.clone()))
            .take(self.limit)
            .collect()
    }
}
