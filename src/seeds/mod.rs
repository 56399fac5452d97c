//! Seed sources
//!
//! Seeders pre-populate the frontier with URLs that may not be reachable by links:
//! - `sitemap`: robots.txt `Sitemap:` lines and well-known sitemap paths
//! - `archive`: a historical URL index (the Wayback CDX API by default)
//!
//! Seeds go through the same intake as discovered links, so scope, robots.txt,
//! filters and bucketing all apply. They enter the frontier at depth 1.

mod archive;
mod sitemap;

pub use archive::{HistoricalIndex, HistoricalSeeder, WaybackIndex, DEFAULT_CDX_ENDPOINT};
pub use sitemap::{SitemapSeeder, WELL_KNOWN_SITEMAPS};

use crate::crawler::{CrawlState, Origin};
use crate::extract::LinkHint;
use async_trait::async_trait;
use url::Url;

/// A source of seed URLs for one crawl
#[async_trait]
pub trait SeedSource: Send + Sync {
    /// Short name used in logs and as the artifact context
    fn name(&self) -> &'static str;

    /// Hint applied to every seed from this source
    fn hint(&self) -> LinkHint {
        LinkHint::Navigation
    }

    /// Produces seed URLs
    ///
    /// Failures are logged and yield an empty list.
    async fn seed(&self, state: &CrawlState) -> Vec<Url>;
}

/// Runs a seed source and feeds its URLs to the frontier
///
/// # Returns
///
/// Number of seeds handed to the intake
pub async fn feed(state: &CrawlState, source: &dyn SeedSource) -> usize {
    let seeds = source.seed(state).await;
    let entry_url = state.target.entry_url.clone();
    let origin = Origin {
        url: &entry_url,
        depth: 0,
    };

    let before = state.frontier.admitted();
    let count = seeds.len();
    for url in seeds {
        state
            .ingest_link(url, source.hint(), source.name(), origin)
            .await;
    }

    tracing::info!(
        "{} seeding: {} URLs found, {} admitted",
        source.name(),
        count,
        state.frontier.admitted().saturating_sub(before)
    );
    count
}
