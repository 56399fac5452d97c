//! Sitemap seeding from robots.txt declarations and well-known paths

use super::SeedSource;
use crate::crawler::CrawlState;
use crate::extract::{parse_sitemap, LinkHint};
use crate::url::{canonicalize, classify, ScopeClass};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use url::Url;

/// Paths tried on the entry host in addition to robots.txt `Sitemap:` lines
pub const WELL_KNOWN_SITEMAPS: &[&str] = &[
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap-index.xml",
    "/sitemap1.xml",
    "/sitemaps.xml",
    "/sitemap/sitemap.xml",
    "/wp-sitemap.xml",
];

/// Walks sitemaps and sitemap indexes breadth-first
pub struct SitemapSeeder {
    max_sitemaps: usize,
}

impl SitemapSeeder {
    /// Creates a seeder that fetches at most `max_sitemaps` documents
    pub fn new(max_sitemaps: usize) -> Self {
        Self { max_sitemaps }
    }

    /// Initial sitemap candidates: robots.txt declarations first, then well-known paths
    async fn candidates(&self, state: &CrawlState) -> Vec<Url> {
        let entry = &state.target.entry_url;
        let robots = state.politeness.robots_for(entry).await;

        let declared = robots
            .sitemaps()
            .iter()
            .filter_map(|raw| canonicalize(raw, entry).ok());
        let well_known = WELL_KNOWN_SITEMAPS
            .iter()
            .filter_map(|path| canonicalize(path, entry).ok());

        declared.chain(well_known).collect()
    }

    /// Fetches one sitemap under the host permit
    ///
    /// # Returns
    ///
    /// The body on a 2xx response, otherwise `None`
    async fn fetch_sitemap(&self, state: &CrawlState, url: &Url) -> Option<Vec<u8>> {
        let _permit = state.host_permit(url).await?;

        match state.transport.fetch(url, state.request_timeout).await {
            Ok(response) if response.is_success() => Some(response.body),
            Ok(response) => {
                tracing::debug!("Sitemap {} returned {}", url, response.status);
                None
            }
            Err(e) => {
                tracing::debug!("Failed to fetch sitemap {}: {}", url, e);
                None
            }
        }
    }
}

#[async_trait]
impl SeedSource for SitemapSeeder {
    fn name(&self) -> &'static str {
        "sitemap"
    }

    fn hint(&self) -> LinkHint {
        LinkHint::Sitemap
    }

    async fn seed(&self, state: &CrawlState) -> Vec<Url> {
        let mut queue: VecDeque<Url> = VecDeque::new();
        let mut seen = HashSet::new();
        for candidate in self.candidates(state).await {
            if seen.insert(candidate.clone()) {
                queue.push_back(candidate);
            }
        }

        let mut urls = Vec::new();
        let mut fetched = 0;

        while let Some(sitemap_url) = queue.pop_front() {
            if fetched >= self.max_sitemaps {
                tracing::debug!("Sitemap limit of {} reached", self.max_sitemaps);
                break;
            }

            if classify(&sitemap_url, &state.target) != ScopeClass::InScope {
                tracing::debug!("Skipping off-scope sitemap {}", sitemap_url);
                continue;
            }
            if !state.politeness.allowed(&sitemap_url).await {
                state.note_disallowed(&sitemap_url);
                continue;
            }

            fetched += 1;
            let Some(body) = self.fetch_sitemap(state, &sitemap_url).await else {
                continue;
            };

            let document = parse_sitemap(&body);
            tracing::debug!(
                "Sitemap {}: {} URLs, {} nested sitemaps",
                sitemap_url,
                document.urls.len(),
                document.sitemaps.len()
            );

            urls.extend(document.urls);
            for nested in document.sitemaps {
                if seen.insert(nested.clone()) {
                    queue.push_back(nested);
                }
            }
        }

        tracing::info!("Read {} sitemaps, {} URLs listed", fetched, urls.len());
        urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::crawler::HttpTransport;
    use crate::url::{Target, UrlFilter};
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn state_for(server: &MockServer, config: &Config) -> CrawlState {
        let target = Target::from_effective_url(Url::parse(&server.uri()).unwrap()).unwrap();
        let filter = UrlFilter::from_config(&config.scope).unwrap();
        let transport = Arc::new(HttpTransport::from_config(config).unwrap());
        CrawlState::new(target, filter, config, transport)
    }

    fn xml(body: String) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "application/xml")
            .set_body_string(body)
    }

    #[tokio::test]
    async fn test_follows_robots_and_index() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!("User-agent: *\nAllow: /\nSitemap: {}/index.xml\n", base)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/index.xml"))
            .respond_with(xml(format!(
                r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
<sitemap><loc>{base}/pages.xml</loc></sitemap>
<sitemap><loc>https://elsewhere.org/sitemap.xml</loc></sitemap>
</sitemapindex>"#
            )))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/pages.xml"))
            .respond_with(xml(format!(
                r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
<url><loc>{base}/a</loc></url>
<url><loc>{base}/b</loc></url>
</urlset>"#
            )))
            .expect(1)
            .mount(&server)
            .await;

        let state = state_for(&server, &Config::default()).await;
        let urls = SitemapSeeder::new(50).seed(&state).await;

        let paths: Vec<&str> = urls.iter().map(|u| u.path()).collect();
        assert_eq!(paths, vec!["/a", "/b"]);
    }

    #[tokio::test]
    async fn test_tries_well_known_paths() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(xml(format!(
                r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
<url><loc>{base}/from-well-known</loc></url>
</urlset>"#
            )))
            .mount(&server)
            .await;

        let state = state_for(&server, &Config::default()).await;
        let urls = SitemapSeeder::new(50).seed(&state).await;

        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].path(), "/from-well-known");
    }

    #[tokio::test]
    async fn test_respects_sitemap_limit() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(xml(format!(
                r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
<url><loc>{base}/one</loc></url>
</urlset>"#
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap_index.xml"))
            .respond_with(xml(String::new()))
            .expect(0)
            .mount(&server)
            .await;

        let state = state_for(&server, &Config::default()).await;
        let urls = SitemapSeeder::new(1).seed(&state).await;
        assert_eq!(urls.len(), 1);
    }
}
