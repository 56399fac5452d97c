//! Shared crawl state and candidate intake
//!
//! `CrawlState` is created by the coordinator for one run and shared by every
//! worker and seeder. Discoveries from any source pass through `ingest`, which
//! applies scope, robots and bucketing rules before offering URLs to the frontier.

use super::fetcher::Transport;
use super::frontier::{Frontier, FrontierEntry};
use super::politeness::{HostPermit, Politeness};
use super::report::CrawlReport;
use crate::artifacts::{categorize, ArtifactCategory, ArtifactRegistry};
use crate::config::Config;
use crate::extract::{parse_source_map, Discovery, LinkHint};
use crate::state::CrawlCounters;
use crate::url::{classify, extract_host, query_keys, strip_www, ScopeClass, Target, UrlFilter};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// The document a discovery was made in
#[derive(Debug, Clone, Copy)]
pub struct Origin<'a> {
    /// Final URL of the document
    pub url: &'a Url,
    /// Depth of the document; candidates are offered one level deeper
    pub depth: u32,
}

/// State shared by all crawl tasks for one run
pub struct CrawlState {
    pub target: Target,
    pub frontier: Arc<Frontier>,
    pub politeness: Arc<Politeness>,
    pub registry: Arc<ArtifactRegistry>,
    pub counters: Arc<CrawlCounters>,
    pub transport: Arc<dyn Transport>,
    pub request_timeout: Duration,
    disallowed: Mutex<HashSet<String>>,
}

impl CrawlState {
    /// Creates the state for a crawl of `target`
    pub fn new(
        target: Target,
        filter: UrlFilter,
        config: &Config,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let frontier = Arc::new(Frontier::new(
            target.clone(),
            filter,
            config.crawler.max_depth,
            config.crawler.max_urls,
        ));
        let politeness = Arc::new(Politeness::new(Arc::clone(&transport), config));

        Self {
            target,
            frontier,
            politeness,
            registry: Arc::new(ArtifactRegistry::new()),
            counters: Arc::new(CrawlCounters::new()),
            transport,
            request_timeout: Duration::from_millis(config.crawler.request_timeout_ms),
            disallowed: Mutex::new(HashSet::new()),
        }
    }

    /// Applies one discovery event
    pub async fn ingest(&self, discovery: Discovery, origin: Origin<'_>) {
        let source = origin.url.as_str();

        match discovery {
            Discovery::Link { url, hint, context } => {
                self.ingest_link(url, hint, context, origin).await;
            }
            Discovery::Form(form) => {
                self.registry.record_form(form, source);
            }
            Discovery::SourceMap(map_url) => {
                self.ingest_source_map(map_url, origin).await;
            }
            Discovery::SourceFile(path) => {
                self.registry
                    .record(ArtifactCategory::SourceFiles, path, source, "sourcemap");
            }
            Discovery::Email(email) => {
                self.registry.record(ArtifactCategory::Emails, email, source, "text");
            }
            Discovery::AppRoute(route) => {
                self.registry
                    .record(ArtifactCategory::AppRoutes, route, source, "next-data");
            }
        }
    }

    /// Handles a URL candidate
    ///
    /// # Processing Order
    ///
    /// 1. External hosts: recorded only when the hint marks an endpoint artifact
    /// 2. Off-scope subdomains: host recorded in `subdomains`; continues only if explicitly included
    /// 3. Socket endpoints: recorded, never fetched
    /// 4. robots.txt: disallowed candidates are dropped entirely
    /// 5. Recorded in its bucket, query keys recorded in `parameters`
    /// 6. Followable hints are offered to the frontier one level below the origin
    pub async fn ingest_link(&self, url: Url, hint: LinkHint, context: &str, origin: Origin<'_>) {
        let source = origin.url.as_str();
        let host = extract_host(&url).unwrap_or_default();

        match classify(&url, &self.target) {
            ScopeClass::External => {
                if hint.is_artifact() {
                    self.record_url(&url, hint, source, context);
                }
                return;
            }
            ScopeClass::OffScopeSubdomain => {
                self.registry
                    .record(ArtifactCategory::Subdomains, host, source, context);
                if !self.frontier.filter().explicitly_included(&url) {
                    if hint.is_artifact() {
                        self.record_url(&url, hint, source, context);
                    }
                    return;
                }
            }
            ScopeClass::InScope => {
                if strip_www(&host) != self.target.root_domain {
                    self.registry
                        .record(ArtifactCategory::Subdomains, host, source, context);
                }
            }
        }

        if !matches!(url.scheme(), "http" | "https") {
            self.record_url(&url, hint, source, context);
            return;
        }

        if !self.politeness.allowed(&url).await {
            self.note_disallowed(&url);
            return;
        }

        self.record_url(&url, hint, source, context);

        if hint.is_followable() {
            let admission = self.frontier.offer(FrontierEntry {
                url,
                depth: origin.depth + 1,
                discovered_from: Some(origin.url.clone()),
            });
            tracing::trace!("Offered candidate from {}: {:?}", source, admission);
        }
    }

    /// Records a URL in its bucket and its query keys in `parameters`
    pub fn record_url(&self, url: &Url, hint: LinkHint, source: &str, context: &str) {
        self.registry
            .record(categorize(url, hint), url.as_str(), source, context);
        for key in query_keys(url) {
            self.registry
                .record(ArtifactCategory::Parameters, key, url.as_str(), "query");
        }
    }

    /// Waits for a host permit unless the crawl is being drained
    ///
    /// Returns `None` as soon as the frontier closes, including while the wait
    /// for the host's next start time is still running.
    pub async fn host_permit(&self, url: &Url) -> Option<HostPermit> {
        let permit = tokio::select! {
            permit = self.politeness.acquire(url) => permit?,
            _ = self.frontier.closed() => {
                tracing::trace!("Drain started while waiting to fetch {}", url);
                return None;
            }
        };

        if self.frontier.is_closed() {
            return None;
        }
        Some(permit)
    }

    /// Counts a robots.txt refusal once per URL
    pub fn note_disallowed(&self, url: &Url) {
        let first = self
            .disallowed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.as_str().to_string());
        if first {
            tracing::debug!("Disallowed by robots.txt: {}", url);
            self.counters.record_disallowed();
        }
    }

    /// Fetches a source map once and records the sources it lists
    async fn ingest_source_map(&self, map_url: Url, origin: Origin<'_>) {
        if classify(&map_url, &self.target) != ScopeClass::InScope {
            tracing::debug!("Skipping off-scope source map {}", map_url);
            return;
        }

        if !self.politeness.allowed(&map_url).await {
            self.note_disallowed(&map_url);
            return;
        }

        // The files bucket doubles as the fetched-once set for maps
        let first = self.registry.record(
            ArtifactCategory::Files,
            map_url.as_str(),
            origin.url.as_str(),
            "sourcemap",
        );
        if !first {
            return;
        }

        let Some(_permit) = self.host_permit(&map_url).await else {
            return;
        };

        match self.transport.fetch(&map_url, self.request_timeout).await {
            Ok(response) if response.is_success() => {
                let sources = parse_source_map(&response.body);
                tracing::debug!("Source map {} lists {} sources", map_url, sources.len());
                for path in sources {
                    self.registry.record(
                        ArtifactCategory::SourceFiles,
                        path,
                        map_url.as_str(),
                        "sourcemap",
                    );
                }
            }
            Ok(response) => {
                tracing::debug!("Source map {} returned {}", map_url, response.status);
            }
            Err(e) => {
                tracing::debug!("Failed to fetch source map {}: {}", map_url, e);
            }
        }
    }

    /// Builds the final report
    pub fn finalize(&self, started_at: DateTime<Utc>, config_hash: Option<String>) -> CrawlReport {
        let counters = self.counters.snapshot();
        let snapshot = self.registry.snapshot();

        CrawlReport {
            target: self.target.clone(),
            started_at,
            finished_at: Utc::now(),
            config_hash,
            processed: counters.processed,
            failed: counters.failed,
            enqueued: self.frontier.admitted(),
            disallowed: counters.disallowed,
            artifacts: snapshot.artifacts,
            forms: snapshot.forms,
        }
    }
}
