//! Crawler coordinator - crawl lifecycle
//!
//! This module owns one crawl from start to finish:
//! - Bootstrap: resolving the target's redirects and locking scope
//! - Seeding the frontier from the entry URL, sitemaps and the historical index
//! - Running the worker pool until the frontier drains
//! - Forced drains on shutdown or deadline
//! - Building the final report

use super::context::CrawlState;
use super::executor::Executor;
use super::fetcher::{HttpTransport, RenderBackend, Transport};
use super::frontier::FrontierEntry;
use super::report::CrawlReport;
use crate::config::{validate, Config};
use crate::seeds::{feed, HistoricalIndex, HistoricalSeeder, SitemapSeeder, WaybackIndex};
use crate::url::{canonicalize_absolute, Target, UrlFilter};
use crate::{ConfigError, RippleError};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Requests a forced drain of a running crawl
///
/// Cloneable; triggering any clone closes the frontier. Queued URLs are abandoned,
/// in-flight fetches finish and the report is still produced.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Requests the drain
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once `trigger` has been called
    pub async fn triggered(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives in self, so the channel cannot close while waiting
        let _ = receiver.wait_for(|triggered| *triggered).await;
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    filter: UrlFilter,
    transport: Arc<dyn Transport>,
    render: Option<Arc<dyn RenderBackend>>,
    history: Option<Arc<dyn HistoricalIndex>>,
    config_hash: Option<String>,
    shutdown: ShutdownHandle,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Validates the configuration and compiles the user filters before any
    /// network activity.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to bootstrap
    /// * `Err(RippleError)` - Invalid configuration or HTTP client setup failure
    pub fn new(config: Config) -> Result<Self, RippleError> {
        validate(&config)?;
        let filter = UrlFilter::from_config(&config.scope)?;
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_config(&config)?);

        let history: Option<Arc<dyn HistoricalIndex>> = if config.seeds.historical {
            Some(Arc::new(WaybackIndex::new(
                Arc::clone(&transport),
                Duration::from_millis(config.crawler.request_timeout_ms),
            )))
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            filter,
            transport,
            render: None,
            history,
            config_hash: None,
            shutdown: ShutdownHandle::new(),
        })
    }

    /// Replaces the network transport
    ///
    /// An enabled default historical index keeps using the transport it was built with.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Delegates application-shell pages to a render backend
    pub fn with_render_backend(mut self, render: Arc<dyn RenderBackend>) -> Self {
        self.render = Some(render);
        self
    }

    /// Seeds from the given historical index
    pub fn with_historical_index(mut self, index: Arc<dyn HistoricalIndex>) -> Self {
        self.history = Some(index);
        self
    }

    /// Records the configuration file hash in the report
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Handle for requesting a forced drain
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolves the target and locks scope
    ///
    /// The target is fetched once with redirects followed; the effective host, with
    /// any leading `www.` removed, becomes the root domain. If the fetch fails the
    /// requested URL is used as-is.
    ///
    /// # Arguments
    ///
    /// * `target` - Domain or URL to crawl
    /// * `scheme` - Scheme prepended when `target` has none (`http` or `https`)
    pub async fn bootstrap(&self, target: &str, scheme: &str) -> Result<Target, RippleError> {
        if !matches!(scheme, "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "scheme must be http or https, got {}",
                scheme
            ))
            .into());
        }

        let target = target.trim();
        let raw = if target.contains("://") {
            target.to_string()
        } else {
            format!("{}://{}", scheme, target)
        };

        let requested = canonicalize_absolute(&raw).map_err(|e| RippleError::Bootstrap {
            target: target.to_string(),
            reason: e.to_string(),
        })?;

        let timeout = Duration::from_millis(self.config.crawler.request_timeout_ms);
        let effective = match self.transport.fetch(&requested, timeout).await {
            Ok(response) => {
                let effective =
                    canonicalize_absolute(response.final_url.as_str()).unwrap_or(response.final_url);
                if effective != requested {
                    tracing::info!("{} redirected to {}", requested, effective);
                }
                effective
            }
            Err(e) => {
                tracing::warn!("Bootstrap fetch of {} failed, using it as-is: {}", requested, e);
                requested
            }
        };

        let locked = Target::from_effective_url(effective).ok_or_else(|| RippleError::Bootstrap {
            target: target.to_string(),
            reason: "effective URL has no host".to_string(),
        })?;

        tracing::info!("Scope locked to *.{}", locked.root_domain);
        Ok(locked)
    }

    /// Crawls a bootstrapped target to completion
    ///
    /// # Flow
    ///
    /// 1. Seed the entry URL at depth 0
    /// 2. Start sitemap and historical seeding in the background
    /// 3. Run the workers until the frontier drains or a forced drain closes it
    /// 4. Build the report from the registry and counters
    pub async fn run(&self, target: Target) -> Result<CrawlReport, RippleError> {
        let started_at = Utc::now();
        tracing::info!("Starting crawl of {}", target.entry_url);

        let state = Arc::new(CrawlState::new(
            target.clone(),
            self.filter.clone(),
            &self.config,
            Arc::clone(&self.transport),
        ));

        let admission = state.frontier.offer(FrontierEntry {
            url: target.entry_url.clone(),
            depth: 0,
            discovered_from: None,
        });
        tracing::debug!("Entry URL: {:?}", admission);

        let watcher = self.spawn_watcher(Arc::clone(&state));
        let seeders = self.spawn_seeders(&state);

        let executor = Executor::new(
            Arc::clone(&state),
            self.render.clone(),
            Duration::from_millis(self.config.crawler.render_timeout_ms),
        );
        executor.run(self.config.crawler.concurrency as usize).await;

        for task in seeders {
            task.abort();
        }
        watcher.abort();

        let report = state.finalize(started_at, self.config_hash.clone());
        tracing::info!(
            "Crawl complete: {} processed, {} failed, {} enqueued, {} artifacts in {}s",
            report.processed,
            report.failed,
            report.enqueued,
            report.total_artifacts(),
            report.duration_seconds()
        );

        Ok(report)
    }

    /// Closes the frontier on shutdown or when the deadline passes
    fn spawn_watcher(&self, state: Arc<CrawlState>) -> JoinHandle<()> {
        let shutdown = self.shutdown.clone();
        let deadline = self.config.crawler.deadline_secs.map(Duration::from_secs);

        tokio::spawn(async move {
            let expired = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = shutdown.triggered() => {
                    tracing::info!("Shutdown requested, draining");
                }
                _ = expired => {
                    tracing::info!("Deadline reached, draining");
                }
            }

            state.frontier.close();
        })
    }

    /// Starts the enabled seed sources
    ///
    /// Each task holds the frontier open until it has fed its seeds.
    fn spawn_seeders(&self, state: &Arc<CrawlState>) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::new();

        if self.config.seeds.sitemaps {
            let state = Arc::clone(state);
            let hold = state.frontier.hold();
            let seeder = SitemapSeeder::new(self.config.seeds.max_sitemaps);
            tasks.push(tokio::spawn(async move {
                let _hold = hold;
                feed(&state, &seeder).await;
            }));
        }

        if let Some(index) = &self.history {
            let state = Arc::clone(state);
            let hold = state.frontier.hold();
            let seeder = HistoricalSeeder::new(Arc::clone(index), self.config.seeds.historical_limit);
            tasks.push(tokio::spawn(async move {
                let _hold = hold;
                feed(&state, &seeder).await;
            }));
        }

        tasks
    }
}

/// Bootstraps and crawls a target with the default transport
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `target` - Domain or URL; `https` is assumed when no scheme is given
pub async fn run_crawl(config: Config, target: &str) -> Result<CrawlReport, RippleError> {
    let coordinator = Coordinator::new(config)?;
    let target = coordinator.bootstrap(target, "https").await?;
    coordinator.run(target).await
}
