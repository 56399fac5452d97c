//! Politeness engine: robots.txt compliance and per-host pacing
//!
//! This module handles:
//! - Lazy, at-most-once robots.txt fetching per origin
//! - Allow/disallow decisions for the crawler's product token
//! - Per-host concurrency limits via semaphores
//! - Minimum spacing between request starts to the same host, taking the larger of
//!   the configured delay and the robots.txt Crawl-delay
//!
//! Pacing state is shared by every scheme and port of a host.

use super::fetcher::Transport;
use crate::config::Config;
use crate::robots::{fetch_robots, is_allowed, ParsedRobots};
use crate::state::HostState;
use crate::url::extract_host;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::OwnedSemaphorePermit;
use url::Url;

/// Upper bound on an honored Crawl-delay
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(3600);

/// Converts a robots.txt Crawl-delay into a pacing delay
///
/// Values too large to represent are capped at `MAX_CRAWL_DELAY`; negative and
/// non-finite values are ignored.
pub fn crawl_delay_duration(seconds: f64) -> Option<Duration> {
    if seconds.is_nan() || seconds < 0.0 {
        return None;
    }
    Some(
        Duration::try_from_secs_f64(seconds)
            .map_or(MAX_CRAWL_DELAY, |delay| delay.min(MAX_CRAWL_DELAY)),
    )
}

/// Permission to send one request to a host
///
/// Holds one of the host's concurrency slots until dropped.
pub struct HostPermit {
    _slot: OwnedSemaphorePermit,
    host: String,
    politeness: Arc<Politeness>,
}

impl Drop for HostPermit {
    fn drop(&mut self) {
        self.politeness.with_host(&self.host, HostState::release);
    }
}

/// Per-host robots and pacing state
pub struct Politeness {
    hosts: Mutex<HashMap<String, HostState>>,
    transport: Arc<dyn Transport>,
    user_agent: String,
    delay: Duration,
    respect_robots: bool,
    respect_crawl_delay: bool,
    per_host_concurrency: usize,
    timeout: Duration,
}

impl Politeness {
    /// Creates the engine
    ///
    /// # Arguments
    ///
    /// * `transport` - Used for robots.txt fetches
    /// * `config` - Politeness, concurrency and user agent settings
    pub fn new(transport: Arc<dyn Transport>, config: &Config) -> Self {
        Self {
            hosts: Mutex::new(HashMap::new()),
            transport,
            user_agent: config.user_agent.crawler_name.clone(),
            delay: Duration::from_millis(config.politeness.delay_ms),
            respect_robots: config.politeness.respect_robots,
            respect_crawl_delay: config.politeness.respect_crawl_delay,
            per_host_concurrency: config.crawler.per_host_concurrency as usize,
            timeout: Duration::from_millis(config.crawler.request_timeout_ms),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, HostState>> {
        self.hosts.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_host<T>(&self, host: &str, f: impl FnOnce(&mut HostState) -> T) -> T {
        let mut hosts = self.lock();
        let state = hosts
            .entry(host.to_string())
            .or_insert_with(|| HostState::new(self.per_host_concurrency));
        f(state)
    }

    /// Returns robots.txt for the URL's origin, fetching it on first use
    ///
    /// Concurrent callers for the same origin share a single fetch.
    pub async fn robots_for(&self, url: &Url) -> Arc<ParsedRobots> {
        let host = host_key(url);
        let origin = url.origin().ascii_serialization();
        let cell = self.with_host(&host, |state| state.robots_cell(&origin));

        let robots = cell
            .get_or_init(|| async {
                let robots = fetch_robots(self.transport.as_ref(), url, self.timeout).await;

                if self.respect_crawl_delay {
                    if let Some(delay) = robots.crawl_delay(&self.user_agent).and_then(crawl_delay_duration) {
                        tracing::debug!("Crawl-delay of {:?} for {}", delay, origin);
                        self.with_host(&host, |state| state.raise_crawl_delay(delay));
                    }
                }

                Arc::new(robots)
            })
            .await;

        Arc::clone(robots)
    }

    /// Checks robots.txt for a URL
    ///
    /// Always true when robots compliance is off.
    pub async fn allowed(&self, url: &Url) -> bool {
        if !self.respect_robots {
            return true;
        }

        let robots = self.robots_for(url).await;
        is_allowed(&robots, url.as_str(), &self.user_agent)
    }

    /// Effective delay currently in force for a URL's host
    pub fn delay_for(&self, url: &Url) -> Duration {
        let configured = self.delay;
        self.with_host(&host_key(url), |state| state.effective_delay(configured))
    }

    /// Waits until a request to the URL's host may start
    ///
    /// Takes a host concurrency slot, then reserves the next start time under the
    /// host lock and sleeps until it arrives. Reservations are spaced by the
    /// effective delay, so concurrent callers never start closer together than that.
    /// The future may be dropped at any point; a reserved slot is released with it.
    ///
    /// # Returns
    ///
    /// * `Some(HostPermit)` - The request may be sent; drop the permit when done
    /// * `None` - The host's slots were closed
    pub async fn acquire(self: &Arc<Self>, url: &Url) -> Option<HostPermit> {
        if self.respect_crawl_delay {
            // Crawl-delay must be known before the first reservation
            self.robots_for(url).await;
        }

        let host = host_key(url);
        let slots = self.with_host(&host, |state| Arc::clone(&state.slots));
        let slot = slots.acquire_owned().await.ok()?;

        let configured = self.delay;
        let start = self.with_host(&host, |state| {
            let delay = state.effective_delay(configured);
            state.reserve_slot(delay, Instant::now())
        });

        let permit = HostPermit {
            _slot: slot,
            host,
            politeness: Arc::clone(self),
        };

        if start > Instant::now() {
            tracing::trace!("Pacing request to {}", permit.host);
            tokio::time::sleep_until(tokio::time::Instant::from_std(start)).await;
        }

        Some(permit)
    }

    /// Requests issued per host so far
    pub fn request_counts(&self) -> HashMap<String, u32> {
        self.lock()
            .iter()
            .map(|(host, state)| (host.clone(), state.request_count))
            .collect()
    }
}

/// Pacing is tracked per host, whatever the scheme or port
fn host_key(url: &Url) -> String {
    extract_host(url).unwrap_or_else(|| url.origin().ascii_serialization())
}
