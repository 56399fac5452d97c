use crate::robots::ParsedRobots;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OnceCell, Semaphore};

/// Tracks the state of a host during crawling
///
/// Created lazily on first contact and kept for the whole run. All fields are
/// mutated under the politeness engine's host lock; the robots cells and the slot
/// semaphore are shared handles so they can be awaited without holding that lock.
///
/// Pacing is per host. robots.txt is per origin, so a host served over both
/// schemes keeps one robots cell for each.
#[derive(Debug)]
pub struct HostState {
    /// Number of requests issued to this host
    pub request_count: u32,

    /// Start time reserved for the most recent request to this host
    pub last_fetch_time: Option<Instant>,

    /// Requests currently holding a host permit
    pub in_flight_count: u32,

    /// Largest Crawl-delay declared by any of the host's robots.txt files, when honored
    pub crawl_delay: Option<Duration>,

    /// robots.txt keyed by origin, each fetched at most once
    pub robots_rules: HashMap<String, Arc<OnceCell<Arc<ParsedRobots>>>>,

    /// Per-host concurrency slots
    pub slots: Arc<Semaphore>,
}

impl HostState {
    /// Creates a new HostState allowing `max_in_flight` concurrent requests
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            request_count: 0,
            last_fetch_time: None,
            in_flight_count: 0,
            crawl_delay: None,
            robots_rules: HashMap::new(),
            slots: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// The robots cell for one of this host's origins
    pub fn robots_cell(&mut self, origin: &str) -> Arc<OnceCell<Arc<ParsedRobots>>> {
        Arc::clone(self.robots_rules.entry(origin.to_string()).or_default())
    }

    /// Records a Crawl-delay, keeping the larger when several origins declare one
    pub fn raise_crawl_delay(&mut self, delay: Duration) {
        self.crawl_delay = Some(self.crawl_delay.map_or(delay, |current| current.max(delay)));
    }

    /// The larger of the configured politeness delay and the robots crawl-delay
    pub fn effective_delay(&self, configured: Duration) -> Duration {
        match self.crawl_delay {
            Some(crawl_delay) => configured.max(crawl_delay),
            None => configured,
        }
    }

    /// Checks if a request may start at `now` given the effective delay
    pub fn can_request(&self, delay: Duration, now: Instant) -> bool {
        self.time_until_next_request(delay, now).is_none()
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, delay: Duration, now: Instant) -> Option<Duration> {
        let next = self.last_fetch_time? + delay;
        (next > now).then(|| next - now)
    }

    /// Reserves the next request start time for this host
    ///
    /// The reserved start is never earlier than `now` nor closer than `delay` to the
    /// previous reservation, so consecutive starts are always `delay` apart even
    /// when several callers reserve at the same instant.
    ///
    /// # Returns
    ///
    /// The instant at which the caller may issue its request
    pub fn reserve_slot(&mut self, delay: Duration, now: Instant) -> Instant {
        let start = match self.last_fetch_time {
            Some(last) => now.max(last + delay),
            None => now,
        };

        self.last_fetch_time = Some(start);
        self.request_count += 1;
        self.in_flight_count += 1;
        start
    }

    /// Marks a request to this host as finished
    pub fn release(&mut self) {
        self.in_flight_count = self.in_flight_count.saturating_sub(1);
    }
}
