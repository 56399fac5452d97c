//! Frontier: the queue of URLs waiting to be fetched
//!
//! This module handles:
//! - Admission (dedup, scope, depth, URL budget, user filters) in one atomic step
//! - Breadth-first ordering: lower depth first, discovery order within a depth
//! - Drain detection: the crawl ends when nothing is queued and nothing is in flight
//! - Forced drain on deadline or shutdown

use crate::url::{classify, FilterVerdict, ScopeClass, Target, UrlFilter};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{watch, Notify};
use url::Url;

/// A URL admitted for fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Canonical URL
    pub url: Url,

    /// Discovery distance from the entry URL
    pub depth: u32,

    /// Page the URL was discovered on
    pub discovered_from: Option<Url>,
}

/// Outcome of offering a URL to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    AlreadyVisited,
    OutOfScope(ScopeClass),
    TooDeep,
    LimitReached,
    Filtered,
    IgnoredExtension,
    Closed,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Heap element; lower depth first, then lower sequence number
#[derive(Debug)]
struct QueuedEntry {
    entry: FrontierEntry,
    seq: u64,
}

impl Ord for QueuedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap pops the shallowest, oldest entry
        other
            .entry
            .depth
            .cmp(&self.entry.depth)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueuedEntry {}

#[derive(Debug, Default)]
struct FrontierInner {
    queue: BinaryHeap<QueuedEntry>,
    /// Every URL ever admitted; membership is permanent
    visited: HashSet<String>,
    admitted: u64,
    next_seq: u64,
    in_flight: usize,
    closed: bool,
    limit_logged: bool,
}

/// The crawl frontier
#[derive(Debug)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
    notify: Notify,
    closed_signal: watch::Sender<bool>,
    target: Target,
    filter: UrlFilter,
    max_depth: u32,
    max_urls: u64,
}

/// Keeps the frontier from draining while held
///
/// Handed out with every taken entry and to background seeders. Dropping it
/// marks the unit of work complete.
#[derive(Debug)]
pub struct InFlight {
    frontier: Arc<Frontier>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.frontier.complete();
    }
}

impl Frontier {
    /// Creates an empty frontier bound to a locked target
    ///
    /// # Arguments
    ///
    /// * `target` - The locked scope
    /// * `filter` - Compiled user filters
    /// * `max_depth` - Deepest admissible discovery depth
    /// * `max_urls` - Maximum number of admitted URLs over the whole run
    pub fn new(target: Target, filter: UrlFilter, max_depth: u32, max_urls: u64) -> Self {
        Self {
            inner: Mutex::new(FrontierInner::default()),
            notify: Notify::new(),
            closed_signal: watch::channel(false).0,
            target,
            filter,
            max_depth,
            max_urls,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The compiled user filters
    pub fn filter(&self) -> &UrlFilter {
        &self.filter
    }

    /// Offers a canonical URL for fetching
    ///
    /// # Admission Rules (in order)
    ///
    /// 1. Frontier closed → `Closed`
    /// 2. Already admitted once → `AlreadyVisited` (the first depth wins)
    /// 3. Not in scope (off-scope subdomains pass only when explicitly included) → `OutOfScope`
    /// 4. Deeper than `max_depth` → `TooDeep`
    /// 5. `max_urls` already admitted → `LimitReached`
    /// 6. Depth > 0 and rejected by include/exclude → `Filtered`
    /// 7. Depth > 0 and ignored extension → `IgnoredExtension`
    ///
    /// The entry URL (depth 0) bypasses the user filters so the chosen target is
    /// always fetched. The visited check and insertion happen under one lock, so a
    /// URL is admitted at most once no matter how many workers offer it.
    pub fn offer(&self, entry: FrontierEntry) -> Admission {
        let key = entry.url.as_str().to_string();
        let mut inner = self.lock();

        if inner.closed {
            return Admission::Closed;
        }

        if inner.visited.contains(&key) {
            return Admission::AlreadyVisited;
        }

        match classify(&entry.url, &self.target) {
            ScopeClass::InScope => {}
            ScopeClass::OffScopeSubdomain if self.filter.explicitly_included(&entry.url) => {}
            class => return Admission::OutOfScope(class),
        }

        if entry.depth > self.max_depth {
            return Admission::TooDeep;
        }

        if inner.admitted >= self.max_urls {
            if !inner.limit_logged {
                inner.limit_logged = true;
                tracing::info!("URL limit of {} reached, no further URLs admitted", self.max_urls);
            }
            return Admission::LimitReached;
        }

        if entry.depth > 0 {
            match self.filter.check(&entry.url) {
                FilterVerdict::Pass => {}
                FilterVerdict::Excluded => return Admission::Filtered,
                FilterVerdict::IgnoredExtension => return Admission::IgnoredExtension,
            }
        }

        inner.visited.insert(key);
        inner.admitted += 1;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.queue.push(QueuedEntry { entry, seq });
        drop(inner);

        self.notify.notify_one();
        Admission::Admitted
    }

    /// Marks a URL as visited without queueing it
    ///
    /// Used for redirect targets that were fetched under another URL. Returns true
    /// if the URL was not yet known.
    pub fn mark_visited(&self, url: &Url) -> bool {
        self.lock().visited.insert(url.as_str().to_string())
    }

    /// Returns true if the URL has been admitted or marked
    pub fn is_visited(&self, url: &Url) -> bool {
        self.lock().visited.contains(url.as_str())
    }

    /// Waits for the next entry
    ///
    /// # Returns
    ///
    /// * `Some((entry, guard))` - The shallowest queued entry; drop the guard when done
    /// * `None` - The frontier is closed, or drained (empty with nothing in flight)
    pub async fn take(self: &Arc<Self>) -> Option<(FrontierEntry, InFlight)> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking state so no wakeup is missed
            notified.as_mut().enable();

            {
                let mut inner = self.lock();
                if inner.closed {
                    return None;
                }

                if let Some(queued) = inner.queue.pop() {
                    inner.in_flight += 1;
                    return Some((
                        queued.entry,
                        InFlight {
                            frontier: Arc::clone(self),
                        },
                    ));
                }

                if inner.in_flight == 0 {
                    drop(inner);
                    self.notify.notify_waiters();
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Registers outside work that may still offer URLs
    ///
    /// The frontier does not drain while the returned guard is alive.
    pub fn hold(self: &Arc<Self>) -> InFlight {
        self.lock().in_flight += 1;
        InFlight {
            frontier: Arc::clone(self),
        }
    }

    fn complete(&self) {
        let drained = {
            let mut inner = self.lock();
            inner.in_flight = inner.in_flight.saturating_sub(1);
            inner.in_flight == 0 && inner.queue.is_empty()
        };

        if drained {
            self.notify.notify_waiters();
        }
    }

    /// Forces a drain
    ///
    /// Queued entries are abandoned and further offers are refused. Work already in
    /// flight finishes normally.
    pub fn close(&self) {
        let abandoned = {
            let mut inner = self.lock();
            if inner.closed {
                return;
            }
            inner.closed = true;
            let abandoned = inner.queue.len();
            inner.queue.clear();
            abandoned
        };

        tracing::info!("Frontier closed, {} queued URLs abandoned", abandoned);
        self.closed_signal.send_replace(true);
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Resolves once the frontier has been closed
    pub async fn closed(&self) {
        let mut closed = self.closed_signal.subscribe();
        // The sender lives as long as the frontier, so this only ends on close
        let _ = closed.wait_for(|closed| *closed).await;
    }

    /// Number of URLs admitted over the whole run
    pub fn admitted(&self) -> u64 {
        self.lock().admitted
    }

    /// Number of entries waiting to be taken
    pub fn queued(&self) -> usize {
        self.lock().queue.len()
    }
}
