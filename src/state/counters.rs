use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Run-wide counters shared by every worker
#[derive(Debug, Default)]
pub struct CrawlCounters {
    processed: AtomicU64,
    failed: AtomicU64,
    disallowed: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub processed: u64,
    pub failed: u64,
    pub disallowed: u64,
}

impl CrawlCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed fetch; returns the new processed total
    pub fn record_processed(&self) -> u64 {
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Records a transport failure
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a URL withheld by robots.txt
    pub fn record_disallowed(&self) {
        self.disallowed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            disallowed: self.disallowed.load(Ordering::Relaxed),
        }
    }
}
