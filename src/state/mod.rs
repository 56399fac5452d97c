//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `HostState`: per-host politeness record (last fetch, in-flight count, crawl-delay, robots rules)
//! - `CrawlCounters`: processed / failed / disallowed totals shared by all workers

mod counters;
mod host_state;

// Re-export main types
pub use counters::{CounterSnapshot, CrawlCounters};
pub use host_state::HostState;
