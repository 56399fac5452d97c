//! Crawler module for fetching, scheduling and coordination
//!
//! This module contains the core crawling logic, including:
//! - Transport and render capabilities, with the reqwest-backed default transport
//! - The depth-ordered frontier with admission control
//! - Per-host politeness (robots.txt, crawl delay, concurrency)
//! - Shared crawl state and the candidate intake
//! - The worker pool and overall crawl coordination

mod context;
mod coordinator;
mod executor;
mod fetcher;
mod frontier;
mod politeness;
mod report;

pub use context::{CrawlState, Origin};
pub use coordinator::{run_crawl, Coordinator, ShutdownHandle};
pub use executor::Executor;
pub use fetcher::{
    build_http_client, FetchedResponse, HttpTransport, RenderBackend, RenderedPage, Transport,
    MAX_REDIRECTS,
};
pub use frontier::{Admission, Frontier, FrontierEntry, InFlight};
pub use politeness::{HostPermit, Politeness};
pub use report::CrawlReport;
