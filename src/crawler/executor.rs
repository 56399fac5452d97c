//! Fetch executor: the worker pool
//!
//! Each worker repeatedly takes the next frontier entry, waits for politeness,
//! fetches (or renders) it, runs extraction and hands every discovery back to the
//! shared intake. Workers exit when the frontier drains or is closed.

use super::context::{CrawlState, Origin};
use super::fetcher::{FetchedResponse, RenderBackend};
use super::frontier::FrontierEntry;
use crate::artifacts::{categorize, response_category};
use crate::extract::{extract_html, extract_response, looks_like_app_shell, ContentKind, Discovery, LinkHint};
use crate::url::{canonicalize_absolute, canonicalize_endpoint, classify, ScopeClass};
use crate::TransportError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use url::Url;

/// A progress line is logged every this many processed entries
const PROGRESS_INTERVAL: u64 = 25;

/// What happened to a taken entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    Fetched,
    Skipped,
}

/// Runs the worker pool over a crawl state
pub struct Executor {
    state: Arc<CrawlState>,
    render: Option<Arc<dyn RenderBackend>>,
    render_timeout: Duration,
}

impl Executor {
    pub fn new(
        state: Arc<CrawlState>,
        render: Option<Arc<dyn RenderBackend>>,
        render_timeout: Duration,
    ) -> Self {
        Self {
            state,
            render,
            render_timeout,
        }
    }

    /// Runs `workers` tasks until the frontier drains or is closed
    pub async fn run(&self, workers: usize) {
        let workers = workers.max(1);
        tracing::info!("Starting {} workers", workers);

        let mut tasks = JoinSet::new();
        for id in 0..workers {
            let state = Arc::clone(&self.state);
            let render = self.render.clone();
            let render_timeout = self.render_timeout;
            tasks.spawn(async move { worker_loop(id, state, render, render_timeout).await });
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!("Worker task failed: {}", e);
            }
        }
    }
}

async fn worker_loop(
    id: usize,
    state: Arc<CrawlState>,
    render: Option<Arc<dyn RenderBackend>>,
    render_timeout: Duration,
) {
    while let Some((entry, _in_flight)) = state.frontier.take().await {
        match process_entry(&state, render.as_deref(), render_timeout, &entry).await {
            Ok(EntryOutcome::Fetched) => {
                let processed = state.counters.record_processed();
                if processed % PROGRESS_INTERVAL == 0 {
                    tracing::info!(
                        "Progress: {} processed, {} queued, {} admitted",
                        processed,
                        state.frontier.queued(),
                        state.frontier.admitted()
                    );
                }
            }
            Ok(EntryOutcome::Skipped) => {}
            Err(e) => {
                state.counters.record_failed();
                tracing::warn!("Failed to fetch {}: {}", entry.url, e);
            }
        }
    }

    tracing::debug!("Worker {} finished", id);
}

/// Fetches one entry and ingests everything found in it
///
/// # Flow
///
/// 1. robots.txt re-check (the entry URL is never pre-checked)
/// 2. Host permit, then fetch; a drain that starts before the permit skips the entry
/// 3. Record the entry URL and any response-implied bucket
/// 4. Redirects: in-scope targets are marked visited; off-scope targets end here
/// 5. Extraction, plus rendering for application shells when a backend is set
/// 6. Every discovery goes through the shared intake
async fn process_entry(
    state: &CrawlState,
    render: Option<&dyn RenderBackend>,
    render_timeout: Duration,
    entry: &FrontierEntry,
) -> Result<EntryOutcome, TransportError> {
    let url = &entry.url;

    if !state.politeness.allowed(url).await {
        state.note_disallowed(url);
        return Ok(EntryOutcome::Skipped);
    }

    let response = {
        let Some(_permit) = state.host_permit(url).await else {
            return Ok(EntryOutcome::Skipped);
        };
        state.transport.fetch(url, state.request_timeout).await?
    };

    tracing::debug!(
        "Fetched {} ({}, {} bytes)",
        url,
        response.status,
        response.body.len()
    );

    let source = entry.discovered_from.as_ref().unwrap_or(url).as_str();
    if entry.discovered_from.is_none() {
        state.record_url(url, LinkHint::Navigation, source, "entry");
    }
    if let Some(category) = response_category(response.content_type()) {
        state.registry.record(category, url.as_str(), source, "response");
    }

    let final_url = canonicalize_absolute(response.final_url.as_str())
        .unwrap_or_else(|_| response.final_url.clone());
    if final_url != *url {
        let followed = match classify(&final_url, &state.target) {
            ScopeClass::InScope => true,
            ScopeClass::OffScopeSubdomain => state.frontier.filter().explicitly_included(&final_url),
            ScopeClass::External => false,
        };
        if !followed {
            tracing::info!("{} redirected off scope to {}, not extracting", url, final_url);
            return Ok(EntryOutcome::Fetched);
        }

        state.frontier.mark_visited(&final_url);
        state.record_url(&final_url, LinkHint::Navigation, url.as_str(), "redirect");
    }

    let mut discoveries = extract_response(&response);
    if let Some(render) = render {
        discoveries.extend(render_shell(state, render, render_timeout, &response, &final_url).await);
    }

    let origin = Origin {
        url: &final_url,
        depth: entry.depth,
    };
    for discovery in discoveries {
        state.ingest(discovery, origin).await;
    }

    Ok(EntryOutcome::Fetched)
}

/// Renders application shells and extracts from the final DOM and its requests
///
/// Static pages, non-HTML responses and render failures yield nothing extra.
async fn render_shell(
    state: &CrawlState,
    render: &dyn RenderBackend,
    render_timeout: Duration,
    response: &FetchedResponse,
    page_url: &Url,
) -> Vec<Discovery> {
    let kind = ContentKind::sniff(response.content_type(), page_url, &response.body);
    if kind != ContentKind::Html || !looks_like_app_shell(&response.text()) {
        return Vec::new();
    }

    let Some(_permit) = state.host_permit(page_url).await else {
        return Vec::new();
    };

    tracing::debug!("Rendering application shell {}", page_url);
    match render.render(page_url, render_timeout).await {
        Ok(page) => {
            let mut discoveries = extract_html(&page.final_dom, page_url);
            discoveries.extend(
                page.subresources
                    .iter()
                    .filter_map(|raw| canonicalize_endpoint(raw, page_url).ok())
                    .map(|url| {
                        let hint = subresource_hint(&url);
                        Discovery::Link {
                            url,
                            hint,
                            context: "render:subresource",
                        }
                    }),
            );
            discoveries
        }
        Err(e) => {
            tracing::warn!("Render failed for {}, using raw response: {}", page_url, e);
            Vec::new()
        }
    }
}

/// Hint for a request observed during rendering
fn subresource_hint(url: &Url) -> LinkHint {
    if matches!(url.scheme(), "ws" | "wss") {
        return LinkHint::WebSocket;
    }
    match categorize(url, LinkHint::Resource) {
        crate::ArtifactCategory::GraphqlEndpoints => LinkHint::GraphQl,
        crate::ArtifactCategory::ApiEndpoints => LinkHint::Api,
        crate::ArtifactCategory::OpenapiDocs => LinkHint::ApiDescription,
        _ => LinkHint::Resource,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_subresource_hint() {
        assert_eq!(subresource_hint(&url("wss://example.com/socket")), LinkHint::WebSocket);
        assert_eq!(subresource_hint(&url("https://example.com/api/me")), LinkHint::Api);
        assert_eq!(subresource_hint(&url("https://example.com/graphql")), LinkHint::GraphQl);
        assert_eq!(subresource_hint(&url("https://example.com/swagger.json")), LinkHint::ApiDescription);
        assert_eq!(subresource_hint(&url("https://example.com/logo.png")), LinkHint::Resource);
    }
}
