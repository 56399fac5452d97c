//! Extraction pipeline
//!
//! Turns a fetched response into discovery events. Extractors are pure functions
//! of (bytes, content type, URL); malformed input yields fewer events, never an
//! error.
//!
//! # Components
//!
//! - `html`: link-bearing attributes, forms, inline scripts, embedded route data
//! - `script`: heuristic URL and endpoint recovery from JavaScript
//! - `sourcemap`: original source paths from source maps
//! - `sitemap`: XML sitemap URLs and nested sitemap references
//! - `headers`: `Link` and `SourceMap` response headers

pub mod headers;
pub mod html;
pub mod script;
pub mod sitemap;
pub mod sourcemap;

use crate::artifacts::FormRecord;
use crate::crawler::FetchedResponse;
use url::Url;

pub use html::{extract_html, looks_like_app_shell};
pub use script::{extract_emails, extract_script};
pub use sitemap::{parse_sitemap, SitemapDocument};
pub use sourcemap::parse_source_map;

/// How a URL was referenced, which drives bucketing and whether it is followed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkHint {
    /// Anchor, frame or meta refresh
    Navigation,
    /// `<link rel="canonical">`
    Canonical,
    /// Script source or dynamic import
    Script,
    /// Image, stylesheet, icon or media
    Resource,
    /// Preload / prefetch hint
    Preload,
    /// Form action
    Form,
    /// Target of a network call (fetch, XHR, axios, jQuery)
    Api,
    /// OpenAPI / Swagger description
    ApiDescription,
    /// GraphQL endpoint
    GraphQl,
    /// WebSocket endpoint
    WebSocket,
    /// Server-sent events endpoint
    EventStream,
    /// Web app manifest
    Manifest,
    /// Listed in a sitemap
    Sitemap,
}

impl LinkHint {
    /// Returns true if URLs with this hint are offered to the frontier
    pub fn is_followable(&self) -> bool {
        !matches!(
            self,
            Self::ApiDescription | Self::GraphQl | Self::WebSocket | Self::EventStream | Self::Manifest
        )
    }

    /// Returns true if URLs with this hint are recorded even when external
    pub fn is_artifact(&self) -> bool {
        matches!(
            self,
            Self::Api
                | Self::ApiDescription
                | Self::GraphQl
                | Self::WebSocket
                | Self::EventStream
                | Self::Manifest
        )
    }
}

/// A single discovery event
#[derive(Debug, Clone, PartialEq)]
pub enum Discovery {
    /// A canonical URL candidate
    Link {
        url: Url,
        hint: LinkHint,
        /// Where in the document it was found (e.g. `a[href]`, `script:fetch`)
        context: &'static str,
    },
    /// A form with its inputs
    Form(FormRecord),
    /// A source map to fetch
    SourceMap(Url),
    /// An original source path recovered from a source map
    SourceFile(String),
    /// An email address
    Email(String),
    /// A client-side application route, as an absolute URL
    AppRoute(String),
}

/// Content type after sniffing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Script,
    Json,
    SourceMap,
    Xml,
    EventStream,
    Other,
}

impl ContentKind {
    /// Determines how a body should be processed
    ///
    /// The Content-Type header wins when it is specific; generic types fall back to
    /// the URL extension and finally to the first bytes of the body.
    pub fn sniff(content_type: Option<&str>, url: &Url, body: &[u8]) -> Self {
        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();
        let path = url.path().to_ascii_lowercase();

        if mime.contains("html") {
            return Self::Html;
        }
        if mime.contains("javascript") || mime.contains("ecmascript") {
            return Self::Script;
        }
        if mime == "text/event-stream" {
            return Self::EventStream;
        }
        if mime.contains("json") {
            return if path.ends_with(".map") {
                Self::SourceMap
            } else {
                Self::Json
            };
        }
        if mime.contains("xml") {
            return Self::Xml;
        }

        let generic = mime.is_empty()
            || mime == "text/plain"
            || mime == "application/octet-stream"
            || mime == "binary/octet-stream";
        if !generic {
            return Self::Other;
        }

        if path.ends_with(".js") || path.ends_with(".mjs") {
            return Self::Script;
        }
        if path.ends_with(".map") {
            return Self::SourceMap;
        }
        if path.ends_with(".json") {
            return Self::Json;
        }
        if path.ends_with(".xml") {
            return Self::Xml;
        }

        let head = String::from_utf8_lossy(&body[..body.len().min(256)])
            .trim_start()
            .to_ascii_lowercase();
        if head.starts_with("<!doctype html") || head.starts_with("<html") {
            Self::Html
        } else if head.starts_with("<?xml") || head.starts_with("<urlset") || head.starts_with("<sitemapindex") {
            Self::Xml
        } else {
            Self::Other
        }
    }
}

/// Runs every applicable extractor over a response
///
/// Relative references resolve against the final URL.
pub fn extract_response(response: &FetchedResponse) -> Vec<Discovery> {
    let base = &response.final_url;
    let mut discoveries = headers::extract_headers(&response.headers, base);

    match ContentKind::sniff(response.content_type(), base, &response.body) {
        ContentKind::Html => {
            let text = response.text();
            discoveries.extend(extract_html(&text, base));
            discoveries.extend(extract_emails(&text));
        }
        ContentKind::Script | ContentKind::Json => {
            let text = response.text();
            discoveries.extend(extract_script(&text, base));
            discoveries.extend(extract_emails(&text));
        }
        ContentKind::SourceMap => {
            discoveries.extend(
                parse_source_map(&response.body)
                    .into_iter()
                    .map(Discovery::SourceFile),
            );
        }
        ContentKind::Xml => {
            let document = parse_sitemap(&response.body);
            discoveries.extend(document.into_links());
        }
        ContentKind::EventStream | ContentKind::Other => {}
    }

    discoveries
}
