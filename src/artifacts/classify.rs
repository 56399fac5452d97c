//! Bucketing rules for discovered URLs

use super::ArtifactCategory;
use crate::extract::LinkHint;
use crate::url::path_extension;
use url::Url;

/// Extensions that denote server-rendered pages rather than files
const PAGE_EXTENSIONS: &[&str] = &[
    ".html", ".htm", ".xhtml", ".php", ".asp", ".aspx", ".jsp", ".jspx", ".cfm", ".cgi", ".shtml",
];

/// Path markers of OpenAPI / Swagger descriptions
const OPENAPI_MARKERS: &[&str] = &[
    "swagger.json",
    "swagger.yaml",
    "swagger-ui",
    "openapi.json",
    "openapi.yaml",
    "openapi.yml",
    "api-docs",
];

/// Picks the bucket for a discovered URL
///
/// # Rules (first match wins)
///
/// 1. `ws` / `wss` scheme or WebSocket hint → `websocket_endpoints`
/// 2. EventSource hint → `sse_endpoints`
/// 3. Manifest hint → `manifests`
/// 4. GraphQL hint or `graphql` / `/gql` in the path → `graphql_endpoints`
/// 5. OpenAPI hint or a known description path → `openapi_docs`
/// 6. Network-call hint or an API-shaped path (`/api/`, `/v1/`, `.json`, `api.` host) → `api_endpoints`
/// 7. Trailing slash (other than the root) → `directories`
/// 8. A non-page extension → `files`
/// 9. Everything else → `pages`
pub fn categorize(url: &Url, hint: LinkHint) -> ArtifactCategory {
    if matches!(url.scheme(), "ws" | "wss") || hint == LinkHint::WebSocket {
        return ArtifactCategory::WebsocketEndpoints;
    }
    if hint == LinkHint::EventStream {
        return ArtifactCategory::SseEndpoints;
    }
    if hint == LinkHint::Manifest {
        return ArtifactCategory::Manifests;
    }

    let path = url.path().to_ascii_lowercase();

    if hint == LinkHint::GraphQl || is_graphql_path(&path) {
        return ArtifactCategory::GraphqlEndpoints;
    }
    if hint == LinkHint::ApiDescription || OPENAPI_MARKERS.iter().any(|m| path.contains(m)) {
        return ArtifactCategory::OpenapiDocs;
    }
    if hint == LinkHint::Api || is_api_shaped(url, &path) {
        return ArtifactCategory::ApiEndpoints;
    }
    if path.len() > 1 && path.ends_with('/') {
        return ArtifactCategory::Directories;
    }

    match path_extension(url) {
        Some(ext) if !PAGE_EXTENSIONS.contains(&ext.as_str()) => ArtifactCategory::Files,
        _ => ArtifactCategory::Pages,
    }
}

/// Bucket implied by a response's Content-Type, if any
pub fn response_category(content_type: Option<&str>) -> Option<ArtifactCategory> {
    let mime = content_type?.split(';').next()?.trim().to_ascii_lowercase();
    if mime == "text/event-stream" {
        Some(ArtifactCategory::SseEndpoints)
    } else if mime == "application/json" || mime.ends_with("+json") {
        Some(ArtifactCategory::ApiEndpoints)
    } else {
        None
    }
}

/// Returns true if the path names a GraphQL endpoint
pub(crate) fn is_graphql_path(path: &str) -> bool {
    path.contains("graphql") || path.ends_with("/gql") || path.contains("/gql/")
}

/// Returns true if the URL looks like a programmatic endpoint
pub(crate) fn is_api_shaped(url: &Url, path: &str) -> bool {
    if path.contains("/api/") || path.ends_with("/api") || path.contains("/rest/") {
        return true;
    }
    if path.ends_with(".json") {
        return true;
    }
    if url.host_str().is_some_and(|h| h.starts_with("api.")) {
        return true;
    }

    // Versioned segment such as /v1/ or /v2
    path.split('/').any(|segment| {
        segment.len() > 1
            && segment.starts_with('v')
            && segment[1..].chars().all(|c| c.is_ascii_digit())
    })
}
