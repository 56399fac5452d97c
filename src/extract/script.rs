//! Heuristic URL recovery from JavaScript
//!
//! Scripts are scanned with regular expressions, not parsed. Each pattern targets
//! a quoted string in a known position (network call argument, socket constructor,
//! bare path literal). Values that look like templates are discarded.

use super::{Discovery, LinkHint};
use crate::artifacts::{is_api_shaped, is_graphql_path};
use crate::url::{canonicalize, canonicalize_endpoint};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

/// Longest string literal considered a URL
const MAX_LITERAL_LEN: usize = 500;

/// Quoted absolute URL or path literal
static QUOTED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"["'`]((?:[a-zA-Z]{1,10}://|//)[^"'`\s/]+\.[a-zA-Z]{2,}[^"'`\s]*|(?:/|\.\./|\./)[a-zA-Z0-9\-_./?=&%~:+@]{2,})["'`]"#,
    )
    .expect("hardcoded regex pattern is valid")
});

/// fetch / axios / jQuery / dynamic import call with a literal first argument
static NETWORK_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:\b(fetch|axios(?:\.[a-z]+)?|importScripts|import)|\$\.(get|post|ajax|getJSON))\s*\(\s*(?:\{\s*url\s*:\s*)?["'`]([^"'`\s]+)["'`]"#,
    )
    .expect("hardcoded regex pattern is valid")
});

/// XMLHttpRequest.open(method, url)
static XHR_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\.open\(\s*["'](?:get|post|put|patch|delete|head|options)["']\s*,\s*["'`]([^"'`\s]+)["'`]"#)
        .expect("hardcoded regex pattern is valid")
});

static WEBSOCKET_CTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"new\s+WebSocket\s*\(\s*["'`]([^"'`\s]+)["'`]"#)
        .expect("hardcoded regex pattern is valid")
});

static WEBSOCKET_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["'`](wss?://[^"'`\s]+)["'`]"#).expect("hardcoded regex pattern is valid")
});

static EVENT_SOURCE_CTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"new\s+EventSource\s*\(\s*["'`]([^"'`\s]+)["'`]"#)
        .expect("hardcoded regex pattern is valid")
});

static SOURCE_MAPPING_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?://|/\*)\s*[#@]\s*sourceMappingURL\s*=\s*([^\s*]+)")
        .expect("hardcoded regex pattern is valid")
});

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}")
        .expect("hardcoded regex pattern is valid")
});

/// Email-shaped strings that are really asset names (e.g. `logo@2x.png`)
const ASSET_SUFFIXES: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".css", ".js",
];

/// Extracts URL candidates and endpoints from a script body
///
/// # Patterns
///
/// - `fetch(...)`, `axios(...)`, `axios.get(...)`, `$.ajax(...)`, `xhr.open(m, ...)` → API calls
/// - `import(...)` / `importScripts(...)` → scripts
/// - `new WebSocket(...)` and `ws://` / `wss://` literals → socket endpoints
/// - `new EventSource(...)` → server-sent event endpoints
/// - `//# sourceMappingURL=` → source map
/// - Any other quoted absolute URL or `/`, `./`, `../` path literal
///
/// # Arguments
///
/// * `source` - The script text
/// * `base` - URL relative references resolve against
pub fn extract_script(source: &str, base: &Url) -> Vec<Discovery> {
    let mut discoveries = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for caps in NETWORK_CALL.captures_iter(source) {
        let Some(value) = caps.get(3).map(|m| m.as_str()) else {
            continue;
        };
        let (hint, context) = match caps.get(1).map(|m| m.as_str()) {
            Some("import") | Some("importScripts") => (LinkHint::Script, "script:import"),
            Some(f) if f.starts_with("axios") => (LinkHint::Api, "script:axios"),
            Some(_) => (LinkHint::Api, "script:fetch"),
            None => (LinkHint::Api, "script:jquery"),
        };
        push_candidate(&mut discoveries, &mut seen, value, base, hint, context);
    }

    for caps in XHR_OPEN.captures_iter(source) {
        if let Some(value) = caps.get(1) {
            push_candidate(&mut discoveries, &mut seen, value.as_str(), base, LinkHint::Api, "script:xhr");
        }
    }

    for caps in EVENT_SOURCE_CTOR.captures_iter(source) {
        if let Some(value) = caps.get(1) {
            push_candidate(
                &mut discoveries,
                &mut seen,
                value.as_str(),
                base,
                LinkHint::EventStream,
                "script:eventsource",
            );
        }
    }

    let sockets = WEBSOCKET_CTOR
        .captures_iter(source)
        .chain(WEBSOCKET_LITERAL.captures_iter(source));
    for caps in sockets {
        let Some(value) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        if !is_plausible_literal(value) {
            continue;
        }
        if let Ok(url) = canonicalize_endpoint(value, &websocket_base(base)) {
            if seen.insert(url.to_string()) {
                discoveries.push(Discovery::Link {
                    url,
                    hint: LinkHint::WebSocket,
                    context: "script:websocket",
                });
            }
        }
    }

    for caps in SOURCE_MAPPING_URL.captures_iter(source) {
        let Some(value) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        // Inline maps carry no fetchable location
        if value.starts_with("data:") {
            continue;
        }
        if let Ok(url) = canonicalize(value, base) {
            discoveries.push(Discovery::SourceMap(url));
        }
    }

    for caps in QUOTED_URL.captures_iter(source) {
        let Some(value) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        let Ok(url) = canonicalize(value, base) else {
            continue;
        };
        let hint = literal_hint(&url);
        push_url(&mut discoveries, &mut seen, url, value, hint, "script:literal");
    }

    discoveries
}

/// Extracts email addresses from arbitrary text
pub fn extract_emails(text: &str) -> Vec<Discovery> {
    let mut seen = HashSet::new();

    EMAIL
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches('.').to_ascii_lowercase())
        .filter(|email| !ASSET_SUFFIXES.iter().any(|s| email.ends_with(s)))
        .filter(|email| seen.insert(email.clone()))
        .map(Discovery::Email)
        .collect()
}

fn push_candidate(
    discoveries: &mut Vec<Discovery>,
    seen: &mut HashSet<String>,
    value: &str,
    base: &Url,
    hint: LinkHint,
    context: &'static str,
) {
    if let Ok(url) = canonicalize(value, base) {
        // A network call to a GraphQL path is a GraphQL endpoint
        let hint = if hint == LinkHint::Api && is_graphql_path(&url.path().to_ascii_lowercase()) {
            LinkHint::GraphQl
        } else {
            hint
        };
        push_url(discoveries, seen, url, value, hint, context);
    }
}

fn push_url(
    discoveries: &mut Vec<Discovery>,
    seen: &mut HashSet<String>,
    url: Url,
    raw: &str,
    hint: LinkHint,
    context: &'static str,
) {
    if !is_plausible_literal(raw) || !seen.insert(url.to_string()) {
        return;
    }
    discoveries.push(Discovery::Link { url, hint, context });
}

/// Rejects template fragments and oversized strings
fn is_plausible_literal(value: &str) -> bool {
    value.len() <= MAX_LITERAL_LEN
        && !value.contains('{')
        && !value.contains("${")
        && !value.chars().any(char::is_whitespace)
}

/// Hint for a bare literal, by URL shape
fn literal_hint(url: &Url) -> LinkHint {
    let path = url.path().to_ascii_lowercase();
    if is_graphql_path(&path) {
        LinkHint::GraphQl
    } else if is_api_shaped(url, &path) {
        LinkHint::Api
    } else if path.ends_with(".js") || path.ends_with(".mjs") {
        LinkHint::Script
    } else {
        LinkHint::Navigation
    }
}

/// Relative socket paths resolve against the page origin with a socket scheme
fn websocket_base(base: &Url) -> Url {
    let mut socket_base = base.clone();
    let scheme = if base.scheme() == "https" { "wss" } else { "ws" };
    // Switching between special schemes is always permitted
    let _ = socket_base.set_scheme(scheme);
    socket_base
}
