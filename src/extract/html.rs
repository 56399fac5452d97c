//! HTML extraction
//!
//! This module handles parsing HTML content to extract:
//! - Link-bearing attributes (anchors, scripts, media, frames, link relations)
//! - Forms and their named controls
//! - URLs inside inline scripts
//! - Client-side routes from embedded Next.js page data

use super::script::extract_script;
use super::{Discovery, LinkHint};
use crate::artifacts::{FormInput, FormRecord};
use crate::url::canonicalize;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Attribute sources for link candidates: (selector, attribute, hint, context)
const LINK_ATTRIBUTES: &[(&str, &str, LinkHint, &str)] = &[
    ("a[href]", "href", LinkHint::Navigation, "a[href]"),
    ("area[href]", "href", LinkHint::Navigation, "area[href]"),
    ("script[src]", "src", LinkHint::Script, "script[src]"),
    ("img[src]", "src", LinkHint::Resource, "img[src]"),
    ("iframe[src]", "src", LinkHint::Navigation, "iframe[src]"),
    ("frame[src]", "src", LinkHint::Navigation, "frame[src]"),
    ("source[src]", "src", LinkHint::Resource, "source[src]"),
    ("video[src]", "src", LinkHint::Resource, "video[src]"),
    ("audio[src]", "src", LinkHint::Resource, "audio[src]"),
    ("embed[src]", "src", LinkHint::Resource, "embed[src]"),
    ("object[data]", "data", LinkHint::Resource, "object[data]"),
];

/// Parses HTML content and extracts discovery events
///
/// # Extraction Rules
///
/// - Relative references resolve against `<base href>` when present, else the page URL
/// - Fragment-only references and non-http(s) schemes are dropped
/// - `<a download>` targets are still recorded, they simply point at files
/// - `<link>` elements are hinted by their `rel`
/// - `srcset` candidates contribute one URL each
/// - `<meta http-equiv="refresh">` targets are followed
/// - Forms default to GET and to the page URL as action
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `page_url` - The canonical URL of the page
///
/// # Returns
///
/// Every discovery event found in the document
///
/// # Example
///
/// ```
/// use surface_ripple::extract::{extract_html, Discovery};
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page">Link</a></body></html>"#;
/// let page = Url::parse("https://example.com/").unwrap();
/// let events = extract_html(html, &page);
/// assert!(matches!(&events[0], Discovery::Link { url, .. } if url.path() == "/page"));
/// ```
pub fn extract_html(html: &str, page_url: &Url) -> Vec<Discovery> {
    let document = Html::parse_document(html);
    let base = document_base(&document, page_url);
    let mut discoveries = Vec::new();

    for (selector, attribute, hint, context) in LINK_ATTRIBUTES {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        for element in document.select(&selector) {
            if let Some(value) = element.value().attr(attribute) {
                push_link(&mut discoveries, value, &base, *hint, *context);
            }
        }
    }

    extract_link_relations(&document, &base, &mut discoveries);
    extract_srcsets(&document, &base, &mut discoveries);
    extract_meta_refresh(&document, &base, &mut discoveries);
    extract_forms(&document, &base, page_url, &mut discoveries);
    extract_inline_scripts(&document, &base, &mut discoveries);

    discoveries
}

/// Heuristically detects a JavaScript application shell
///
/// A shell has almost no visible text or anchors but mounts an application root
/// or ships a framework bundle. Only such pages are handed to a render backend.
pub fn looks_like_app_shell(html: &str) -> bool {
    let document = Html::parse_document(html);

    let anchors = Selector::parse("a[href]")
        .map(|s| document.select(&s).count())
        .unwrap_or(0);
    if anchors > 3 {
        return false;
    }

    let has_mount_point = Selector::parse("#root, #app, #__next, #__nuxt, [data-reactroot], app-root")
        .map(|s| document.select(&s).next().is_some())
        .unwrap_or(false);

    let visible_text: usize = Selector::parse("body")
        .ok()
        .and_then(|s| document.select(&s).next())
        .map(|body| {
            body.text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::len)
                .sum()
        })
        .unwrap_or(0);

    let script_heavy = Selector::parse("script[src]")
        .map(|s| document.select(&s).count() > 0)
        .unwrap_or(false);

    has_mount_point && script_heavy && visible_text < 200
}

fn document_base(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|s| {
            document
                .select(&s)
                .next()
                .and_then(|e| e.value().attr("href"))
                .and_then(|href| canonicalize(href, page_url).ok())
        })
        .unwrap_or_else(|| page_url.clone())
}

fn push_link(
    discoveries: &mut Vec<Discovery>,
    raw: &str,
    base: &Url,
    hint: LinkHint,
    context: &'static str,
) {
    let raw = raw.trim();

    // Same-page anchors
    if raw.is_empty() || raw.starts_with('#') {
        return;
    }

    if let Ok(url) = canonicalize(raw, base) {
        discoveries.push(Discovery::Link { url, hint, context });
    }
}

fn extract_link_relations(document: &Html, base: &Url, discoveries: &mut Vec<Discovery>) {
    let Ok(selector) = Selector::parse("link[href]") else {
        return;
    };

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let rel = element.value().attr("rel").unwrap_or_default().to_ascii_lowercase();
        let (hint, context) = link_rel_hint(&rel);
        push_link(discoveries, href, base, hint, context);
    }
}

/// Maps a `rel` attribute to a hint
pub(crate) fn link_rel_hint(rel: &str) -> (LinkHint, &'static str) {
    let rels: Vec<&str> = rel.split_whitespace().collect();
    let has = |name: &str| rels.iter().any(|r| r.eq_ignore_ascii_case(name));

    if has("canonical") {
        (LinkHint::Canonical, "link[canonical]")
    } else if has("manifest") {
        (LinkHint::Manifest, "link[manifest]")
    } else if has("service-desc") || has("describedby") {
        (LinkHint::ApiDescription, "link[service-desc]")
    } else if has("service") || has("api") {
        (LinkHint::Api, "link[service]")
    } else if has("modulepreload") || has("preload") || has("prefetch") || has("dns-prefetch") {
        (LinkHint::Preload, "link[preload]")
    } else if has("alternate") || has("next") || has("prev") {
        (LinkHint::Navigation, "link[alternate]")
    } else {
        (LinkHint::Resource, "link[href]")
    }
}

fn extract_srcsets(document: &Html, base: &Url, discoveries: &mut Vec<Discovery>) {
    let Ok(selector) = Selector::parse("img[srcset], source[srcset]") else {
        return;
    };

    for element in document.select(&selector) {
        let Some(srcset) = element.value().attr("srcset") else {
            continue;
        };
        for candidate in srcset.split(',') {
            if let Some(src) = candidate.split_whitespace().next() {
                push_link(discoveries, src, base, LinkHint::Resource, "srcset");
            }
        }
    }
}

fn extract_meta_refresh(document: &Html, base: &Url, discoveries: &mut Vec<Discovery>) {
    let Ok(selector) = Selector::parse("meta[http-equiv][content]") else {
        return;
    };

    for element in document.select(&selector) {
        let is_refresh = element
            .value()
            .attr("http-equiv")
            .is_some_and(|v| v.eq_ignore_ascii_case("refresh"));
        if !is_refresh {
            continue;
        }

        let content = element.value().attr("content").unwrap_or_default();
        // content="5; url=/next"
        let target = content.split(';').skip(1).find_map(|part| {
            let part = part.trim();
            let (key, value) = part.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("url")
                .then(|| value.trim().trim_matches(|c| c == '\'' || c == '"'))
        });

        if let Some(target) = target {
            push_link(discoveries, target, base, LinkHint::Navigation, "meta[refresh]");
        }
    }
}

fn extract_forms(document: &Html, base: &Url, page_url: &Url, discoveries: &mut Vec<Discovery>) {
    let (Ok(form_selector), Ok(control_selector)) = (
        Selector::parse("form"),
        Selector::parse("input[name], select[name], textarea[name], button[name]"),
    ) else {
        return;
    };

    for form in document.select(&form_selector) {
        let method = form
            .value()
            .attr("method")
            .map(|m| m.trim().to_ascii_uppercase())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "GET".to_string());

        let action = match form.value().attr("action").map(str::trim) {
            Some(action) if !action.is_empty() => match canonicalize(action, base) {
                Ok(url) => url,
                Err(_) => continue,
            },
            _ => page_url.clone(),
        };

        let inputs = form
            .select(&control_selector)
            .filter_map(|control| form_input(&control))
            .collect();

        discoveries.push(Discovery::Link {
            url: action.clone(),
            hint: LinkHint::Form,
            context: "form[action]",
        });
        discoveries.push(Discovery::Form(FormRecord {
            method,
            action: action.to_string(),
            inputs,
        }));
    }
}

fn form_input(control: &ElementRef<'_>) -> Option<FormInput> {
    let element = control.value().name().to_ascii_lowercase();
    let name = control.value().attr("name")?.trim();
    if name.is_empty() {
        return None;
    }

    let input_type = match element.as_str() {
        "input" => control.value().attr("type").unwrap_or("text").to_ascii_lowercase(),
        "button" => control.value().attr("type").unwrap_or("submit").to_ascii_lowercase(),
        other => other.to_string(),
    };

    Some(FormInput {
        element,
        name: name.to_string(),
        input_type,
    })
}

fn extract_inline_scripts(document: &Html, base: &Url, discoveries: &mut Vec<Discovery>) {
    let Ok(selector) = Selector::parse("script:not([src])") else {
        return;
    };

    for script in document.select(&selector) {
        let source: String = script.text().collect();
        if source.trim().is_empty() {
            continue;
        }

        if script.value().id() == Some("__NEXT_DATA__") {
            discoveries.extend(next_data_routes(&source, base));
            continue;
        }

        discoveries.extend(extract_script(&source, base));
    }
}

/// Collects route-like values from Next.js page data, resolved against the page
fn next_data_routes(source: &str, base: &Url) -> Vec<Discovery> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(source) else {
        return Vec::new();
    };

    let mut paths = Vec::new();
    collect_routes(&value, &mut paths);

    let mut routes: Vec<String> = paths
        .iter()
        .filter_map(|path| canonicalize(path, base).ok())
        .map(String::from)
        .collect();
    routes.sort();
    routes.dedup();
    routes.into_iter().map(Discovery::AppRoute).collect()
}

fn collect_routes(value: &serde_json::Value, routes: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                match (key.as_str(), child) {
                    ("page" | "route" | "asPath", serde_json::Value::String(route))
                        if route.starts_with('/') =>
                    {
                        routes.push(route.clone());
                    }
                    _ => collect_routes(child, routes),
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_routes(item, routes);
            }
        }
        _ => {}
    }
}
