//! Response header extraction

use super::html::link_rel_hint;
use super::{Discovery, LinkHint};
use crate::url::canonicalize;
use regex::Regex;
use reqwest::header::{HeaderMap, LINK};
use std::sync::LazyLock;
use url::Url;

/// One `<uri>; params` element of a Link header
static LINK_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([^>]*)>([^<]*)").expect("hardcoded regex pattern is valid")
});

static REL_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\brel\s*=\s*(?:"([^"]*)"|([^\s;,]+))"#).expect("hardcoded regex pattern is valid")
});

/// Extracts candidates from `Link`, `SourceMap` and `X-SourceMap` headers
///
/// # Arguments
///
/// * `headers` - Response headers
/// * `base` - The response's final URL
pub fn extract_headers(headers: &HeaderMap, base: &Url) -> Vec<Discovery> {
    let mut discoveries = Vec::new();

    for value in headers.get_all(LINK) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        discoveries.extend(parse_link_header(value, base));
    }

    for name in ["sourcemap", "x-sourcemap"] {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            if let Ok(url) = canonicalize(value, base) {
                discoveries.push(Discovery::SourceMap(url));
            }
        }
    }

    discoveries
}

/// Parses a Link header value (RFC 8288)
pub fn parse_link_header(value: &str, base: &Url) -> Vec<Discovery> {
    LINK_VALUE
        .captures_iter(value)
        .filter_map(|caps| {
            let target = caps.get(1)?.as_str();
            let params = caps.get(2).map_or("", |m| m.as_str());
            let rel = REL_PARAM
                .captures(params)
                .and_then(|r| r.get(1).or_else(|| r.get(2)))
                .map_or("", |m| m.as_str());

            let url = canonicalize(target, base).ok()?;
            // Relations with no specific meaning are plain links
            let (hint, context) = match link_rel_hint(rel) {
                (LinkHint::Resource, _) => (LinkHint::Navigation, "header:link"),
                (hint, _) => (hint, "header:link"),
            };
            Some(Discovery::Link { url, hint, context })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn base() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn test_link_header_relations() {
        let value = r#"</style.css>; rel=preload; as=style, <https://example.com/next?p=2>; rel="next", </app.webmanifest>; rel="manifest""#;
        let discoveries = parse_link_header(value, &base());

        assert_eq!(
            discoveries,
            vec![
                Discovery::Link {
                    url: Url::parse("https://example.com/style.css").unwrap(),
                    hint: LinkHint::Preload,
                    context: "header:link",
                },
                Discovery::Link {
                    url: Url::parse("https://example.com/next?p=2").unwrap(),
                    hint: LinkHint::Navigation,
                    context: "header:link",
                },
                Discovery::Link {
                    url: Url::parse("https://example.com/app.webmanifest").unwrap(),
                    hint: LinkHint::Manifest,
                    context: "header:link",
                },
            ]
        );
    }

    #[test]
    fn test_link_header_service_relations() {
        let value = r#"<https://api.partner.io/v1>; rel="service", </openapi>; rel="service-desc", </docs>; rel="describedby", <https://cdn.example.net/>; rel=dns-prefetch, </feed>; rel="author""#;
        let hints: Vec<(String, LinkHint)> = parse_link_header(value, &base())
            .into_iter()
            .filter_map(|d| match d {
                Discovery::Link { url, hint, .. } => Some((url.to_string(), hint)),
                _ => None,
            })
            .collect();

        assert_eq!(
            hints,
            vec![
                ("https://api.partner.io/v1".to_string(), LinkHint::Api),
                ("https://example.com/openapi".to_string(), LinkHint::ApiDescription),
                ("https://example.com/docs".to_string(), LinkHint::ApiDescription),
                ("https://cdn.example.net/".to_string(), LinkHint::Preload),
                ("https://example.com/feed".to_string(), LinkHint::Navigation),
            ]
        );
    }

    #[test]
    fn test_link_header_without_rel() {
        let discoveries = parse_link_header("</other>", &base());
        assert!(matches!(
            &discoveries[..],
            [Discovery::Link { hint: LinkHint::Navigation, .. }]
        ));
    }

    #[test]
    fn test_link_header_garbage() {
        assert!(parse_link_header("nonsense; rel=next", &base()).is_empty());
        assert!(parse_link_header("<mailto:a@b.c>; rel=author", &base()).is_empty());
    }

    #[test]
    fn test_source_map_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-sourcemap", HeaderValue::from_static("/static/main.js.map"));
        headers.append(LINK, HeaderValue::from_static("</a>; rel=canonical"));

        let discoveries = extract_headers(&headers, &base());
        assert!(discoveries.contains(&Discovery::SourceMap(
            Url::parse("https://example.com/static/main.js.map").unwrap()
        )));
        assert!(discoveries.contains(&Discovery::Link {
            url: Url::parse("https://example.com/a").unwrap(),
            hint: LinkHint::Canonical,
            context: "header:link",
        }));
    }
}
