use crate::{UrlError, UrlResult};
use url::form_urlencoded;
use url::Url;

/// Tracking query parameters removed during canonicalization
///
/// Any key starting with `utm_` is removed as well.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "yclid", "mc_eid", "mc_cid", "igshid", "_ga", "_gl",
];

/// Schemes that can be fetched
const FETCHABLE_SCHEMES: &[&str] = &["http", "https"];

/// Schemes accepted for endpoint artifacts (never fetched)
const ENDPOINT_SCHEMES: &[&str] = &["http", "https", "ws", "wss"];

/// Canonicalizes a raw URL reference against a base URL
///
/// # Canonicalization Steps
///
/// 1. Trim surrounding whitespace; reject empty input
/// 2. Resolve relative references against `base` (dot segments are resolved here)
/// 3. Reject anything that is not http(s) (mailto:, javascript:, data:, tel:, ...)
/// 4. Lower-case scheme and host, drop default ports (`:80`, `:443`)
/// 5. Collapse repeated path separators
/// 6. Strip the fragment
/// 7. Strip tracking parameters and stably sort the remaining ones by key
/// 8. Drop an empty query string
///
/// The result is idempotent: canonicalizing a canonical URL yields the same URL.
///
/// # Arguments
///
/// * `raw` - The raw URL reference, absolute or relative
/// * `base` - The already canonical URL of the document it was found in
///
/// # Returns
///
/// * `Ok(Url)` - Canonical URL
/// * `Err(UrlError)` - The reference was rejected
///
/// # Examples
///
/// ```
/// use surface_ripple::url::canonicalize;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/docs/").unwrap();
/// let url = canonicalize("../about?utm_source=x#team", &base).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/about");
/// ```
pub fn canonicalize(raw: &str, base: &Url) -> UrlResult<Url> {
    canonicalize_with(raw, Some(base), FETCHABLE_SCHEMES)
}

/// Canonicalizes an absolute URL string (no base available)
pub fn canonicalize_absolute(raw: &str) -> UrlResult<Url> {
    canonicalize_with(raw, None, FETCHABLE_SCHEMES)
}

/// Canonicalizes an endpoint reference, additionally accepting `ws` and `wss`
///
/// Used for socket endpoints discovered in script content. Such URLs are only
/// recorded as artifacts; the frontier never admits them.
pub fn canonicalize_endpoint(raw: &str, base: &Url) -> UrlResult<Url> {
    canonicalize_with(raw, Some(base), ENDPOINT_SCHEMES)
}

fn canonicalize_with(raw: &str, base: Option<&Url>, schemes: &[&str]) -> UrlResult<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = match base {
        Some(base) => base.join(raw),
        None => Url::parse(raw),
    };
    let mut url = parsed.map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if !schemes.contains(&url.scheme()) {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingHost),
    }

    // Credentials never identify a distinct resource
    let _ = url.set_username("");
    let _ = url.set_password(None);

    if url.path().contains("//") {
        let collapsed = collapse_slashes(url.path());
        url.set_path(&collapsed);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params.iter())
                .finish();
            url.set_query(Some(&query));
        }
    }

    Ok(url)
}

/// Collapses runs of `/` into a single separator, keeping a trailing slash
fn collapse_slashes(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    let mut previous_slash = false;

    for c in path.chars() {
        if c == '/' {
            if !previous_slash {
                collapsed.push(c);
            }
            previous_slash = true;
        } else {
            collapsed.push(c);
            previous_slash = false;
        }
    }

    collapsed
}

/// Filters out tracking parameters and stably sorts the rest by key
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !key.is_empty() && !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Returns the distinct query keys of a URL, in order of first appearance
pub fn query_keys(url: &Url) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for (key, _) in url.query_pairs() {
        if !key.is_empty() && !keys.iter().any(|k| k == key.as_ref()) {
            keys.push(key.into_owned());
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/docs/index.html").unwrap()
    }

    #[test]
    fn test_resolve_relative() {
        let result = canonicalize("guide", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/docs/guide");
    }

    #[test]
    fn test_resolve_root_relative() {
        let result = canonicalize("/about", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/about");
    }

    #[test]
    fn test_resolve_protocol_relative() {
        let result = canonicalize("//cdn.example.com/app.js", &base()).unwrap();
        assert_eq!(result.as_str(), "https://cdn.example.com/app.js");
    }

    #[test]
    fn test_keeps_http_scheme() {
        let result = canonicalize_absolute("http://example.com/page").unwrap();
        assert_eq!(result.as_str(), "http://example.com/page");
    }

    #[test]
    fn test_lowercase_scheme_and_host() {
        let result = canonicalize_absolute("HTTPS://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_strip_default_ports() {
        assert_eq!(
            canonicalize_absolute("http://example.com:80/a").unwrap().as_str(),
            "http://example.com/a"
        );
        assert_eq!(
            canonicalize_absolute("https://example.com:443/a").unwrap().as_str(),
            "https://example.com/a"
        );
        assert_eq!(
            canonicalize_absolute("https://example.com:8443/a").unwrap().as_str(),
            "https://example.com:8443/a"
        );
    }

    #[test]
    fn test_remove_fragment() {
        let result = canonicalize_absolute("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_collapse_slashes_keeps_trailing() {
        let result = canonicalize_absolute("https://example.com///path//to///dir/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/path/to/dir/");
    }

    #[test]
    fn test_dot_segments() {
        let result = canonicalize("../a/./b/../c", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/a/c");
    }

    #[test]
    fn test_remove_tracking_params() {
        let result =
            canonicalize_absolute("https://example.com/about?utm_source=x&gclid=1&fbclid=2")
                .unwrap();
        assert_eq!(result.as_str(), "https://example.com/about");
    }

    #[test]
    fn test_sort_query_params() {
        let result = canonicalize_absolute("https://example.com/page?b=2&a=1&UTM_Medium=m").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?a=1&b=2");
    }

    #[test]
    fn test_duplicate_keys_keep_relative_order() {
        let result = canonicalize_absolute("https://example.com/p?z=1&a=2&a=1").unwrap();
        assert_eq!(result.as_str(), "https://example.com/p?a=2&a=1&z=1");
    }

    #[test]
    fn test_empty_query_removed() {
        let result = canonicalize_absolute("https://example.com/page?").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_reject_special_schemes() {
        for raw in [
            "mailto:a@example.com",
            "javascript:void(0)",
            "tel:+123",
            "data:text/html,hi",
            "ftp://example.com/file",
        ] {
            assert!(
                matches!(canonicalize(raw, &base()), Err(UrlError::InvalidScheme(_))),
                "expected rejection for {}",
                raw
            );
        }
    }

    #[test]
    fn test_reject_empty_and_malformed() {
        assert_eq!(canonicalize("   ", &base()), Err(UrlError::Empty));
        assert!(canonicalize_absolute("not a url").is_err());
        assert!(canonicalize_absolute("http://").is_err());
    }

    #[test]
    fn test_endpoint_accepts_websocket() {
        let result = canonicalize_endpoint("wss://example.com:443/socket", &base()).unwrap();
        assert_eq!(result.as_str(), "wss://example.com/socket");
        assert!(canonicalize("wss://example.com/socket", &base()).is_err());
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "HTTP://Example.COM:80//a//b/?utm_source=x&b=2&a=1#frag",
            "https://example.com/search?q=hello world&lang=en",
            "https://example.com/p?flag&x=%2F",
            "../../up/one",
            "https://user:pw@example.com/private",
        ];

        for raw in inputs {
            let once = canonicalize(raw, &base()).unwrap();
            let twice = canonicalize(once.as_str(), &base()).unwrap();
            assert_eq!(once, twice, "not idempotent for {}", raw);
        }
    }

    #[test]
    fn test_strips_credentials() {
        let result = canonicalize_absolute("https://user:pw@example.com/private").unwrap();
        assert_eq!(result.as_str(), "https://example.com/private");
    }

    #[test]
    fn test_query_keys() {
        let url = Url::parse("https://example.com/p?id=1&sort=asc&id=2").unwrap();
        assert_eq!(query_keys(&url), vec!["id".to_string(), "sort".to_string()]);

        let url = Url::parse("https://example.com/api/v1/users").unwrap();
        assert!(query_keys(&url).is_empty());
    }
}
