use url::Url;

/// Extracts the lowercase host of a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use surface_ripple::url::extract_host;
///
/// let url = Url::parse("https://API.Example.com:8080/path").unwrap();
/// assert_eq!(extract_host(&url), Some("api.example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Removes a leading `www.` label
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Checks whether `host` is `root` itself or any subdomain of it
///
/// # Examples
///
/// ```
/// use surface_ripple::url::is_within;
///
/// assert!(is_within("example.com", "example.com"));
/// assert!(is_within("api.v2.example.com", "example.com"));
/// assert!(!is_within("notexample.com", "example.com"));
/// ```
pub fn is_within(host: &str, root: &str) -> bool {
    host == root
        || (host.len() > root.len()
            && host.ends_with(root)
            && host.as_bytes()[host.len() - root.len() - 1] == b'.')
}

/// Returns the registrable domain (eTLD+1) of a host
///
/// Falls back to the host itself for IP addresses and names the public
/// suffix list cannot split.
pub fn registrable_domain(host: &str) -> String {
    if host.parse::<std::net::IpAddr>().is_ok() {
        return host.to_string();
    }

    match psl::domain(host.as_bytes()) {
        Some(domain) => String::from_utf8_lossy(domain.as_bytes()).to_string(),
        None => host.to_string(),
    }
}
