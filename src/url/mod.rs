//! URL handling module for Surface-Ripple
//!
//! This module provides URL canonicalization, host helpers, user filters and the
//! scope policy that decides which hosts may be fetched.

mod domain;
mod filter;
mod normalize;

pub use domain::{extract_host, is_within, registrable_domain, strip_www};
pub use filter::{path_extension, FilterVerdict, UrlFilter};
pub use normalize::{canonicalize, canonicalize_absolute, canonicalize_endpoint, query_keys};

use serde::Serialize;
use url::Url;

/// The locked crawl target
///
/// Established once at bootstrap from the effective URL after redirects and
/// never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    /// Scope anchor: effective host with any leading `www.` removed
    pub root_domain: String,
    /// Scheme of the effective entry URL
    pub scheme: String,
    /// Effective entry URL, the depth-0 seed
    pub entry_url: Url,
}

impl Target {
    /// Locks scope on an effective (post-redirect) URL
    ///
    /// Returns `None` when the URL has no host.
    pub fn from_effective_url(entry_url: Url) -> Option<Self> {
        let host = extract_host(&entry_url)?;
        Some(Self {
            root_domain: strip_www(&host).to_string(),
            scheme: entry_url.scheme().to_string(),
            entry_url,
        })
    }
}

/// Scope classification of a URL relative to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeClass {
    /// Root domain or one of its subdomains; eligible for fetching
    InScope,
    /// Shares the target's registrable domain through a different branch;
    /// recorded in `subdomains`, fetched only when explicitly included
    OffScopeSubdomain,
    /// Any other host
    External,
}

impl ScopeClass {
    /// Returns true if URLs of this class may be fetched without an explicit include
    pub fn is_fetchable(&self) -> bool {
        matches!(self, Self::InScope)
    }
}

/// Classifies a URL against the locked target
///
/// # Classification Rules
///
/// 1. Host equals the root domain or is a subdomain of it → `InScope`
/// 2. Host shares the root's registrable domain (eTLD+1) → `OffScopeSubdomain`
/// 3. Everything else → `External`
///
/// # Examples
///
/// ```
/// use surface_ripple::url::{classify, ScopeClass, Target};
/// use url::Url;
///
/// let target = Target::from_effective_url(Url::parse("https://app.example.com/").unwrap()).unwrap();
///
/// let url = Url::parse("https://v2.app.example.com/x").unwrap();
/// assert_eq!(classify(&url, &target), ScopeClass::InScope);
///
/// let url = Url::parse("https://api.example.com/x").unwrap();
/// assert_eq!(classify(&url, &target), ScopeClass::OffScopeSubdomain);
///
/// let url = Url::parse("https://other.org/").unwrap();
/// assert_eq!(classify(&url, &target), ScopeClass::External);
/// ```
pub fn classify(url: &Url, target: &Target) -> ScopeClass {
    let host = match extract_host(url) {
        Some(h) => h,
        None => return ScopeClass::External,
    };

    if is_within(&host, &target.root_domain) {
        return ScopeClass::InScope;
    }

    let registrable = registrable_domain(&target.root_domain);
    if registrable != target.root_domain && is_within(&host, &registrable) {
        return ScopeClass::OffScopeSubdomain;
    }

    ScopeClass::External
}
