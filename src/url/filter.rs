//! User include/exclude filters and extension lists

use crate::config::ScopeConfig;
use crate::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// Outcome of running a URL through the user filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    /// The URL passes every filter
    Pass,
    /// Matched an exclude pattern, or missed every include pattern
    Excluded,
    /// Extension is on the ignore list and not explicitly allowed
    IgnoredExtension,
}

/// Compiled include/exclude regexes plus extension allow/deny lists
#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
    ignored_extensions: HashSet<String>,
    allowed_extensions: HashSet<String>,
}

impl UrlFilter {
    /// Compiles the filter from the scope configuration
    ///
    /// # Returns
    ///
    /// * `Ok(UrlFilter)` - All patterns compiled
    /// * `Err(ConfigError::InvalidPattern)` - A regex failed to compile
    pub fn from_config(config: &ScopeConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            include: compile_patterns(&config.include)?,
            exclude: compile_patterns(&config.exclude)?,
            ignored_extensions: normalize_extensions(&config.ignored_extensions),
            allowed_extensions: normalize_extensions(&config.allowed_extensions),
        })
    }

    /// Checks a URL against exclude, include and extension rules, in that order
    pub fn check(&self, url: &Url) -> FilterVerdict {
        let candidate = url.as_str();

        if self.exclude.iter().any(|p| p.is_match(candidate)) {
            return FilterVerdict::Excluded;
        }

        if !self.include.is_empty() && !self.include.iter().any(|p| p.is_match(candidate)) {
            return FilterVerdict::Excluded;
        }

        if let Some(ext) = path_extension(url) {
            if self.ignored_extensions.contains(&ext) && !self.allowed_extensions.contains(&ext) {
                return FilterVerdict::IgnoredExtension;
            }
        }

        FilterVerdict::Pass
    }

    /// True when a user include pattern explicitly names this URL
    ///
    /// Only an explicit include can pull an off-scope subdomain into the crawl.
    pub fn explicitly_included(&self, url: &Url) -> bool {
        let candidate = url.as_str();
        self.include.iter().any(|p| p.is_match(candidate))
            && !self.exclude.iter().any(|p| p.is_match(candidate))
    }
}

/// Returns the lowercase extension (with leading dot) of the last path segment
pub fn path_extension(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 10 {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", p, e)))
        })
        .collect()
}

fn normalize_extensions(extensions: &[String]) -> HashSet<String> {
    extensions
        .iter()
        .map(|e| {
            let e = e.trim().to_ascii_lowercase();
            if e.starts_with('.') {
                e
            } else {
                format!(".{}", e)
            }
        })
        .collect()
}
