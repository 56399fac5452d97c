//! Surface-Ripple: an attack-surface mapper
//!
//! This crate crawls a single target domain, staying inside its locked scope while
//! respecting robots.txt and per-host politeness, and collects a deduplicated,
//! categorized inventory of security-relevant artifacts: pages, API / GraphQL /
//! WebSocket / SSE endpoints, parameters, forms, files, subdomains and source files
//! recovered from source maps.

pub mod artifacts;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod robots;
pub mod seeds;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Surface-Ripple operations
#[derive(Debug, Error)]
pub enum RippleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Bootstrap failed for {target}: {reason}")]
    Bootstrap { target: String, reason: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
///
/// Every variant is fatal and surfaces before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid filter pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors (canonicalizer rejections)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Empty URL")]
    Empty,

    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Errors raised by the transport, render and historical index capabilities
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}")]
    Connect { url: String },

    #[error("Render failed for {url}: {message}")]
    Render { url: String, message: String },

    #[error("Historical index error: {0}")]
    Index(String),
}

/// Malformed document errors
///
/// Extractors never propagate these; the offending document simply yields no events.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Surface-Ripple operations
pub type Result<T> = std::result::Result<T, RippleError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use artifacts::{ArtifactCategory, ArtifactRegistry};
pub use config::Config;
pub use crawler::{Coordinator, CrawlReport};
pub use url::{canonicalize, ScopeClass, Target};
