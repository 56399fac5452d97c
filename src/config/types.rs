use serde::Deserialize;

/// Static-asset extensions skipped by the frontier unless explicitly allowed
pub const DEFAULT_IGNORED_EXTENSIONS: &[&str] = &[
    ".css", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".woff", ".woff2", ".ttf", ".eot",
    ".mp4", ".mp3", ".pdf", ".zip", ".gz", ".tar", ".rar", ".webp", ".xml",
];

/// Main configuration structure for Surface-Ripple
///
/// Every section is optional; missing sections and keys take their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub scope: ScopeConfig,
    #[serde(default)]
    pub politeness: PolitenessConfig,
    #[serde(default)]
    pub seeds: SeedConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent workers (global concurrency)
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Maximum concurrent requests to a single host
    #[serde(default = "default_per_host_concurrency", rename = "per-host-concurrency")]
    pub per_host_concurrency: u32,

    /// Per-request timeout (milliseconds)
    #[serde(default = "default_request_timeout_ms", rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// Maximum discovery depth from the entry URL
    #[serde(default = "default_max_depth", rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of URLs admitted to the frontier
    #[serde(default = "default_max_urls", rename = "max-urls")]
    pub max_urls: u64,

    /// Response bodies are truncated beyond this many bytes
    #[serde(default = "default_max_response_bytes", rename = "max-response-bytes")]
    pub max_response_bytes: usize,

    /// Wall-clock limit for the whole crawl (seconds)
    #[serde(default, rename = "deadline-secs")]
    pub deadline_secs: Option<u64>,

    /// Timeout for delegated render requests (milliseconds)
    #[serde(default = "default_render_timeout_ms", rename = "render-timeout-ms")]
    pub render_timeout_ms: u64,

    /// Accept invalid TLS certificates
    #[serde(default, rename = "accept-invalid-certs")]
    pub accept_invalid_certs: bool,
}

/// Scope filter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScopeConfig {
    /// Regexes a URL must match (any) to be admitted; empty admits all
    #[serde(default)]
    pub include: Vec<String>,

    /// Regexes that reject a URL
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Extensions never enqueued
    #[serde(default = "default_ignored_extensions", rename = "ignored-extensions")]
    pub ignored_extensions: Vec<String>,

    /// Extensions enqueued even if on the ignore list
    #[serde(default, rename = "allowed-extensions")]
    pub allowed_extensions: Vec<String>,
}

/// Politeness configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PolitenessConfig {
    /// Minimum time between requests to the same host (milliseconds)
    #[serde(default, rename = "delay-ms")]
    pub delay_ms: u64,

    /// Honor robots.txt allow/disallow rules
    #[serde(default = "default_true", rename = "respect-robots")]
    pub respect_robots: bool,

    /// Honor robots.txt Crawl-delay
    #[serde(default = "default_true", rename = "respect-crawl-delay")]
    pub respect_crawl_delay: bool,
}

/// Seed source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    /// Seed from robots.txt-declared and well-known sitemaps
    #[serde(default = "default_true")]
    pub sitemaps: bool,

    /// Seed from the historical archive index
    #[serde(default)]
    pub historical: bool,

    /// Maximum URLs taken from the historical index
    #[serde(default = "default_historical_limit", rename = "historical-limit")]
    pub historical_limit: usize,

    /// Maximum sitemap documents fetched (including nested indexes)
    #[serde(default = "default_max_sitemaps", rename = "max-sitemaps")]
    pub max_sitemaps: usize,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler (also the robots.txt product token)
    #[serde(default = "default_crawler_name", rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(default = "default_crawler_version", rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(default, rename = "contact-url")]
    pub contact_url: Option<String>,

    /// Email address for crawler-related contact
    #[serde(default, rename = "contact-email")]
    pub contact_email: Option<String>,
}

impl UserAgentConfig {
    /// Formats the User-Agent header
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`, with the
    /// parenthesized part reduced to whatever contact details are configured.
    pub fn header_value(&self) -> String {
        let contact: Vec<String> = [
            self.contact_url.as_ref().map(|u| format!("+{}", u)),
            self.contact_email.clone(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if contact.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} ({})",
                self.crawler_name,
                self.crawler_version,
                contact.join("; ")
            )
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Path of the JSON report
    #[serde(default, rename = "report-path")]
    pub report_path: Option<String>,

    /// Path of the markdown summary
    #[serde(default, rename = "summary-path")]
    pub summary_path: Option<String>,
}

fn default_concurrency() -> u32 {
    10
}

fn default_per_host_concurrency() -> u32 {
    2
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_max_depth() -> u32 {
    3
}

fn default_max_urls() -> u64 {
    5_000
}

fn default_max_response_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_render_timeout_ms() -> u64 {
    30_000
}

fn default_ignored_extensions() -> Vec<String> {
    DEFAULT_IGNORED_EXTENSIONS
        .iter()
        .map(|e| e.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_historical_limit() -> usize {
    200
}

fn default_max_sitemaps() -> usize {
    50
}

fn default_crawler_name() -> String {
    "SurfaceRipple".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            per_host_concurrency: default_per_host_concurrency(),
            request_timeout_ms: default_request_timeout_ms(),
            max_depth: default_max_depth(),
            max_urls: default_max_urls(),
            max_response_bytes: default_max_response_bytes(),
            deadline_secs: None,
            render_timeout_ms: default_render_timeout_ms(),
            accept_invalid_certs: false,
        }
    }
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            ignored_extensions: default_ignored_extensions(),
            allowed_extensions: Vec::new(),
        }
    }
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            delay_ms: 0,
            respect_robots: true,
            respect_crawl_delay: true,
        }
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            sitemaps: true,
            historical: false,
            historical_limit: default_historical_limit(),
            max_sitemaps: default_max_sitemaps(),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: None,
            contact_email: None,
        }
    }
}
