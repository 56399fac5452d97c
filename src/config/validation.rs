use crate::config::types::{
    Config, CrawlerConfig, PolitenessConfig, ScopeConfig, SeedConfig, UserAgentConfig,
};
use crate::url::UrlFilter;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// Runs before any network activity; every failure is fatal.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_scope_config(&config.scope)?;
    validate_politeness_config(&config.politeness)?;
    validate_seed_config(&config.seeds)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 256 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 256, got {}",
            config.concurrency
        )));
    }

    if config.per_host_concurrency < 1 || config.per_host_concurrency > config.concurrency {
        return Err(ConfigError::Validation(format!(
            "per_host_concurrency must be between 1 and concurrency ({}), got {}",
            config.concurrency, config.per_host_concurrency
        )));
    }

    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    if config.render_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "render_timeout_ms must be >= 100ms, got {}ms",
            config.render_timeout_ms
        )));
    }

    if config.max_urls < 1 {
        return Err(ConfigError::Validation(format!(
            "max_urls must be >= 1, got {}",
            config.max_urls
        )));
    }

    if config.max_response_bytes < 1024 {
        return Err(ConfigError::Validation(format!(
            "max_response_bytes must be >= 1024, got {}",
            config.max_response_bytes
        )));
    }

    if config.deadline_secs == Some(0) {
        return Err(ConfigError::Validation(
            "deadline_secs must be > 0 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates scope filters: every regex must compile, every extension must be well-formed
fn validate_scope_config(config: &ScopeConfig) -> Result<(), ConfigError> {
    UrlFilter::from_config(config)?;

    for ext in config
        .ignored_extensions
        .iter()
        .chain(config.allowed_extensions.iter())
    {
        validate_extension(ext)?;
    }

    Ok(())
}

/// Validates politeness configuration
fn validate_politeness_config(config: &PolitenessConfig) -> Result<(), ConfigError> {
    // One hour between requests is never intended
    if config.delay_ms > 3_600_000 {
        return Err(ConfigError::Validation(format!(
            "delay_ms must be <= 3600000ms, got {}ms",
            config.delay_ms
        )));
    }

    Ok(())
}

/// Validates seed source configuration
fn validate_seed_config(config: &SeedConfig) -> Result<(), ConfigError> {
    if config.historical_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "historical_limit must be >= 1, got {}",
            config.historical_limit
        )));
    }

    if config.max_sitemaps < 1 {
        return Err(ConfigError::Validation(format!(
            "max_sitemaps must be >= 1, got {}",
            config.max_sitemaps
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Crawler name doubles as the robots.txt product token
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    if let Some(email) = &config.contact_email {
        validate_email(email)?;
    }

    Ok(())
}

/// Validates an extension entry such as `.png` or `png`
fn validate_extension(ext: &str) -> Result<(), ConfigError> {
    let bare = ext.trim().trim_start_matches('.');

    if bare.is_empty() || bare.len() > 10 || !bare.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::Validation(format!(
            "Invalid extension entry: '{}'",
            ext
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| ConfigError::Validation(format!("Invalid email format: '{}'", email)))?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
