//! Surface-Ripple main entry point
//!
//! This is the command-line interface for the Surface-Ripple attack-surface mapper.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use surface_ripple::config::{load_config_with_hash, validate, Config};
use surface_ripple::crawler::Coordinator;
use surface_ripple::output::{generate_markdown_summary, print_statistics, write_json_report};
use surface_ripple::CrawlReport;
use tracing_subscriber::EnvFilter;

/// Surface-Ripple: an attack-surface mapper
///
/// Surface-Ripple crawls a single target domain while respecting robots.txt and
/// per-host politeness, and reports every page, endpoint, parameter, form, file,
/// subdomain and source file it discovers.
#[derive(Parser, Debug)]
#[command(name = "surface-ripple")]
#[command(version = "1.0.0")]
#[command(about = "An attack-surface mapper", long_about = None)]
struct Cli {
    /// Domain or URL to crawl
    #[arg(value_name = "TARGET")]
    target: String,

    /// Path to TOML configuration file
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Scheme used when TARGET has none
    #[arg(long, default_value = "https", value_parser = ["http", "https"])]
    scheme: String,

    /// Number of concurrent workers
    #[arg(short = 'c', long, visible_short_alias = 't', visible_alias = "threads")]
    concurrency: Option<u32>,

    /// Maximum discovery depth
    #[arg(short = 'd', long, visible_alias = "max-depth")]
    depth: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Maximum number of URLs to enqueue
    #[arg(long)]
    max_urls: Option<u64>,

    /// Only follow URLs matching this regex (repeatable)
    #[arg(long, value_name = "REGEX")]
    include: Vec<String>,

    /// Never follow URLs matching this regex (repeatable)
    #[arg(long, value_name = "REGEX")]
    exclude: Vec<String>,

    /// Minimum delay between requests to the same host (milliseconds)
    #[arg(long, value_name = "MS", visible_alias = "delay-ms")]
    delay: Option<u64>,

    /// Stop the crawl after this many seconds
    #[arg(long, value_name = "SECS")]
    deadline: Option<u64>,

    /// Ignore robots.txt rules and crawl delays
    #[arg(long)]
    no_robots: bool,

    /// Skip sitemap discovery
    #[arg(long)]
    no_sitemaps: bool,

    /// Seed from the Wayback Machine index
    #[arg(long, visible_alias = "wayback")]
    historical: bool,

    /// Write the JSON report to this path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Write a markdown summary to this path
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };
    apply_overrides(&mut config, &cli);
    validate(&config).context("invalid configuration")?;

    if cli.dry_run {
        handle_dry_run(&config, &cli);
        return Ok(());
    }

    let report = handle_crawl(config.clone(), config_hash, &cli).await?;
    let to_file = write_outputs(&report, &config, &cli)?;

    // Statistics would interleave with a report printed to stdout
    if to_file && !cli.quiet {
        print_statistics(&report);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("surface_ripple=info,warn"),
            1 => EnvFilter::new("surface_ripple=debug,info"),
            2 => EnvFilter::new("surface_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Command-line flags take precedence over the config file
///
/// Include and exclude patterns are added to those from the file.
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(concurrency) = cli.concurrency {
        config.crawler.concurrency = concurrency;
        config.crawler.per_host_concurrency = config.crawler.per_host_concurrency.min(concurrency);
    }
    if let Some(depth) = cli.depth {
        config.crawler.max_depth = depth;
    }
    if let Some(timeout) = cli.timeout {
        config.crawler.request_timeout_ms = timeout.saturating_mul(1000);
    }
    if let Some(max_urls) = cli.max_urls {
        config.crawler.max_urls = max_urls;
    }
    config.scope.include.extend(cli.include.iter().cloned());
    config.scope.exclude.extend(cli.exclude.iter().cloned());
    if let Some(delay) = cli.delay {
        config.politeness.delay_ms = delay;
    }
    if cli.deadline.is_some() {
        config.crawler.deadline_secs = cli.deadline;
    }
    if cli.no_robots {
        config.politeness.respect_robots = false;
        config.politeness.respect_crawl_delay = false;
    }
    if cli.no_sitemaps {
        config.seeds.sitemaps = false;
    }
    if cli.historical {
        config.seeds.historical = true;
    }
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config, cli: &Cli) {
    println!("=== Surface-Ripple Dry Run ===\n");

    println!("Target: {} (default scheme {})", cli.target, cli.scheme);

    println!("\nCrawler Configuration:");
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Per-host concurrency: {}", config.crawler.per_host_concurrency);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max URLs: {}", config.crawler.max_urls);
    println!("  Request timeout: {}ms", config.crawler.request_timeout_ms);
    match config.crawler.deadline_secs {
        Some(secs) => println!("  Deadline: {}s", secs),
        None => println!("  Deadline: none"),
    }

    println!("\nPoliteness:");
    println!("  Delay: {}ms", config.politeness.delay_ms);
    println!("  Respect robots.txt: {}", config.politeness.respect_robots);
    println!("  Respect Crawl-delay: {}", config.politeness.respect_crawl_delay);

    println!("\nScope Filters:");
    println!("  Include: {:?}", config.scope.include);
    println!("  Exclude: {:?}", config.scope.exclude);

    println!("\nSeeds:");
    println!("  Sitemaps: {}", config.seeds.sitemaps);
    println!("  Historical: {}", config.seeds.historical);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
///
/// Ctrl-C triggers a forced drain; the partial report is still returned.
async fn handle_crawl(
    config: Config,
    config_hash: Option<String>,
    cli: &Cli,
) -> anyhow::Result<CrawlReport> {
    let mut coordinator = Coordinator::new(config)?;
    if let Some(hash) = config_hash {
        coordinator = coordinator.with_config_hash(hash);
    }

    let shutdown = coordinator.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Received Ctrl+C, finishing in-flight requests");
            shutdown.trigger();
        }
    });

    let target = coordinator
        .bootstrap(&cli.target, &cli.scheme)
        .await
        .with_context(|| format!("failed to bootstrap {}", cli.target))?;

    match coordinator.run(target).await {
        Ok(report) => {
            tracing::info!("Crawl completed successfully");
            Ok(report)
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Writes the report files named on the command line or in the config
///
/// Returns false when the JSON report went to stdout.
fn write_outputs(report: &CrawlReport, config: &Config, cli: &Cli) -> anyhow::Result<bool> {
    let report_path = cli
        .output
        .clone()
        .or_else(|| config.output.report_path.as_ref().map(PathBuf::from));
    let summary_path = cli
        .summary
        .clone()
        .or_else(|| config.output.summary_path.as_ref().map(PathBuf::from));

    let to_file = match report_path {
        Some(path) => {
            write_json_report(report, &path)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            true
        }
        None => {
            println!("{}", serde_json::to_string_pretty(report)?);
            false
        }
    };

    if let Some(path) = summary_path {
        generate_markdown_summary(report, Path::new(&path))
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
    }

    Ok(to_file)
}
