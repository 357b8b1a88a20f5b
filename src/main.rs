//! Tidepool main entry point
//!
//! This is the command-line interface for the Tidepool crawler.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tidepool::config::{load_config_with_hash, Config};
use tidepool::output::write_summary;
use tidepool::CrawlEngine;
use tracing_subscriber::EnvFilter;

/// Tidepool: a polite, bounded web crawler
///
/// Tidepool crawls outward from seed URLs while staying inside an allowed
/// domain scope, pacing per-domain requests, retrying transient failures,
/// deduplicating page content, and recording every stored artifact in a
/// per-domain manifest.
#[derive(Parser, Debug)]
#[command(name = "tidepool")]
#[command(version)]
#[command(about = "A polite, bounded web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Crawl only these seed URLs, overriding the configured list
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,

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

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if !cli.urls.is_empty() {
        tracing::info!("Overriding configured seeds with {} URL(s)", cli.urls.len());
        config.crawl.seeds = cli.urls.clone();
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tidepool=info,warn"),
            1 => EnvFilter::new("tidepool=debug,info"),
            2 => EnvFilter::new("tidepool=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Tidepool Dry Run ===\n");

    println!("Crawl Scope:");
    println!("  Allowed domains: {}", config.crawl.allowed_domains.join(", "));
    println!("  Max depth: {}", config.crawl.max_depth);
    println!("  Max pages per domain: {}", config.crawl.max_pages_per_domain);
    println!("  Max file size: {} MB", config.crawl.max_file_size_mb);
    println!("  Exclude patterns: {}", config.crawl.exclude_patterns.len());
    if !config.crawl.download_file_types.is_empty() {
        println!(
            "  Download file types: {}",
            config.crawl.download_file_types.join(", ")
        );
    }

    println!("\nPoliteness:");
    println!(
        "  Delay: {}-{} ms{}",
        config.politeness.min_delay_ms,
        config.politeness.max_delay_ms,
        if config.politeness.progressive {
            " (progressive)"
        } else {
            ""
        }
    );

    println!("\nRetries:");
    println!(
        "  Up to {} retries, {} s apart",
        config.retry.max_retries, config.retry.retry_delay_secs
    );

    println!("\nConcurrency:");
    println!("  Global: {}", config.limits.global_concurrency);
    println!("  Per domain: {}", config.limits.per_domain_concurrency);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Root directory: {}", config.output.root_dir);
    println!("  Summary: {}", config.output.summary_path);

    println!("\nSeed URLs ({}):", config.crawl.seeds.len());
    for seed in &config.crawl.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} seed URLs",
        config.crawl.seeds.len()
    );
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let summary_path = config.output.summary_path.clone();

    let engine = CrawlEngine::new(config).context("failed to build crawl engine")?;
    let summary = engine.run().await.context("crawl failed")?;

    write_summary(&summary, Path::new(&summary_path))
        .with_context(|| format!("failed to write summary to {}", summary_path))?;
    tracing::info!("Summary written to {}", summary_path);

    if summary.interrupted {
        tracing::warn!("Crawl was interrupted; output reflects partial results");
    }

    Ok(())
}
