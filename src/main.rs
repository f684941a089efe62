//! Sumi-Sweep main entry point
//!
//! This is the command-line interface for the Sumi-Sweep crawl engine.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sumi_sweep::config::{load_config_with_hash, Config};
use sumi_sweep::crawler::{run_crawl, Collaborators};
use sumi_sweep::output::{load_statistics, print_statistics, CrawlStatistics};
use sumi_sweep::scanner::{LoggingPdfHandoff, PassthroughScanner};
use sumi_sweep::storage::SqliteStorage;
use tracing_subscriber::EnvFilter;

/// Sumi-Sweep: a scoped site crawler that feeds pages to a scanner
///
/// Sumi-Sweep walks a site or its sitemaps under a scope policy, visits every
/// in-scope page once, and records how each visit ended in a SQLite dataset.
#[derive(Parser, Debug)]
#[command(name = "sumi-sweep")]
#[command(version)]
#[command(about = "A scoped site crawler that feeds pages to a scanner", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the latest run from the dataset and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_sweep=info,warn"),
            1 => EnvFilter::new("sumi_sweep=debug,info"),
            2 => EnvFilter::new("sumi_sweep=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved settings
fn handle_dry_run(config: &Config) {
    let crawl = &config.crawl;
    println!("=== Sumi-Sweep Dry Run ===\n");

    println!("Crawl:");
    println!("  Seed: {}", crawl.seed);
    println!("  Mode: {:?}", crawl.mode);
    println!("  Strategy: {}", crawl.strategy);
    if let Some(sitemap) = &crawl.sitemap {
        println!("  Sitemap: {}", sitemap);
    }
    println!("  Max requests: {}", crawl.max_requests_per_crawl);
    match crawl.scan_duration() {
        Some(budget) => println!("  Time budget: {}s", budget.as_secs()),
        None => println!("  Time budget: none"),
    }
    println!("  Include PDFs: {}", crawl.include_pdfs);
    println!("  Safe mode: {}", crawl.safe_mode);
    println!("  Follow robots.txt: {}", crawl.follow_robots);

    println!("\nConcurrency:");
    println!(
        "  Workers: {}..={}",
        config.concurrency.min_concurrency, config.concurrency.max_concurrency
    );
    println!("  Navigation timeout: {}ms", config.concurrency.navigation_timeout_ms);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nEngine: {:?} (profiles under {})", config.browser.engine, config.browser.profile_dir);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Downloads: {}", config.output.download_dir);

    println!("\nBlacklist ({}):", crawl.blacklist.len());
    for pattern in &crawl.blacklist {
        println!("  - {}", pattern);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the dataset
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage, None)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} ({:?} mode, {}), up to {} pages",
        config.crawl.seed,
        config.crawl.mode,
        config.crawl.strategy,
        config.crawl.max_requests_per_crawl
    );

    let collaborators = Collaborators {
        scanner: Arc::new(PassthroughScanner),
        pdf_handoff: Arc::new(LoggingPdfHandoff),
        browser: None,
    };

    match run_crawl(config, config_hash, collaborators).await {
        Ok(report) => {
            tracing::info!("Crawl finished in {:?}", report.elapsed);
            if let Some(reason) = report.abort_reason {
                tracing::info!("Stopped early: {:?}", reason);
            }
            print_statistics(&CrawlStatistics::from_results(report.run, &report.results));
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
