//! Comment-Gleaner main entry point
//!
//! This is the command-line interface for the Comment-Gleaner harvester.

use anyhow::Context;
use clap::Parser;
use comment_gleaner::config::{load_config_with_hash, Config};
use comment_gleaner::crawler::{crawl, user_agent_string, Coordinator};
use comment_gleaner::output::{load_statistics, print_run_report, print_statistics};
use comment_gleaner::storage::open_storage;
use comment_gleaner::GleanError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Configuration could not be loaded or is invalid
const EXIT_CONFIG: u8 = 2;

/// Storage or another unrecoverable failure
const EXIT_FATAL: u8 = 3;

/// Comment-Gleaner: a polite newsletter comment harvester
///
/// Comment-Gleaner pages through a newsletter's public archive, pulls the
/// comment threads of every post, keeps the comments written by one target
/// identity, and merges them into a de-duplicated JSON dataset.
#[derive(Parser, Debug)]
#[command(name = "comment-gleaner")]
#[command(version)]
#[command(about = "A polite newsletter comment harvester", long_about = None)]
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

    /// Ignore stored crawl state and start from the top of the index
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the stored dataset and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    // Handle different modes
    let outcome = if cli.dry_run {
        handle_dry_run(config, cli.fresh)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, cli.fresh).await
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

/// Maps a failure to the process exit code
fn exit_code_for(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<GleanError>() {
        Some(GleanError::Config(_)) => EXIT_CONFIG,
        _ => EXIT_FATAL,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("comment_gleaner=info,warn"),
            1 => EnvFilter::new("comment_gleaner=debug,info"),
            2 => EnvFilter::new("comment_gleaner=trace,debug"),
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
fn handle_dry_run(config: Config, fresh: bool) -> anyhow::Result<()> {
    println!("=== Comment-Gleaner Dry Run ===\n");

    println!("Source:");
    println!("  Base URL: {}", config.source.base_url);

    println!("\nTarget Identity:");
    println!("  Name: {}", config.target.name.as_deref().unwrap_or("-"));
    println!("  Handle: {}", config.target.handle.as_deref().unwrap_or("-"));

    println!("\nCrawler Configuration:");
    println!("  Max posts per run: {}", config.crawler.max_posts_per_run);
    println!("  Page size: {}", config.crawler.page_size);
    println!(
        "  Politeness delay: {}ms (+0..{}ms per page, +0..{}ms per post)",
        config.crawler.politeness_delay,
        config.crawler.page_jitter_max,
        config.crawler.post_jitter_max
    );
    println!(
        "  Mode: {}",
        if config.crawler.incremental {
            "incremental"
        } else {
            "full"
        }
    );
    println!(
        "  Rendered fallback: {}",
        if config.crawler.rendered_fallback {
            "enabled"
        } else {
            "disabled"
        }
    );

    println!("\nRetry Policy:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!("  Base delay: {}ms", config.retry.base_delay);
    println!(
        "  Caps: {}ms (rate limited), {}ms (server errors)",
        config.retry.rate_limit_cap, config.retry.server_error_cap
    );

    println!("\nUser Agent:");
    println!("  {}", user_agent_string(&config.user_agent));

    println!("\nOutput:");
    println!("  Dataset: {}", config.output.dataset_path);
    println!("  State: {}", config.output.state_path);

    let coordinator = Coordinator::new(config, fresh)?;
    let plan = coordinator.plan()?;

    println!("\n✓ Configuration is valid");
    if plan.already_complete {
        println!("✓ Index already fully crawled; a run would only refresh timestamps");
    } else {
        let pages = plan
            .max_pages
            .map(|p| format!(", at most {} index pages", p))
            .unwrap_or_default();
        println!(
            "✓ Would crawl up to {} posts starting at index offset {}{}",
            plan.max_documents, plan.start_offset, pages
        );
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics of the stored dataset
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Dataset: {}\n", config.output.dataset_path);

    let storage = open_storage(&config.output);
    let stats = load_statistics(&storage)
        .map_err(GleanError::from)
        .context("failed to read dataset")?;

    match stats {
        Some(stats) => print_statistics(&stats),
        None => println!("No dataset has been written yet."),
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring stored crawl state)");
    }

    tracing::info!(
        "Target: name={:?} handle={:?}",
        config.target.name,
        config.target.handle
    );

    let report = crawl(config, fresh).await.context("crawl failed")?;
    print_run_report(&report);

    Ok(())
}
