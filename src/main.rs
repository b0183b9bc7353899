//! Crawldex main entry point
//!
//! Loads the application config, sets up logging, and serves the HTTP API.

use clap::Parser;
use crawldex::api::create_router;
use crawldex::config::load_config_with_hash;
use crawldex::context::AppContext;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Crawldex: a crawl-and-search engine
///
/// Crawldex crawls seed URLs under configurable extraction rules, stores
/// the extracted values, builds fuzzy-searchable BM25 indexes over them,
/// and serves the whole lifecycle over an HTTP API.
#[derive(Parser, Debug)]
#[command(name = "crawldex")]
#[command(version)]
#[command(about = "A crawl-and-search engine", long_about = None)]
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

    /// Validate the config and show what would be served, without serving
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded (hash: {})", hash);
            (config, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config, &config_hash);
        return Ok(());
    }

    let bind_address = config.server.bind_address.clone();
    let context = AppContext::new(config)?;
    let router = create_router(context);

    tracing::info!("Serving on {}", bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawldex=info,warn"),
            1 => EnvFilter::new("crawldex=debug,info"),
            2 => EnvFilter::new("crawldex=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Handles --dry-run: prints the effective configuration and exits
fn handle_dry_run(config: &crawldex::AppConfig, config_hash: &str) {
    println!("=== Crawldex Dry Run ===\n");

    println!("Server:");
    println!("  Bind address: {}", config.server.bind_address);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nIndex:");
    println!("  Dictionaries: {}", config.index.dictionaries_dir);

    println!("\nConfig hash: {}", config_hash);
    println!("\n✓ Configuration is valid");
}
