//! ghproj CLI - Command line interface for GitHub Projects portability
//!
//! Export projects to JSON/YAML bundles, rebuild them under another owner,
//! and apply one change to many project items at once.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ghproj_core::{CancelFlag, Config, Credentials};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{ExportArgs, ImportArgs, ItemArgs};

/// ghproj: export, import and bulk-edit GitHub Projects
#[derive(Parser, Debug)]
#[command(name = "ghproj")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// GraphQL endpoint (overrides config and env)
    #[arg(long, global = true, env = "GHPROJ_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Export a project to a bundle file
    Export(ExportArgs),

    /// Create a new project from a bundle file
    Import(ImportArgs),

    /// Bulk operations on project items
    Item(ItemArgs),

    /// Show current configuration
    Config,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Cancel `flag` on the first Ctrl-C
fn watch_for_interrupt(flag: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted; finishing requests already in flight");
            flag.cancel();
        }
    });
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.api_url.clone())?;
    tracing::debug!(api_url = %config.github.api_url, "Configuration loaded");

    let cancel = CancelFlag::new();

    match cli.command {
        Some(Commands::Version) => {
            println!("ghproj {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Export(args)) => {
            watch_for_interrupt(cancel.clone());
            args.execute(&config, &cancel).await?;
        }
        Some(Commands::Import(args)) => {
            watch_for_interrupt(cancel.clone());
            args.execute(&config, &cancel).await?;
        }
        Some(Commands::Item(args)) => {
            watch_for_interrupt(cancel.clone());
            return args.execute(&config, &cancel).await;
        }
        Some(Commands::Config) => print_config(&config),
        None => {
            println!("ghproj - GitHub Projects export, import and bulk editing");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(0)
}

fn print_config(config: &Config) {
    println!("ghproj Configuration");
    println!("====================");
    println!();
    println!("GitHub Settings:");
    println!("  api_url: {}", config.github.api_url);
    println!("  timeout: {:?}", config.github.timeout);
    println!("  max_retries: {}", config.github.max_retries);
    println!("  retry_base_delay: {:?}", config.github.retry_base_delay);
    println!("  user_agent: {}", config.github.user_agent);
    println!();
    println!("Export Settings:");
    println!("  format: {}", config.export.format);
    println!();
    println!("Bulk Settings:");
    println!("  concurrency: {}", config.bulk.concurrency);
    println!();
    if let Some(path) = Config::default_config_path() {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
    match Credentials::load() {
        Ok(credentials) => println!("Token: found ({:?})", credentials.source()),
        Err(_) => println!("Token: not found"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
