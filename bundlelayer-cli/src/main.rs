//! BundleLayer CLI - Command-line interface
//!
//! Inspects, fetches and packs manifest-described content bundles through the
//! `bundlelayer` library.

mod commands;
mod error;

use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use commands::{fetch::FetchArgs, pack::PackArgs, SourceArgs};
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "bundlelayer", version, about = "Manifest-driven content bundle delivery")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the authoritative manifest and the bundles that need fetching
    Status(SourceArgs),
    /// Fetch bundles (all invalidated bundles when none are named)
    Fetch(FetchArgs),
    /// Pack directories into bundle files and a manifest
    Pack(PackArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Status(args) => commands::status::run(args).await,
        Command::Fetch(args) => commands::fetch::run(args).await,
        Command::Pack(args) => commands::pack::run(args),
    }
}

/// 0 = warn, 1 = info, 2+ = debug.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "bundlelayer=warn",
        1 => "bundlelayer=info",
        _ => "bundlelayer=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
