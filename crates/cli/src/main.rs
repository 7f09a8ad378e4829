//! ZapGuard CLI - Main Entry Point
//!
//! Starts and stops a local ZAP daemon and runs threshold-gated security
//! scans around a test session. Everything else is configured through the
//! environment (`ZAP_*`, `PW_WORKERS`, `TARGET_URL`).

use anyhow::Context;
use clap::{Parser, Subcommand};
use zapguard_common::ScanConfiguration;

mod commands;
mod output;

use commands::{daemon, scan};

/// ZapGuard - ZAP security scans for browser test runs
#[derive(Parser)]
#[command(name = "zapguard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a local ZAP daemon and leave it running
    Start,

    /// Stop the local ZAP daemon
    Stop,

    /// Check whether ZAP is answering
    Status,

    /// Prepare ZAP, wait for the test session, then scan and report
    Run(scan::RunArgs),

    /// List alerts recorded by ZAP
    Alerts(scan::AlertsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let config = ScanConfiguration::from_env().context("invalid scan configuration")?;

    let ok = match cli.command {
        Commands::Start => daemon::start(&config).await.map(|_| true)?,
        Commands::Stop => daemon::stop(&config).await.map(|_| true)?,
        Commands::Status => daemon::status(&config, cli.format).await?,
        Commands::Run(args) => scan::run(args, config).await?,
        Commands::Alerts(args) => scan::alerts(args, &config, cli.format).await?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
