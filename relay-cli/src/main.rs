//! Main entry point for the RelayCRM sync CLI.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shared::config::Config;

mod commands;

/// RelayCRM sync CLI
#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Command-line client for the RelayCRM conversation sync engine", long_about = None)]
struct Cli {
    /// Path to the configuration file (default: platform config dir)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for the RelayCRM sync CLI
#[derive(Subcommand)]
enum Commands {
    /// Show per-conversation unread counts from the server snapshot
    Unread(commands::unread::UnreadArgs),

    /// Page through a conversation's message history
    History(commands::history::HistoryArgs),

    /// Follow the live push channel and print events as they arrive
    Follow(commands::follow::FollowArgs),

    /// Inspect or scaffold the configuration file
    Config(commands::config::ConfigArgs),
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.clone()).context("failed to load configuration")?;
    init_tracing(&config.log_level);

    match cli.command {
        Commands::Unread(args) => commands::unread::handle(&config, args).await,
        Commands::History(args) => commands::history::handle(&config, args).await,
        Commands::Follow(args) => commands::follow::handle(&config, args).await,
        Commands::Config(args) => commands::config::handle(&config, cli.config, &args),
    }
}
