// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! rankrelay: entry point.

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use rankrelay::config::{ConfigOverrides, RelayConfig};
use rankrelay::protocol::Destination;
use rankrelay_core::Category;

mod cli;

#[derive(Parser)]
#[command(
    name = "rankrelay",
    about = "Collect XHS ranking tables, export them as CSV and relay them to a local sink",
    version,
    after_help = "Run 'rankrelay <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Directory holding the cache, socket and PID file.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Relay socket path.
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// Base URL of the local HTTP sink.
    #[arg(long, global = true)]
    sink_url: Option<String>,

    /// Seconds to wait for a relay answer.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the ranking table of a saved page and add its rows to the cache
    Collect {
        /// Ranking category (note, account)
        category: Category,
        /// Saved HTML of the rendered ranking page
        html: PathBuf,
        /// Page address, used to resolve relative links
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Write the cache as CSV and clear it
    Export {
        category: Category,
        /// Output directory
        #[arg(long, short, default_value = ".")]
        out: PathBuf,
    },
    /// Empty the cache of a category
    Clear { category: Category },
    /// Show how many rows are cached
    Count { category: Category },
    /// Send the cache to the local sink through the relay
    Sync {
        category: Category,
        /// Destination (upload, db-only)
        #[arg(long, default_value = "upload")]
        to: Destination,
    },
    /// Manage the relay daemon
    Relay {
        #[command(subcommand)]
        action: RelayAction,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum RelayAction {
    /// Run the relay in the foreground
    Start,
    /// Stop the running relay
    Stop,
    /// Show whether the relay is running
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "rankrelay", &mut std::io::stdout());
        return Ok(());
    }

    let overrides = ConfigOverrides {
        data_dir: cli.data_dir,
        socket: cli.socket,
        sink_url: cli.sink_url,
        timeout_secs: cli.timeout,
    };
    let config = RelayConfig::resolve(&overrides)?;
    tracing::debug!(?config, "resolved configuration");

    let json = cli.json;
    match cli.command {
        Commands::Collect {
            category,
            html,
            base_url,
        } => cli::panel::collect(&config, category, &html, base_url.as_deref(), json).await,
        Commands::Export { category, out } => {
            cli::panel::export(&config, category, &out, json).await
        }
        Commands::Clear { category } => cli::panel::clear(&config, category, json).await,
        Commands::Count { category } => cli::panel::count(&config, category, json).await,
        Commands::Sync { category, to } => cli::panel::sync(&config, category, to, json).await,
        Commands::Relay { action } => match action {
            RelayAction::Start => cli::start::run(&config).await,
            RelayAction::Stop => cli::stop::run(&config).await,
            RelayAction::Status => cli::status::run(&config, json).await,
        },
        Commands::Completions { .. } => Ok(()),
    }
}
