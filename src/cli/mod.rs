pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "feedwatch")]
#[command(about = "Email new feed entries, remembering what was already sent", long_about = None)]
pub struct Cli {
    /// Path to the configuration file (default: ~/.config/feedwatch/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check the feed once and notify about unseen entries
    Run,
    /// Print the records currently in the ledger
    Ledger,
    /// Background daemon for periodic runs
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
}

#[derive(Subcommand)]
pub enum DaemonAction {
    /// Start the daemon in the foreground
    Start {
        /// Run interval (e.g., "10m", "1h", "1d")
        #[arg(short, long, default_value = "10m")]
        interval: String,

        /// Skip the run on start
        #[arg(long)]
        no_initial_run: bool,
    },
    /// Stop the running daemon
    Stop,
    /// Check daemon status
    Status,
}
