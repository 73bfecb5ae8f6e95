//! CLI for the mget download manager.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_get, run_probe};

/// Top-level CLI for the mget download manager.
#[derive(Debug, Parser)]
#[command(name = "mget")]
#[command(about = "mget: concurrent segmented file downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one or more URLs.
    Get {
        /// Direct HTTP/HTTPS URLs to download.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Output directory (default: configured or current directory).
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Connections (segments) per download when the server supports ranges.
        #[arg(long, value_name = "N")]
        connections: Option<usize>,

        /// Maximum downloads running at once.
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Probe a URL and print its metadata without downloading.
    Probe {
        /// URL to probe.
        url: String,
    },
}

impl CliCommand {
    /// Parse `std::env::args` and run the selected command.
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        match cli.command {
            CliCommand::Get {
                urls,
                dir,
                connections,
                jobs,
            } => run_get(urls, dir, connections, jobs),
            CliCommand::Probe { url } => run_probe(&url),
        }
    }
}
