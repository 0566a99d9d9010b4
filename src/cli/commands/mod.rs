//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod discover;
mod probe;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use shopscan::config::{Config, Settings};

#[derive(Parser)]
#[command(name = "shopscan")]
#[command(about = "Storefront directory crawler and integration fingerprint prober")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for output CSV files (overrides config file)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Collect storefront domains for a zone from the directory
    Discover {
        /// Domain zone to crawl (top-level domain suffix)
        #[arg(default_value = "com")]
        zone: String,
        /// Last page to crawl (default: read from the directory's pagination)
        #[arg(allow_negative_numbers = true)]
        last_page: Option<i64>,
        /// Directory root URL (overrides config file)
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Probe domains from a CSV for the VerifyPass widget
    Verify {
        /// CSV file with a Domain column
        input: Option<PathBuf>,
        /// Domains probed concurrently per batch
        #[arg(short, long)]
        batch_size: Option<usize>,
    },

    /// Probe domains from a CSV for India-targeted storefronts
    Locale {
        /// CSV file with a Domain column
        input: Option<PathBuf>,
        /// Domains probed concurrently per batch
        #[arg(short, long)]
        batch_size: Option<usize>,
        /// Lowest confidence (0-100) written to the output
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        min_confidence: Option<u8>,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref()).await?;
    if let Some(dir) = cli.output_dir {
        settings.output_dir = dir;
    }

    match cli.command {
        Commands::Discover {
            zone,
            last_page,
            base_url,
        } => {
            if let Some(base_url) = base_url {
                settings.base_url = base_url.trim_end_matches('/').to_string();
            }
            discover::cmd_discover(&settings, &zone, last_page).await
        }
        Commands::Verify { input, batch_size } => {
            apply_batch_size(&mut settings, batch_size);
            let input = probe::require_input(input, "verify");
            probe::cmd_verify(&settings, &input).await
        }
        Commands::Locale {
            input,
            batch_size,
            min_confidence,
        } => {
            apply_batch_size(&mut settings, batch_size);
            let input = probe::require_input(input, "locale");
            probe::cmd_locale(&settings, &input, min_confidence).await
        }
    }
}

/// Defaults, then the config file (explicit path or discovered).
async fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let config = match config_path {
        Some(path) => Config::load_from_path(path)
            .await
            .map_err(anyhow::Error::msg)?,
        None => Config::load().await,
    };

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings);
    Ok(settings)
}

fn apply_batch_size(settings: &mut Settings, batch_size: Option<usize>) {
    if let Some(n) = batch_size.filter(|n| *n > 0) {
        settings.batch_size = n;
    }
}
