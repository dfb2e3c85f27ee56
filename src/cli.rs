//! Command-line interface definitions for the Punch news mailer.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Secrets can only be provided via environment variables so they never
//! appear in shell history or process listings.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for one pipeline run.
///
/// # Examples
///
/// ```sh
/// # Basic usage with the default config path
/// punch_news_mailer
///
/// # Carry the processed-URL set across runs
/// punch_news_mailer --state-file ./seen_urls.json
///
/// # Inspect payloads without sending anything
/// punch_news_mailer --dry-run --max-articles 1
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Override the per-run candidate bound from the config file
    #[arg(long)]
    pub max_articles: Option<usize>,

    /// JSON file holding the processed-URL set; read at startup and
    /// rewritten after the run
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Assemble payloads and log them instead of sending email
    #[arg(long)]
    pub dry_run: bool,

    /// SMTP password for the sending account
    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,

    /// API key for the paraphrasing endpoint, if it requires one
    #[arg(long, env = "PARAPHRASE_API_KEY", hide_env_values = true)]
    pub paraphrase_api_key: Option<String>,
}
