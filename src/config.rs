//! Configuration loading for the pipeline.
//!
//! All knobs live in a single YAML file read once at startup and immutable
//! for the rest of the run. Secrets (the SMTP password and the paraphrase
//! API key) are deliberately absent from the file; they arrive through the
//! environment via the CLI.
//!
//! # Example
//!
//! ```yaml
//! site:
//!   base_url: https://punchng.com/
//!   max_articles: 10
//! paraphrase:
//!   api_base: http://localhost:8080/v1
//!   model: t5-small
//! mail:
//!   smtp_host: smtp.gmail.com
//!   sender: sender@example.com
//!   recipient: posts@blogger.example
//! ```

use serde::Deserialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use url::Url;

/// Top-level configuration, one section per collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub site: SiteConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub paraphrase: ParaphraseConfig,
    pub mail: MailConfig,
    #[serde(default)]
    pub images: ImageConfig,
}

/// The news site to watch and how much of it to take per run.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Landing page listing current articles. Relative article links are
    /// resolved against this URL.
    pub base_url: Url,
    /// Upper bound on candidate articles per run. Keeps a single pass from
    /// turning into an unbounded delivery burst.
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,
}

/// HTTP client settings shared by page and image fetches.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    /// Client identity sent with every request. The site rejects default
    /// library identities.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// The OpenAI-compatible endpoint that performs the paraphrasing.
#[derive(Debug, Clone, Deserialize)]
pub struct ParaphraseConfig {
    /// Base URL of the API, e.g. `http://localhost:8080/v1`.
    pub api_base: String,
    /// Model name passed through to the endpoint.
    pub model: String,
    /// Bound on the rewritten output length.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Cap on how long one paraphrase call may stall the run.
    #[serde(default = "default_paraphrase_timeout_secs")]
    pub timeout_secs: u64,
}

/// SMTP session settings. The password comes from the environment, not
/// from this file.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Login name for the SMTP session. Defaults to the sender address.
    #[serde(default)]
    pub username: Option<String>,
    pub sender: String,
    pub recipient: String,
}

/// Image acceptance and storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    /// Formats accepted for delivery, by common extension name.
    #[serde(default = "default_allowed_formats")]
    pub allowed_formats: Vec<String>,
    /// Where accepted images are spooled until their article is delivered.
    #[serde(default = "default_spool_dir")]
    pub spool_dir: PathBuf,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            allowed_formats: default_allowed_formats(),
            spool_dir: default_spool_dir(),
        }
    }
}

impl ImageConfig {
    /// The allow-list mapped to concrete formats. Unknown names are
    /// dropped rather than rejected so a config typo disables one format,
    /// not the whole pipeline.
    pub fn allow_list(&self) -> Vec<image::ImageFormat> {
        self.allowed_formats
            .iter()
            .filter_map(|name| image::ImageFormat::from_extension(name))
            .collect()
    }
}

fn default_max_articles() -> usize {
    10
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}

fn default_max_tokens() -> u32 {
    512
}

fn default_paraphrase_timeout_secs() -> u64 {
    120
}

fn default_smtp_port() -> u16 {
    587
}

fn default_allowed_formats() -> Vec<String> {
    vec!["jpeg".to_string(), "png".to_string(), "webp".to_string()]
}

fn default_spool_dir() -> PathBuf {
    std::env::temp_dir().join("punch_news_mailer")
}

/// Load and parse the YAML configuration file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_config(path: &Path) -> Result<AppConfig, Box<dyn Error>> {
    let raw = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml::from_str(&raw)?;
    info!(
        site = %config.site.base_url,
        max_articles = config.site.max_articles,
        "Loaded configuration"
    );
    Ok(config)
}
