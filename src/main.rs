//! # Punch News Mailer
//!
//! A content-ingestion pipeline that watches the Punch Newspaper landing
//! page for newly published articles, extracts their text and featured
//! image, paraphrases the text through an OpenAI-compatible model, and
//! delivers each article as an HTML email to a blog's posting address.
//!
//! ## Architecture
//!
//! One process run performs a single discovery-to-delivery pass:
//! 1. **Discovery**: collect new article URLs from the landing page
//! 2. **Extraction**: parse each article into headline, body and image
//! 3. **Resolution**: fetch or decode the image, gate it by format
//! 4. **Rewriting**: paraphrase the body, falling back to the original
//! 5. **Delivery**: assemble the email and hand it to the SMTP relay
//!
//! Articles are processed sequentially and failures are isolated per
//! article. The set of processed URLs can be carried across runs with
//! `--state-file`.
//!
//! ## Usage
//!
//! ```sh
//! SMTP_PASSWORD=... punch_news_mailer --config config.yaml --state-file seen.json
//! ```

use clap::Parser;
use std::error::Error;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod deliver;
mod error;
mod fetch;
mod images;
mod models;
mod pipeline;
mod rewrite;
mod scrape;
mod utils;

use cli::Cli;
use config::load_config;
use deliver::{DryRunMailer, MailTransport, SmtpMailer};
use fetch::PageFetcher;
use images::ImageResolver;
use models::DedupSet;
use pipeline::{Pipeline, RunReport};
use rewrite::{OpenAiParaphraser, Paraphrase, RetryRewrite, Rewriter};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("punch_news_mailer starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.state_file, dry_run = args.dry_run, "Parsed CLI arguments");

    let mut config = load_config(&args.config)?;
    if let Some(max) = args.max_articles {
        debug!(max, "Overriding candidate bound from the command line");
        config.site.max_articles = max;
    }

    // Early check: the image spool directory must be writable
    ensure_writable_dir(&config.images.spool_dir).await?;

    let dedup = match args.state_file.as_deref() {
        Some(path) if path.exists() => {
            let set = DedupSet::load(path)?;
            info!(path = %path.display(), known_urls = set.len(), "Loaded dedup state");
            set
        }
        _ => DedupSet::new(),
    };

    // ---- Build collaborators ----
    let fetcher = PageFetcher::new(&config.fetch)?;
    let resolver = ImageResolver::new(fetcher.clone(), &config.images);
    let backend = OpenAiParaphraser::new(&config.paraphrase, args.paraphrase_api_key.clone())?;
    let backend = RetryRewrite::new(backend, 2, Duration::from_secs(1));
    let rewriter = Rewriter::new(backend, config.paraphrase.max_tokens);

    // ---- Run one pass ----
    let report = if args.dry_run {
        info!("Dry run; payloads will be logged, not sent");
        let pipeline =
            Pipeline::new(fetcher, resolver, rewriter, DryRunMailer, &config.site, dedup);
        run(pipeline, &args).await?
    } else {
        let password = args
            .smtp_password
            .clone()
            .ok_or("SMTP_PASSWORD must be set unless --dry-run is given")?;
        let mailer = SmtpMailer::new(&config.mail, password)?;
        let pipeline = Pipeline::new(fetcher, resolver, rewriter, mailer, &config.site, dedup);
        run(pipeline, &args).await?
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        discovered = report.discovered,
        delivered = report.delivered,
        failed = report.failed,
        "Execution complete"
    );
    Ok(())
}

/// Drive one pipeline pass with interrupt handling and state persistence.
async fn run<P, M>(mut pipeline: Pipeline<P, M>, args: &Cli) -> Result<RunReport, Box<dyn Error>>
where
    P: Paraphrase,
    M: MailTransport,
{
    // Ctrl-C stops the run at the next between-articles checkpoint.
    let cancel = pipeline.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing the current article, then stopping");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    let report = pipeline.run_once().await?;

    if let Some(path) = &args.state_file {
        pipeline.dedup().save(path)?;
        info!(
            path = %path.display(),
            known_urls = pipeline.dedup().len(),
            "Saved dedup state"
        );
    }
    Ok(report)
}
