//! The discovery-to-delivery pipeline for one run.
//!
//! One run moves through `Idle → Discovering → PerArticle → Idle`. The
//! landing page fetch is the only failure that aborts the run; every
//! per-article failure is logged with its URL and stage, and the runner
//! advances to the next candidate. Articles are processed strictly
//! sequentially so delivery order matches discovery order and the
//! paraphrasing endpoint and SMTP relay are never used concurrently.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::SiteConfig;
use crate::deliver::{MailTransport, assemble};
use crate::error::{DeliveryError, FetchError};
use crate::fetch::PageFetcher;
use crate::images::ImageResolver;
use crate::models::DedupSet;
use crate::rewrite::{Paraphrase, Rewriter};
use crate::scrape::{discover, extract};
use crate::utils::truncate_for_log;

/// Per-article phase, attached to logs so failures name where they
/// happened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    Extracting,
    Resolving,
    Rewriting,
    Delivering,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extracting => "extracting",
            Stage::Resolving => "resolving",
            Stage::Rewriting => "rewriting",
            Stage::Delivering => "delivering",
        };
        f.write_str(name)
    }
}

/// A failure that ends one article's processing. Image and paraphrase
/// problems never reach this type; those stages degrade instead.
#[derive(Debug, Error)]
pub enum ArticleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl ArticleError {
    fn stage(&self) -> Stage {
        match self {
            ArticleError::Fetch(_) => Stage::Extracting,
            ArticleError::Delivery(_) => Stage::Delivering,
        }
    }
}

/// Counts for one completed run.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RunReport {
    pub discovered: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Owns the collaborators and the dedup set for the lifetime of a run.
pub struct Pipeline<P, M> {
    fetcher: PageFetcher,
    resolver: ImageResolver,
    rewriter: Rewriter<P>,
    mailer: M,
    dedup: DedupSet,
    base_url: Url,
    max_articles: usize,
    cancel: Arc<AtomicBool>,
}

impl<P, M> Pipeline<P, M>
where
    P: Paraphrase,
    M: MailTransport,
{
    pub fn new(
        fetcher: PageFetcher,
        resolver: ImageResolver,
        rewriter: Rewriter<P>,
        mailer: M,
        site: &SiteConfig,
        dedup: DedupSet,
    ) -> Self {
        Self {
            fetcher,
            resolver,
            rewriter,
            mailer,
            dedup,
            base_url: site.base_url.clone(),
            max_articles: site.max_articles,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked between articles; setting it stops the run at the
    /// next checkpoint without cutting the current article short.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// The processed-URL set, for persisting after the run.
    pub fn dedup(&self) -> &DedupSet {
        &self.dedup
    }

    /// Execute one discovery-to-delivery pass.
    ///
    /// Fails only when the landing page itself cannot be fetched; no
    /// candidates can be discovered in that case.
    #[instrument(level = "info", skip(self), fields(site = %self.base_url))]
    pub async fn run_once(&mut self) -> Result<RunReport, FetchError> {
        info!("Discovering candidate articles");
        let landing = self.fetcher.fetch(&self.base_url).await?;
        let candidates = discover(&landing, &self.base_url, &self.dedup, self.max_articles);

        let mut report = RunReport {
            discovered: candidates.len(),
            ..RunReport::default()
        };

        for url in candidates {
            if self.cancel.load(Ordering::Relaxed) {
                warn!(
                    delivered = report.delivered,
                    failed = report.failed,
                    "Cancellation requested; stopping before the next article"
                );
                break;
            }

            // Marked processed up front: a candidate that fails is not
            // retried on a later pass.
            self.dedup.insert(&url);

            match self.process_article(&url).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    error!(
                        %url,
                        stage = %e.stage(),
                        error = %e,
                        "Article failed; continuing with the next candidate"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            discovered = report.discovered,
            delivered = report.delivered,
            failed = report.failed,
            "Run complete"
        );
        Ok(report)
    }

    async fn process_article(&self, url: &Url) -> Result<(), ArticleError> {
        debug!(%url, stage = %Stage::Extracting, "Fetching article page");
        let markup = self.fetcher.fetch(url).await?;
        let article = extract(&markup, url);
        info!(
            %url,
            headline = %article.headline,
            paragraphs = article.paragraphs.len(),
            has_image = article.image.is_some(),
            "Extracted article"
        );
        let original = article.body_text();
        debug!(preview = %truncate_for_log(&original, 1000), "Original content");

        let image = match &article.image {
            Some(image_ref) => {
                debug!(%url, stage = %Stage::Resolving, "Resolving article image");
                self.resolver.resolve(&article.slug(), image_ref).await
            }
            None => None,
        };

        // No point round-tripping the placeholder body through the model.
        let rewritten = if article.is_placeholder_body() {
            original.clone()
        } else {
            debug!(%url, stage = %Stage::Rewriting, "Paraphrasing article body");
            self.rewriter.rewrite(&original).await
        };

        debug!(%url, stage = %Stage::Delivering, "Assembling and sending payload");
        let payload = assemble(&article, &rewritten, image);
        self.mailer.send(&payload).await?;
        info!(%url, subject = %payload.subject, "Delivered article");
        Ok(())
    }
}
