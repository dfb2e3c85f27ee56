//! Paraphrasing through an external transform, with fail-open delivery.
//!
//! The transform is abstracted behind the narrow [`Paraphrase`] trait so
//! the concrete backend is swappable and mockable:
//! - [`OpenAiParaphraser`]: talks to an OpenAI-compatible chat completions
//!   endpoint
//! - [`RetryRewrite`]: decorator adding exponential backoff with jitter to
//!   any backend
//! - [`Rewriter`]: the pipeline-facing wrapper; on any backend failure it
//!   returns the original text unchanged, because a paraphrasing outage
//!   must never block delivery of the content itself
//!
//! # Backoff Strategy
//!
//! The delay between retries follows this formula:
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use rand::{Rng, rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::config::ParaphraseConfig;
use crate::error::TransformError;
use crate::utils::truncate_for_log;

/// Instruction sent ahead of every article body.
const SYSTEM_PROMPT: &str = "You rewrite news articles. Paraphrase the text you are given, \
    keeping every fact, name and figure intact, and keep the paragraph breaks. \
    Reply with the rewritten text only.";

/// Trait for the external paraphrasing transform.
///
/// Implementors send text out for rewriting and either return the
/// rewritten text or signal failure. The caller imposes its own policy on
/// failures; implementations should not swallow them.
pub trait Paraphrase {
    /// Rewrite `text`, bounding the output length by `max_tokens`.
    async fn rewrite(&self, text: &str, max_tokens: u32) -> Result<String, TransformError>;
}

/// Backend for OpenAI-compatible chat completions endpoints.
#[derive(Debug)]
pub struct OpenAiParaphraser {
    client: Client,
    chat_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiParaphraser {
    pub fn new(config: &ParaphraseConfig, api_key: Option<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            chat_url: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl Paraphrase for OpenAiParaphraser {
    #[instrument(level = "info", skip_all, fields(chars = text.len()))]
    async fn rewrite(&self, text: &str, max_tokens: u32) -> Result<String, TransformError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: text },
            ],
            max_tokens,
            temperature: 0.7,
        };

        let mut builder = self.client.post(&self.chat_url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let t0 = Instant::now();
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, elapsed_ms = t0.elapsed().as_millis() as u128, "Paraphrase call rejected");
            return Err(TransformError::Api(status));
        }

        let parsed: ChatResponse = response.json().await?;
        let rewritten = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(TransformError::EmptyResponse)?;

        info!(elapsed_ms = t0.elapsed().as_millis() as u128, "Paraphrase call succeeded");
        Ok(rewritten.trim().to_string())
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Paraphrase`]
/// implementation. Retries are bounded so one stuck article cannot stall
/// the run indefinitely.
#[derive(Debug)]
pub struct RetryRewrite<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> RetryRewrite<T>
where
    T: Paraphrase,
{
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl<T> Paraphrase for RetryRewrite<T>
where
    T: Paraphrase,
{
    #[instrument(level = "info", skip_all)]
    async fn rewrite(&self, text: &str, max_tokens: u32) -> Result<String, TransformError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.rewrite(text, max_tokens).await {
                Ok(rewritten) => return Ok(rewritten),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u128,
                            error = %e,
                            "rewrite() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "rewrite() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Pipeline-facing rewriter with the fail-open contract.
#[derive(Debug)]
pub struct Rewriter<P> {
    backend: P,
    max_tokens: u32,
}

impl<P> Rewriter<P>
where
    P: Paraphrase,
{
    pub fn new(backend: P, max_tokens: u32) -> Self {
        Self { backend, max_tokens }
    }

    /// Rewrite the article body, falling back to the original on failure.
    ///
    /// Empty input is returned as-is without invoking the backend.
    #[instrument(level = "info", skip_all, fields(chars = text.len()))]
    pub async fn rewrite(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }

        match self.backend.rewrite(text, self.max_tokens).await {
            Ok(rewritten) => {
                debug!(
                    preview = %truncate_for_log(&rewritten, 1000),
                    "Paraphrased content"
                );
                rewritten
            }
            Err(e) => {
                warn!(error = %e, "Paraphrase failed; delivering original text");
                text.to_string()
            }
        }
    }
}
