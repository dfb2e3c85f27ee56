//! Image acquisition and validation.
//!
//! Article images arrive in two encodings: a remote URL to fetch, or a
//! base64 `data:` URI carried inline in the markup. Both branches funnel
//! into the same validation: sniff the decoded bytes, check the format
//! against the allow-list, prove the bytes actually decode as an image,
//! then spool them to a per-article file. Every failure downgrades to
//! "no image" for that article.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::ImageFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

use crate::config::ImageConfig;
use crate::error::ImageError;
use crate::fetch::PageFetcher;
use crate::models::{ImageRef, ResolvedImage};

/// `data:image/<subtype>;base64,<payload>`; other data URI forms are not
/// served by the site and are rejected.
static DATA_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^data:image/[a-z0-9.+-]+;base64,(?<payload>.*)$").unwrap()
});

/// Resolves an [`ImageRef`] into validated bytes on disk.
pub struct ImageResolver {
    fetcher: PageFetcher,
    allowed: Vec<ImageFormat>,
    spool_dir: PathBuf,
}

impl ImageResolver {
    pub fn new(fetcher: PageFetcher, config: &ImageConfig) -> Self {
        Self {
            fetcher,
            allowed: config.allow_list(),
            spool_dir: config.spool_dir.clone(),
        }
    }

    /// Resolve one reference, keyed by the owning article's slug.
    ///
    /// Returns `None` on any failure; the article is still delivered,
    /// just without an image.
    #[instrument(level = "info", skip_all, fields(key))]
    pub async fn resolve(&self, key: &str, image_ref: &ImageRef) -> Option<ResolvedImage> {
        match self.try_resolve(key, image_ref).await {
            Ok(image) => {
                info!(
                    path = %image.path.display(),
                    format = ?image.format,
                    bytes = image.len,
                    "Stored article image"
                );
                Some(image)
            }
            Err(e) => {
                warn!(error = %e, "Image rejected; delivering without it");
                None
            }
        }
    }

    async fn try_resolve(&self, key: &str, image_ref: &ImageRef) -> Result<ResolvedImage, ImageError> {
        let bytes = match image_ref {
            ImageRef::Inline(uri) => decode_data_uri(uri)?,
            ImageRef::Remote(url) => self.fetcher.fetch_bytes(url).await?,
        };

        let format = image::guess_format(&bytes)?;
        if !self.allowed.contains(&format) {
            return Err(ImageError::UnsupportedFormat(format));
        }
        // Sniffing only inspects the header; make sure the body decodes too.
        image::load_from_memory_with_format(&bytes, format)?;

        let extension = format.extensions_str().first().copied().unwrap_or("img");
        tokio::fs::create_dir_all(&self.spool_dir).await?;
        let path = self.spool_dir.join(format!("{key}.{extension}"));
        tokio::fs::write(&path, &bytes).await?;

        Ok(ResolvedImage { path, format, len: bytes.len() as u64 })
    }
}

/// Split the scheme prefix off a `data:` URI and decode the payload.
fn decode_data_uri(uri: &str) -> Result<Vec<u8>, ImageError> {
    let captures = DATA_URI.captures(uri).ok_or(ImageError::MalformedDataUri)?;
    let payload: String = captures["payload"]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    Ok(BASE64.decode(payload.as_bytes())?)
}
