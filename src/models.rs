//! Data models for discovered articles and their delivery artifacts.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`Article`]: content extracted from a single article page
//! - [`ImageRef`]: an image reference before any bytes have been fetched
//! - [`ResolvedImage`]: an accepted image persisted to the spool directory
//! - [`DeliveryPayload`]: the assembled email handed to the mail transport
//! - [`DedupSet`]: the set of article URLs already processed

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::error::Error;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use url::Url;

use crate::utils::slugify_title;

/// Content extracted from one article page.
///
/// The canonical absolute URL is the article's identity. The paragraph
/// sequence never contains empty entries or repeated text; extraction
/// enforces both before constructing the value. An `Article` is built once,
/// never mutated, and discarded after a single delivery attempt.
#[derive(Debug, Clone)]
pub struct Article {
    /// Canonical absolute URL the content was extracted from.
    pub url: Url,
    /// The headline, or [`Article::HEADLINE_NOT_FOUND`] when the page had none.
    pub headline: String,
    /// Deduplicated body paragraphs in first-occurrence order.
    pub paragraphs: Vec<String>,
    /// The representative image reference, when the page carried one.
    pub image: Option<ImageRef>,
}

impl Article {
    /// Placeholder headline for pages without a top-level heading.
    pub const HEADLINE_NOT_FOUND: &'static str = "Title not found";
    /// Placeholder paragraph for pages where no body could be located.
    pub const CONTENT_NOT_FOUND: &'static str = "Content not found";

    /// The body paragraphs joined with blank lines, the form the
    /// paraphrasing transform consumes.
    pub fn body_text(&self) -> String {
        self.paragraphs.join("\n\n")
    }

    /// Whether the body is the "nothing found" placeholder.
    pub fn is_placeholder_body(&self) -> bool {
        self.paragraphs.len() == 1 && self.paragraphs[0] == Self::CONTENT_NOT_FOUND
    }

    /// A filesystem-safe key derived from the article URL.
    ///
    /// Used to namespace spooled image files per article so one article's
    /// pending attachment can never clobber another's within a run. The
    /// hash suffix keeps two articles with the same trailing path segment
    /// apart.
    pub fn slug(&self) -> String {
        let stem = self
            .url
            .path_segments()
            .into_iter()
            .flatten()
            .filter(|segment| !segment.is_empty())
            .next_back()
            .map(slugify_title)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "article".to_string());

        let mut hasher = DefaultHasher::new();
        self.url.as_str().hash(&mut hasher);
        format!("{}-{:08x}", stem, hasher.finish() as u32)
    }
}

/// An image reference as found in article markup, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageRef {
    /// A fetchable absolute URL.
    Remote(Url),
    /// A `data:` URI carrying the encoded bytes inline.
    Inline(String),
}

impl ImageRef {
    /// Classify a raw `src`/`data-src` attribute value.
    ///
    /// Inline `data:` URIs are kept verbatim; anything else is resolved
    /// against the article URL. Empty or unresolvable values yield `None`,
    /// which downstream treats as "no image", not an error.
    pub fn parse(raw: &str, base: &Url) -> Option<ImageRef> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if raw.starts_with("data:") {
            return Some(ImageRef::Inline(raw.to_string()));
        }
        base.join(raw).ok().map(ImageRef::Remote)
    }
}

/// An image accepted by the resolver and persisted to the spool directory.
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    /// Where the bytes were written.
    pub path: PathBuf,
    /// The sniffed format, guaranteed to be in the configured allow-list.
    pub format: image::ImageFormat,
    /// Size of the stored file in bytes.
    pub len: u64,
}

impl ResolvedImage {
    /// MIME type for the attachment header.
    pub fn mime(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// The assembled email for one article. Constructed once, submitted to the
/// mail transport exactly once.
#[derive(Debug, Clone)]
pub struct DeliveryPayload {
    /// The article headline.
    pub subject: String,
    /// HTML body with the image reference, when present, ahead of the text.
    pub html_body: String,
    /// The image to attach inline, when one was resolved.
    pub image: Option<ResolvedImage>,
}

/// The set of article URLs already processed.
///
/// Membership is checked during discovery so an article present here is
/// never re-fetched or re-delivered. The set only grows during a run. It
/// can optionally be carried across runs as a JSON array of URL strings.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupSet {
    seen: HashSet<String>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.seen.contains(url.as_str())
    }

    /// Record a URL as processed. Returns `false` if it was already known.
    pub fn insert(&mut self, url: &Url) -> bool {
        self.seen.insert(url.as_str().to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Read a previously saved set from a JSON file.
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Persist the set as a JSON array of URL strings.
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_at(url: &str) -> Article {
        Article {
            url: Url::parse(url).unwrap(),
            headline: "Test headline".to_string(),
            paragraphs: vec!["One".to_string(), "Two".to_string()],
            image: None,
        }
    }

    #[test]
    fn test_body_text_joins_paragraphs() {
        let article = article_at("https://punchng.com/news/story");
        assert_eq!(article.body_text(), "One\n\nTwo");
    }

    #[test]
    fn test_slug_uses_last_path_segment() {
        let article = article_at("https://punchng.com/news/big-story/");
        assert!(article.slug().starts_with("big-story-"));
    }

    #[test]
    fn test_slug_differs_for_same_segment_on_different_urls() {
        let a = article_at("https://punchng.com/news/story");
        let b = article_at("https://punchng.com/sports/story");
        assert_ne!(a.slug(), b.slug());
    }

    #[test]
    fn test_slug_is_stable() {
        let article = article_at("https://punchng.com/news/story");
        assert_eq!(article.slug(), article.slug());
    }

    #[test]
    fn test_slug_falls_back_without_path() {
        let article = article_at("https://punchng.com/");
        assert!(article.slug().starts_with("article-"));
    }

    #[test]
    fn test_image_ref_resolves_relative() {
        let base = Url::parse("https://punchng.com/news/story").unwrap();
        let re = ImageRef::parse("/wp-content/photo.jpg", &base).unwrap();
        assert_eq!(
            re,
            ImageRef::Remote(Url::parse("https://punchng.com/wp-content/photo.jpg").unwrap())
        );
    }

    #[test]
    fn test_image_ref_keeps_data_uri_inline() {
        let base = Url::parse("https://punchng.com/").unwrap();
        let re = ImageRef::parse("data:image/png;base64,AAAA", &base).unwrap();
        assert!(matches!(re, ImageRef::Inline(_)));
    }

    #[test]
    fn test_image_ref_rejects_empty() {
        let base = Url::parse("https://punchng.com/").unwrap();
        assert_eq!(ImageRef::parse("  ", &base), None);
    }

    #[test]
    fn test_dedup_set_membership() {
        let mut set = DedupSet::new();
        let url = Url::parse("https://punchng.com/news/story").unwrap();
        assert!(set.is_empty());
        assert!(!set.contains(&url));
        assert!(set.insert(&url));
        assert!(set.contains(&url));
        assert!(!set.insert(&url));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_dedup_set_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut set = DedupSet::new();
        set.insert(&Url::parse("https://punchng.com/a").unwrap());
        set.insert(&Url::parse("https://punchng.com/b").unwrap());
        set.save(&path).unwrap();

        let restored = DedupSet::load(&path).unwrap();
        assert_eq!(restored.len(), 2);
        assert!(restored.contains(&Url::parse("https://punchng.com/a").unwrap()));
    }
}
