//! Article page extraction.
//!
//! Page markup varies across the site, so the body container is resolved
//! through an ordered strategy list: the named entry-content container,
//! then the generic article container, then every paragraph on the page.
//! The first strategy that yields at least one kept paragraph wins.
//! Extraction never fails; a page missing a headline or a body produces
//! sentinel values so the rest of the pipeline can still run.

use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::models::{Article, ImageRef};

static HEADLINE: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static ENTRY_CONTENT: Lazy<Selector> = Lazy::new(|| Selector::parse("div.entry-content").unwrap());
static ARTICLE_CONTAINER: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static IMG_DIRECT: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());
static IMG_LAZY: Lazy<Selector> = Lazy::new(|| Selector::parse("img[data-src]").unwrap());

struct BodyStrategy {
    name: &'static str,
    container: Option<&'static Lazy<Selector>>,
}

/// Body container strategies, tried in order. `None` means "every
/// paragraph on the page", the last resort.
static BODY_STRATEGIES: &[BodyStrategy] = &[
    BodyStrategy { name: "entry-content", container: Some(&ENTRY_CONTENT) },
    BodyStrategy { name: "article", container: Some(&ARTICLE_CONTAINER) },
    BodyStrategy { name: "page-paragraphs", container: None },
];

/// Where the body paragraphs came from; image lookup is scoped to it.
enum BodyScope<'a> {
    Container(ElementRef<'a>),
    Page,
    Missing,
}

/// Parse one article page into an [`Article`].
///
/// The headline is the first top-level heading, or a placeholder when the
/// page has none. Paragraph text is trimmed, empties are dropped, and
/// exact repeats (the related-article teasers the site repeats verbatim)
/// are dropped keeping the first occurrence. The image reference prefers
/// a direct `src` and falls back to the lazy-load `data-src`; its absence
/// is not an error.
#[instrument(level = "debug", skip_all, fields(url = %url))]
pub fn extract(markup: &str, url: &Url) -> Article {
    let document = Html::parse_document(markup);

    let headline = document
        .select(&HEADLINE)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| {
            warn!(%url, "No headline found; using placeholder");
            Article::HEADLINE_NOT_FOUND.to_string()
        });

    let mut paragraphs: Vec<String> = Vec::new();
    let mut scope = BodyScope::Missing;
    for strategy in BODY_STRATEGIES {
        match strategy.container {
            Some(selector) => {
                if let Some(container) = document.select(selector).next() {
                    let collected = collect_paragraphs(container.select(&PARAGRAPH));
                    if !collected.is_empty() {
                        debug!(strategy = strategy.name, count = collected.len(), "Body resolved");
                        paragraphs = collected;
                        scope = BodyScope::Container(container);
                        break;
                    }
                }
            }
            None => {
                let collected = collect_paragraphs(document.select(&PARAGRAPH));
                if !collected.is_empty() {
                    debug!(strategy = strategy.name, count = collected.len(), "Body resolved");
                    paragraphs = collected;
                    scope = BodyScope::Page;
                    break;
                }
            }
        }
    }

    if paragraphs.is_empty() {
        warn!(%url, "No body content found; using placeholder");
        paragraphs.push(Article::CONTENT_NOT_FOUND.to_string());
    }

    let image = image_attr(&document, &scope).and_then(|raw| ImageRef::parse(raw, url));

    Article { url: url.clone(), headline, paragraphs, image }
}

/// Trim, drop empties, drop exact repeats, keep first-occurrence order.
fn collect_paragraphs<'a>(iter: impl Iterator<Item = ElementRef<'a>>) -> Vec<String> {
    iter.map(|p| element_text(p))
        .filter(|text| !text.is_empty())
        .unique()
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn image_attr<'a>(document: &'a Html, scope: &BodyScope<'a>) -> Option<&'a str> {
    match scope {
        BodyScope::Container(container) => {
            first_attr(container.select(&IMG_DIRECT), "src")
                .or_else(|| first_attr(container.select(&IMG_LAZY), "data-src"))
        }
        BodyScope::Page => first_attr(document.select(&IMG_DIRECT), "src")
            .or_else(|| first_attr(document.select(&IMG_LAZY), "data-src")),
        BodyScope::Missing => None,
    }
}

fn first_attr<'a>(mut iter: impl Iterator<Item = ElementRef<'a>>, name: &str) -> Option<&'a str> {
    iter.find_map(|element| {
        element
            .value()
            .attr(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    })
}
