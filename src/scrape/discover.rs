//! Candidate article discovery on the landing page.
//!
//! The landing page lists current stories as headline elements wrapping
//! anchors. Selector strategies are tried in priority order and the first
//! one that yields any candidate wins, so a site-side template change
//! degrades to the next strategy instead of an empty run.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, instrument};
use url::Url;

use crate::models::DedupSet;

/// Headline-anchor structures in priority order.
static CANDIDATE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["h2 a[href]", "h3 a[href]", "article a[href]"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

/// Scan landing page markup for new article URLs.
///
/// Document order is preserved and the first occurrence wins when the same
/// URL appears twice on the page. URLs already in `seen` are skipped, and
/// the result is capped at `max` candidates. Headline elements without an
/// anchor and anchors with an empty href are skipped, not errors.
#[instrument(level = "info", skip_all, fields(base = %base, max))]
pub fn discover(markup: &str, base: &Url, seen: &DedupSet, max: usize) -> Vec<Url> {
    if max == 0 {
        debug!("Candidate bound is zero; nothing to discover");
        return Vec::new();
    }

    let document = Html::parse_document(markup);
    let mut candidates: Vec<Url> = Vec::new();
    let mut in_batch: HashSet<String> = HashSet::new();

    for selector in CANDIDATE_SELECTORS.iter() {
        for element in document.select(selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            if href.is_empty() {
                continue;
            }
            let Ok(resolved) = base.join(href) else {
                debug!(href, "Skipping unresolvable link");
                continue;
            };
            if seen.contains(&resolved) {
                debug!(url = %resolved, "Skipping already processed article");
                continue;
            }
            if !in_batch.insert(resolved.to_string()) {
                continue;
            }
            candidates.push(resolved);
            if candidates.len() >= max {
                break;
            }
        }
        // First selector strategy that produced candidates wins.
        if !candidates.is_empty() {
            break;
        }
    }

    info!(count = candidates.len(), "Discovered candidate articles");
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://punchng.com/").unwrap()
    }

    const LANDING: &str = r#"
        <html><body>
            <h2><a href="/news/first-story">First</a></h2>
            <h2><a href="https://punchng.com/news/second-story">Second</a></h2>
            <h2>No anchor here</h2>
            <h2><a href="">Empty href</a></h2>
            <h2><a href="/news/first-story">First again</a></h2>
            <h2><a href="/news/third-story">Third</a></h2>
        </body></html>
    "#;

    #[test]
    fn test_discover_preserves_document_order() {
        let urls = discover(LANDING, &base(), &DedupSet::new(), 10);
        let paths: Vec<&str> = urls.iter().map(|u| u.path()).collect();
        assert_eq!(
            paths,
            vec!["/news/first-story", "/news/second-story", "/news/third-story"]
        );
    }

    #[test]
    fn test_discover_first_seen_wins_on_repeats() {
        let urls = discover(LANDING, &base(), &DedupSet::new(), 10);
        let firsts = urls.iter().filter(|u| u.path() == "/news/first-story").count();
        assert_eq!(firsts, 1);
    }

    #[test]
    fn test_discover_caps_candidates() {
        let urls = discover(LANDING, &base(), &DedupSet::new(), 2);
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].path(), "/news/first-story");
    }

    #[test]
    fn test_discover_skips_seen_urls() {
        let mut seen = DedupSet::new();
        seen.insert(&Url::parse("https://punchng.com/news/second-story").unwrap());

        let urls = discover(LANDING, &base(), &seen, 10);
        assert!(urls.iter().all(|u| u.path() != "/news/second-story"));
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn test_discover_is_idempotent_once_all_urls_are_seen() {
        let mut seen = DedupSet::new();
        for url in discover(LANDING, &base(), &seen, 10) {
            seen.insert(&url);
        }
        assert!(discover(LANDING, &base(), &seen, 10).is_empty());
    }

    #[test]
    fn test_discover_falls_back_to_article_anchors() {
        let markup = r#"
            <html><body>
                <article><a href="/news/only-story">Only</a></article>
            </body></html>
        "#;
        let urls = discover(markup, &base(), &DedupSet::new(), 10);
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].path(), "/news/only-story");
    }

    #[test]
    fn test_discover_empty_page_yields_nothing() {
        let urls = discover("<html><body></body></html>", &base(), &DedupSet::new(), 10);
        assert!(urls.is_empty());
    }
}
