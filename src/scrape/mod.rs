//! Landing page discovery and article extraction.
//!
//! Scraping happens in two phases:
//!
//! 1. **Discovery** ([`discover`]): scan the landing page for headline
//!    anchors and produce a bounded, deduplicated list of candidate URLs
//! 2. **Extraction** ([`extract`]): parse one article page into an
//!    [`crate::models::Article`]
//!
//! Both phases are pure functions over markup. They never touch the
//! network, which keeps them directly testable against literal HTML.
//!
//! # Degradation
//!
//! The site's markup is not consistent across pages, so extraction leans
//! on ordered fallback chains and sentinel values instead of errors. A
//! malformed article page still produces a deliverable `Article`.

pub mod discover;
pub mod extract;

pub use discover::discover;
pub use extract::extract;
