//! Source-specific HTML extraction.
//!
//! Every supported site implements [`Extractor`]. An extractor only knows
//! markup: it turns a listing page into [`RawCandidate`]s and an article page
//! into body text. Fetching, throttling and persistence live elsewhere, so a
//! new source is a new module here and nothing more.
//!
//! # Supported Sources
//!
//! | Source  | Module     | Listing container       | Body container        |
//! |---------|------------|-------------------------|-----------------------|
//! | AI News | [`ainews`] | three-column card grid  | `div#content-blocks`  |

use crate::fetcher::Fetch;
use crate::models::RawCandidate;
use scraper::{ElementRef, Node};
use tracing::{debug, instrument, warn};
use url::Url;

pub mod ainews;

/// Markup knowledge for one news site.
pub trait Extractor {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Pull every article card off a listing page.
    ///
    /// Relative links are resolved against `base_url`. A page without the
    /// expected container yields an empty vec.
    fn extract_listing(&self, html: &str, base_url: &Url) -> Vec<RawCandidate>;

    /// Visible text of an article page's content container, if present.
    fn extract_body(&self, html: &str) -> Option<String>;
}

/// Fetch an article page and extract its body text.
///
/// Body text is best-effort: fetch failures and missing containers both
/// come back as `None`.
#[instrument(level = "info", skip(fetcher, extractor))]
pub async fn fetch_body<F, E>(fetcher: &F, extractor: &E, url: &str) -> Option<String>
where
    F: Fetch,
    E: Extractor + ?Sized,
{
    let html = match fetcher.fetch(url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(error = %e, stage = "body", "Article fetch failed; continuing without content");
            return None;
        }
    };

    let body = extractor.extract_body(&html);
    match &body {
        Some(text) => debug!(bytes = text.len(), "Extracted article body"),
        None => warn!(source = extractor.name(), "No content container on article page"),
    }
    body
}

/// Resolve `href` against `base`, leaving absolute URLs untouched.
pub(crate) fn absolutize(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match base.join(href) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            debug!(%href, error = %e, "Could not resolve link");
            None
        }
    }
}

/// Text of `element`: each text node trimmed, empty ones dropped, the rest
/// joined with single spaces. `script` and `style` subtrees are skipped.
pub(crate) fn visible_text(element: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    collect_text(element, &mut parts);
    parts.join(" ")
}

fn collect_text<'a>(element: ElementRef<'a>, parts: &mut Vec<&'a str>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed);
                }
            }
            Node::Element(el) if matches!(el.name(), "script" | "style") => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, parts);
                }
            }
            _ => {}
        }
    }
}

/// Text of an inline container such as a heading: text nodes concatenated
/// as-is, then whitespace runs collapsed to single spaces.
///
/// Inline markup inside a word (`Open<em>AI</em>`) does not split it.
pub(crate) fn inline_text(element: ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `Some(text)` unless the text is empty.
pub(crate) fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}
