//! AI News (<https://www.ainews.com>) scraper.
//!
//! The homepage is a Tailwind grid of article cards. Class lists are matched
//! exactly, since the site's utility classes are shared by unrelated
//! containers.
//!
//! Card layout:
//!
//! ```text
//! div.grid (three columns)
//! └── div.card
//!     ├── img.cover          -> image_url
//!     └── div.space-y-3
//!         ├── a[href]        -> anchor_link
//!         ├── h2             -> title
//!         ├── p              -> short_desc
//!         └── time[datetime] -> timestamp
//! ```

use super::{Extractor, absolutize, inline_text, non_empty, visible_text};
use crate::models::RawCandidate;
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

static GRID: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[class="grid grid-cols-1 gap-6 md:grid-cols-2 lg:grid-cols-3"]"#).unwrap()
});
static CARD: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"div[class="transparent h-full cursor-pointer overflow-hidden rounded-lg flex flex-col border"]"#,
    )
    .unwrap()
});
static COVER_IMAGE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"img[class="absolute inset-0 h-full w-full object-cover"]"#).unwrap()
});
static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h2").unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());
static LINK_BLOCK: Lazy<Selector> = Lazy::new(|| Selector::parse("div.space-y-3").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static CONTENT: Lazy<Selector> = Lazy::new(|| Selector::parse("div#content-blocks").unwrap());

/// Extractor for the AI News homepage and article pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct AiNewsExtractor;

impl AiNewsExtractor {
    fn extract_card(card: ElementRef<'_>, base_url: &Url) -> RawCandidate {
        let title = first(card, &HEADING).map(inline_text).and_then(non_empty);
        let short_desc = first(card, &PARAGRAPH).map(inline_text).and_then(non_empty);
        let image_url = first(card, &COVER_IMAGE)
            .and_then(|img| img.value().attr("src"))
            .and_then(|src| absolutize(base_url, src));
        let timestamp = first(card, &TIME)
            .and_then(|t| t.value().attr("datetime"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let anchor_link = first(card, &LINK_BLOCK)
            .and_then(|block| block.select(&LINK).next())
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| absolutize(base_url, href));

        RawCandidate {
            title,
            short_desc,
            image_url,
            timestamp,
            anchor_link,
        }
    }
}

fn first<'a>(scope: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    scope.select(selector).next()
}

impl Extractor for AiNewsExtractor {
    fn name(&self) -> &str {
        "ainews"
    }

    fn extract_listing(&self, html: &str, base_url: &Url) -> Vec<RawCandidate> {
        let document = Html::parse_document(html);

        let Some(grid) = document.select(&GRID).next() else {
            warn!(source = self.name(), "Could not find main content grid");
            debug!(preview = %truncate_for_log(html, 300), "Listing page without grid");
            return Vec::new();
        };

        let candidates: Vec<RawCandidate> = grid
            .select(&CARD)
            .map(|card| Self::extract_card(card, base_url))
            .collect();

        info!(count = candidates.len(), source = self.name(), "Found articles");
        debug!(candidates = ?candidates, "Listing candidates");
        candidates
    }

    fn extract_body(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let content = document.select(&CONTENT).next()?;
        non_empty(visible_text(content))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Listing page with one fully populated card and one sparse card.
    pub(crate) const LISTING: &str = r#"
<html><body>
  <div class="grid grid-cols-1 gap-6 md:grid-cols-2 lg:grid-cols-3">
    <div class="transparent h-full cursor-pointer overflow-hidden rounded-lg flex flex-col border">
      <div class="relative">
        <img class="absolute inset-0 h-full w-full object-cover" src="/images/robot.png" alt="">
      </div>
      <div class="space-y-3">
        <a href="/p/robots-learn-to-read">
          <h2> Robots learn to read </h2>
        </a>
        <p>A short description.</p>
        <time datetime="2025-05-06T14:30:00.000Z">May 6</time>
      </div>
    </div>
    <div class="transparent h-full cursor-pointer overflow-hidden rounded-lg flex flex-col border">
      <h2>Only a title</h2>
    </div>
  </div>
</body></html>
"#;

    fn base() -> Url {
        Url::parse("https://www.ainews.com/").unwrap()
    }

    #[test]
    fn test_extract_listing_full_card() {
        let candidates = AiNewsExtractor.extract_listing(LISTING, &base());
        assert_eq!(candidates.len(), 2);

        let full = &candidates[0];
        assert_eq!(full.title.as_deref(), Some("Robots learn to read"));
        assert_eq!(full.short_desc.as_deref(), Some("A short description."));
        assert_eq!(
            full.image_url.as_deref(),
            Some("https://www.ainews.com/images/robot.png")
        );
        assert_eq!(full.timestamp.as_deref(), Some("2025-05-06T14:30:00.000Z"));
        assert_eq!(
            full.anchor_link.as_deref(),
            Some("https://www.ainews.com/p/robots-learn-to-read")
        );
    }

    #[test]
    fn test_extract_listing_sparse_card_keeps_present_fields() {
        let candidates = AiNewsExtractor.extract_listing(LISTING, &base());
        let sparse = &candidates[1];
        assert_eq!(sparse.title.as_deref(), Some("Only a title"));
        assert_eq!(sparse.short_desc, None);
        assert_eq!(sparse.image_url, None);
        assert_eq!(sparse.timestamp, None);
        assert_eq!(sparse.anchor_link, None);
    }

    #[test]
    fn test_missing_grid_is_empty() {
        let html = r#"<div class="grid"><div class="card"><h2>x</h2></div></div>"#;
        assert!(AiNewsExtractor.extract_listing(html, &base()).is_empty());
    }

    #[test]
    fn test_title_with_inline_markup() {
        let html = r#"
<div class="grid grid-cols-1 gap-6 md:grid-cols-2 lg:grid-cols-3">
  <div class="transparent h-full cursor-pointer overflow-hidden rounded-lg flex flex-col border">
    <div class="space-y-3">
      <a href="/p/openai"><h2>Open<em>AI</em>'s model</h2></a>
      <p>Now with <strong>more</strong> <a href="/x">links</a>.</p>
    </div>
  </div>
</div>"#;
        let candidates = AiNewsExtractor.extract_listing(html, &base());
        assert_eq!(candidates[0].title.as_deref(), Some("OpenAI's model"));
        assert_eq!(
            candidates[0].short_desc.as_deref(),
            Some("Now with more links.")
        );
    }

    #[test]
    fn test_absolute_image_url_is_kept() {
        let html = r#"
<div class="grid grid-cols-1 gap-6 md:grid-cols-2 lg:grid-cols-3">
  <div class="transparent h-full cursor-pointer overflow-hidden rounded-lg flex flex-col border">
    <img class="absolute inset-0 h-full w-full object-cover" src="https://cdn.example.com/x.jpg">
  </div>
</div>"#;
        let candidates = AiNewsExtractor.extract_listing(html, &base());
        assert_eq!(
            candidates[0].image_url.as_deref(),
            Some("https://cdn.example.com/x.jpg")
        );
    }

    #[test]
    fn test_extract_body() {
        let html = r#"
<html><body>
  <nav>Menu</nav>
  <div id="content-blocks">
    <p>First   paragraph.</p>
    <script>track();</script>
    <style>.x { color: red }</style>
    <p>Second <em>paragraph</em>.</p>
  </div>
</body></html>"#;
        assert_eq!(
            AiNewsExtractor.extract_body(html).as_deref(),
            Some("First   paragraph. Second paragraph .")
        );
    }

    #[test]
    fn test_extract_body_missing_container() {
        assert_eq!(AiNewsExtractor.extract_body("<div>nothing</div>"), None);
        assert_eq!(
            AiNewsExtractor.extract_body(r#"<div id="content-blocks"> </div>"#),
            None
        );
    }
}
