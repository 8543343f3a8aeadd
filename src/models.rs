//! Data models for scraped articles and the persisted dataset.
//!
//! - [`RawCandidate`]: fields pulled off one listing card, before normalization
//! - [`Article`]: the canonical record stored in both dataset files
//! - [`Dataset`]: the ordered, deduplicated collection of articles
//! - [`MergeStats`] / [`RunSummary`]: bookkeeping for one run
//!
//! Field names are snake_case on disk; they match the column names of the
//! tabular file and the keys of the document file.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// An unvalidated article as found on a listing page.
///
/// Every field is optional: a card with a missing sub-element still yields a
/// candidate with that field absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCandidate {
    pub title: Option<String>,
    pub short_desc: Option<String>,
    /// Absolute URL of the card image.
    pub image_url: Option<String>,
    /// Publication time exactly as the source declared it.
    pub timestamp: Option<String>,
    /// Absolute URL of the article page.
    pub anchor_link: Option<String>,
}

impl RawCandidate {
    /// A card that produced none of the expected fields is not an article.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.short_desc.is_none()
            && self.image_url.is_none()
            && self.timestamp.is_none()
            && self.anchor_link.is_none()
    }
}

/// One article record.
///
/// Serialized field order is the tabular file's column order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Article {
    pub title: Option<String>,
    pub short_desc: Option<String>,
    pub image_url: Option<String>,
    pub timestamp: Option<String>,
    /// Base URL of the site this article was scraped from.
    pub source: String,
    /// Reserved for downstream publishing; always `false` here.
    pub published: bool,
    pub anchor_link: Option<String>,
    /// Full body text, when content fetching was enabled and succeeded.
    pub long_desc: Option<String>,
    pub word_count: u64,
    /// When this record was captured. Absent only on rows migrated from
    /// files written before the column existed.
    pub scraped_at: Option<DateTime<Utc>>,
    /// Host component of `source`.
    pub domain: String,
}

impl Article {
    /// Identity used for deduplication.
    pub fn dedup_key(&self) -> (Option<String>, Option<String>) {
        (self.title.clone(), self.timestamp.clone())
    }

    /// The source-declared timestamp, if it parses.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }

    pub fn has_content(&self) -> bool {
        self.long_desc.is_some()
    }
}

/// Parse the timestamp formats seen in `<time datetime="...">` attributes.
///
/// Accepts RFC 3339, naive date-times (taken as UTC) and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// The complete, ordered collection of articles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub articles: Vec<Article>,
}

impl Dataset {
    pub fn new(articles: Vec<Article>) -> Self {
        Self { articles }
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

/// Counts produced by merging one run's records into the dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Records fetched this run.
    pub new_count: usize,
    /// Records removed as duplicates of an earlier record.
    pub dropped_count: usize,
    /// Size of the dataset after merging.
    pub total: usize,
}

/// Header of the document file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DatasetMetadata {
    pub total_articles: usize,
    pub new_articles: usize,
    pub duplicates_removed: usize,
    pub last_updated: DateTime<Utc>,
    pub source: String,
}

/// The document file: metadata envelope plus every article.
///
/// Articles are borrowed when writing and owned when reading back.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DatasetDocument<'a> {
    pub metadata: DatasetMetadata,
    pub articles: Cow<'a, [Article]>,
}

/// Human-oriented digest of a dataset after a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_articles: usize,
    pub articles_with_content: usize,
    pub new_articles: usize,
    pub duplicates_removed: usize,
    pub avg_word_count: f64,
    /// `articles_with_content / total_articles`, 0 for an empty dataset.
    pub content_coverage: f64,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

impl RunSummary {
    pub fn from_dataset(dataset: &Dataset, stats: &MergeStats) -> Self {
        let total = dataset.len();
        let with_content = dataset.articles.iter().filter(|a| a.has_content()).count();
        let words: u64 = dataset.articles.iter().map(|a| a.word_count).sum();
        let dates = dataset.articles.iter().filter_map(Article::published_at);
        let (earliest, latest) = dates.fold((None, None), |(lo, hi), d| {
            (
                Some(lo.map_or(d, |lo: DateTime<Utc>| lo.min(d))),
                Some(hi.map_or(d, |hi: DateTime<Utc>| hi.max(d))),
            )
        });

        let ratio = |n: f64| if dataset.is_empty() { 0.0 } else { n / total as f64 };

        Self {
            total_articles: total,
            articles_with_content: with_content,
            new_articles: stats.new_count,
            duplicates_removed: stats.dropped_count,
            avg_word_count: ratio(words as f64),
            content_coverage: ratio(with_content as f64),
            earliest,
            latest,
        }
    }
}
