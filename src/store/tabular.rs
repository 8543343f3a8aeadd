//! CSV representation of the dataset.
//!
//! One row per article, columns in [`COLUMNS`] order. Reading is lenient so
//! that files written by older versions of the scraper (or edited by hand in a
//! spreadsheet) keep loading:
//!
//! - missing columns are filled with absent values,
//! - unknown columns are ignored,
//! - `published` accepts `true`/`True`/`1` style spellings,
//! - `word_count` accepts float text such as `42.0`, and is recomputed from
//!   `long_desc` when absent.

use crate::error::StoreError;
use crate::models::{Article, Dataset, parse_timestamp};
use crate::normalize::domain_of;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};
use url::Url;

/// Column order of the tabular file.
pub const COLUMNS: [&str; 11] = [
    "title",
    "short_desc",
    "image_url",
    "timestamp",
    "source",
    "published",
    "anchor_link",
    "long_desc",
    "word_count",
    "scraped_at",
    "domain",
];

/// A row as it appears on disk, before any interpretation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TabularRow {
    title: Option<String>,
    short_desc: Option<String>,
    image_url: Option<String>,
    timestamp: Option<String>,
    source: Option<String>,
    published: Option<String>,
    anchor_link: Option<String>,
    long_desc: Option<String>,
    word_count: Option<String>,
    scraped_at: Option<String>,
    domain: Option<String>,
}

impl From<TabularRow> for Article {
    fn from(row: TabularRow) -> Self {
        let word_count = row
            .word_count
            .as_deref()
            .and_then(parse_count)
            .unwrap_or_else(|| {
                row.long_desc
                    .as_deref()
                    .map_or(0, |t| t.split_whitespace().count() as u64)
            });
        let source = row.source.unwrap_or_default();
        let domain = row.domain.unwrap_or_else(|| {
            Url::parse(&source)
                .map(|u| domain_of(&u))
                .unwrap_or_default()
        });

        Article {
            title: row.title,
            short_desc: row.short_desc,
            image_url: row.image_url,
            timestamp: row.timestamp,
            source,
            published: row.published.as_deref().is_some_and(parse_flag),
            anchor_link: row.anchor_link,
            long_desc: row.long_desc,
            word_count,
            scraped_at: row.scraped_at.as_deref().and_then(parse_timestamp),
            domain,
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn parse_count(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f as u64)
    })
}

/// Parse CSV bytes into a dataset.
pub fn parse(bytes: &[u8]) -> Result<Dataset, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let missing: Vec<&str> = COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !headers.is_empty() && !missing.is_empty() {
        info!(?missing, "Adding missing columns with empty values");
    }

    let articles = reader
        .deserialize::<TabularRow>()
        .map(|row| row.map(Article::from))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Dataset::new(articles))
}

/// Serialize the dataset to CSV bytes. The header row is always written.
pub fn render(dataset: &Dataset) -> Result<Vec<u8>, StoreError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for article in &dataset.articles {
        writer.serialize(article)?;
    }
    writer
        .into_inner()
        .map_err(|e| StoreError::io("<csv buffer>", e.into_error()))
}

/// Load the dataset from `path`.
///
/// A missing file is an empty dataset. So is an unreadable or corrupt one:
/// a fresh dataset is preferred over refusing to run.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load(path: &Path) -> Dataset {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No existing dataset; starting fresh");
            return Dataset::default();
        }
        Err(e) => {
            warn!(error = %e, stage = "load", "Could not read existing dataset; starting fresh");
            return Dataset::default();
        }
    };

    match parse(&bytes) {
        Ok(dataset) => {
            info!(count = dataset.len(), "Loaded existing dataset");
            dataset
        }
        Err(e) => {
            warn!(error = %e, stage = "load", "Existing dataset is corrupt; starting fresh");
            Dataset::default()
        }
    }
}
