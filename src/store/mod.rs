//! The persisted dataset.
//!
//! There is one canonical in-memory [`Dataset`] and two serializers:
//!
//! - [`tabular`]: CSV, one row per article (also the file loaded at start-up)
//! - [`document`]: JSON, `{metadata, articles}`
//!
//! # Lifecycle
//!
//! ```text
//! load(csv) ──► merge(existing, incoming) ──► persist(csv + json)
//! ```
//!
//! Both files are rendered completely in memory before either is touched,
//! and each is replaced by writing a sibling temporary file and renaming it
//! over the target. A failed write leaves the previous file in place.

use crate::error::StoreError;
use crate::models::{Article, Dataset, MergeStats};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

pub mod document;
pub mod tabular;

pub use tabular::load;

/// Combine the persisted dataset with this run's records.
///
/// `existing` comes first, so on a `(title, timestamp)` collision the
/// already-persisted record is kept and the fresh copy is dropped. The
/// result is sorted newest first; records without a parseable timestamp
/// go last, in their original relative order.
pub fn merge(existing: Dataset, incoming: Vec<Article>) -> (Dataset, MergeStats) {
    let new_count = incoming.len();
    let combined: Vec<Article> = existing.articles.into_iter().chain(incoming).collect();
    let before = combined.len();

    let mut articles: Vec<Article> = combined.into_iter().unique_by(Article::dedup_key).collect();
    articles.sort_by_key(|a| Reverse(a.published_at()));

    let stats = MergeStats {
        new_count,
        dropped_count: before - articles.len(),
        total: articles.len(),
    };
    info!(
        new = stats.new_count,
        duplicates_removed = stats.dropped_count,
        total = stats.total,
        "Merged dataset"
    );
    (Dataset::new(articles), stats)
}

/// Write both representations of `dataset`.
///
/// The tabular file is replaced first; the document file is only written if
/// that succeeded.
#[instrument(level = "info", skip_all, fields(tabular = %tabular_path.display(), document = %document_path.display()))]
pub async fn persist(
    dataset: &Dataset,
    stats: &MergeStats,
    tabular_path: &Path,
    document_path: &Path,
    source: &str,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let csv = tabular::render(dataset)?;
    let json = document::render(dataset, stats, source, now)?;

    replace_file(tabular_path, &csv).await?;
    info!(count = dataset.len(), path = %tabular_path.display(), "Saved unique articles");

    replace_file(document_path, &json).await?;
    info!(path = %document_path.display(), "Saved document");

    Ok(())
}

/// Write `contents` to a temporary sibling of `path`, then rename it over `path`.
async fn replace_file(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io(parent, e))?;
    }

    let tmp = temp_path(path);
    if let Err(e) = fs::write(&tmp, contents).await {
        error!(path = %tmp.display(), error = %e, "Failed to write temporary file");
        let _ = fs::remove_file(&tmp).await;
        return Err(StoreError::io(&tmp, e));
    }
    if let Err(e) = fs::rename(&tmp, path).await {
        error!(path = %path.display(), error = %e, "Failed to replace file");
        let _ = fs::remove_file(&tmp).await;
        return Err(StoreError::io(path, e));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::article;
    use crate::models::{DatasetDocument, parse_timestamp};
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn titles(dataset: &Dataset) -> Vec<&str> {
        dataset
            .articles
            .iter()
            .map(|a| a.title.as_deref().unwrap_or(""))
            .collect()
    }

    #[test]
    fn test_merge_into_empty() {
        let incoming = vec![article("A", Some("2025-01-01")), article("B", Some("2025-01-02"))];

        let (dataset, stats) = merge(Dataset::default(), incoming);

        assert_eq!(titles(&dataset), vec!["B", "A"]);
        assert_eq!(stats, MergeStats { new_count: 2, dropped_count: 0, total: 2 });
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = Dataset::new(vec![
            article("A", Some("2025-01-03")),
            article("B", Some("2025-01-02")),
            article("C", None),
        ]);
        let incoming = existing.articles.clone();

        let (dataset, stats) = merge(existing.clone(), incoming);

        assert_eq!(dataset, existing);
        assert_eq!(stats.dropped_count, 3);
        assert_eq!(stats.new_count, 3);
        assert_eq!(stats.total, 3);
    }

    #[test]
    fn test_existing_record_wins() {
        let mut old = article("A", Some("T"));
        old.short_desc = Some("old".to_string());
        let mut new = article("A", Some("T"));
        new.short_desc = Some("new".to_string());

        let (dataset, stats) = merge(Dataset::new(vec![old]), vec![new]);

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.articles[0].short_desc.as_deref(), Some("old"));
        assert_eq!(stats.dropped_count, 1);
    }

    #[test]
    fn test_same_title_different_timestamp_is_kept() {
        let (dataset, _) = merge(
            Dataset::new(vec![article("A", Some("2025-01-01"))]),
            vec![article("A", Some("2025-01-02"))],
        );
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn test_absent_keys_collapse() {
        let mut untitled = article("x", None);
        untitled.title = None;
        let (dataset, stats) = merge(Dataset::new(vec![untitled.clone()]), vec![untitled]);
        assert_eq!(dataset.len(), 1);
        assert_eq!(stats.dropped_count, 1);
    }

    #[test]
    fn test_sort_newest_first_undated_last() {
        let existing = Dataset::new(vec![
            article("undated-1", None),
            article("old", Some("2024-12-31T23:00:00Z")),
            article("garbage", Some("not a date")),
        ]);
        let incoming = vec![
            article("new", Some("2025-02-01T00:00:00+01:00")),
            article("undated-2", None),
            article("mid", Some("2025-01-15")),
        ];

        let (dataset, _) = merge(existing, incoming);

        assert_eq!(
            titles(&dataset),
            vec!["new", "mid", "old", "undated-1", "garbage", "undated-2"]
        );
        let dates: Vec<_> = dataset.articles.iter().map(|a| a.published_at()).collect();
        assert!(dates.windows(2).all(|w| w[0] >= w[1] || w[1].is_none()));
    }

    #[tokio::test]
    async fn test_persist_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("csv/ainews.csv");
        let json_path = dir.path().join("json/ainews.json");

        let mut full = article("Full", Some("2025-05-06T14:30:00Z"));
        full.long_desc = Some("one two three".to_string());
        full.word_count = 3;
        full.anchor_link = Some("https://www.ainews.com/p/full".to_string());
        full.scraped_at = parse_timestamp("2025-05-07T09:00:00Z");
        let (dataset, stats) = merge(Dataset::default(), vec![full, article("Bare", None)]);

        persist(&dataset, &stats, &csv_path, &json_path, "https://www.ainews.com/", Utc::now())
            .await
            .unwrap();
        let reloaded = load(&csv_path).await;

        let key = |d: &Dataset| {
            d.articles
                .iter()
                .map(|a| serde_json::to_string(a).unwrap())
                .collect::<HashSet<_>>()
        };
        assert_eq!(key(&reloaded), key(&dataset));

        let doc: DatasetDocument =
            serde_json::from_slice(&std::fs::read(&json_path).unwrap()).unwrap();
        assert_eq!(doc.articles, dataset.articles);
        assert_eq!(doc.metadata.total_articles, 2);
        assert!(!temp_path(&csv_path).exists());
    }

    #[tokio::test]
    async fn test_persist_overwrites_rather_than_appends() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("a.csv");
        let json_path = dir.path().join("a.json");

        let (first, stats) = merge(Dataset::default(), vec![article("A", Some("2025-01-01"))]);
        persist(&first, &stats, &csv_path, &json_path, "s", Utc::now()).await.unwrap();

        let existing = load(&csv_path).await;
        let (second, stats) = merge(existing, vec![article("A", Some("2025-01-01"))]);
        persist(&second, &stats, &csv_path, &json_path, "s", Utc::now()).await.unwrap();

        assert_eq!(load(&csv_path).await.len(), 1);
        assert_eq!(stats.dropped_count, 1);
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_previous_files() {
        let dir = TempDir::new().unwrap();
        let json_path = dir.path().join("a.json");
        std::fs::write(&json_path, "previous").unwrap();
        // A non-empty directory where the tabular file should go makes the rename fail.
        let csv_path = dir.path().join("blocked");
        std::fs::create_dir_all(csv_path.join("occupied")).unwrap();

        let (dataset, stats) = merge(Dataset::default(), vec![article("B", None)]);
        let result = persist(&dataset, &stats, &csv_path, &json_path, "s", Utc::now()).await;

        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert!(!temp_path(&csv_path).exists());
        assert_eq!(std::fs::read_to_string(&json_path).unwrap(), "previous");
    }
}
