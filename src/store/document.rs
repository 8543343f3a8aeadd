//! JSON representation of the dataset: a metadata envelope plus every
//! article, for consumers that want run statistics alongside the records.

use crate::error::StoreError;
use crate::models::{Dataset, DatasetDocument, DatasetMetadata, MergeStats};
use chrono::{DateTime, Utc};
use std::borrow::Cow;

pub fn metadata(stats: &MergeStats, source: &str, now: DateTime<Utc>) -> DatasetMetadata {
    DatasetMetadata {
        total_articles: stats.total,
        new_articles: stats.new_count,
        duplicates_removed: stats.dropped_count,
        last_updated: now,
        source: source.to_string(),
    }
}

/// Serialize the dataset and its metadata as pretty-printed JSON.
pub fn render(
    dataset: &Dataset,
    stats: &MergeStats,
    source: &str,
    now: DateTime<Utc>,
) -> Result<Vec<u8>, StoreError> {
    let document = DatasetDocument {
        metadata: metadata(stats, source, now),
        articles: Cow::Borrowed(&dataset.articles),
    };
    Ok(serde_json::to_vec_pretty(&document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::article;

    #[test]
    fn test_render_envelope() {
        let dataset = Dataset::new(vec![article("A", Some("2025-05-06")), article("B", None)]);
        let stats = MergeStats {
            new_count: 2,
            dropped_count: 1,
            total: 2,
        };
        let now = Utc::now();

        let bytes = render(&dataset, &stats, "https://www.ainews.com/", now).unwrap();
        let doc: DatasetDocument = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(doc.metadata.total_articles, 2);
        assert_eq!(doc.metadata.new_articles, 2);
        assert_eq!(doc.metadata.duplicates_removed, 1);
        assert_eq!(doc.metadata.last_updated, now);
        assert_eq!(doc.metadata.source, "https://www.ainews.com/");
        assert_eq!(doc.articles, dataset.articles);
    }

    #[test]
    fn test_render_keeps_unicode() {
        let dataset = Dataset::new(vec![article("Café — naïve", None)]);
        let bytes = render(&dataset, &MergeStats::default(), "s", Utc::now()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Café — naïve"));
        assert!(text.contains("\"metadata\""));
    }
}
