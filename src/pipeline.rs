//! One scraping run: listing → candidates → bodies → articles → dataset.
//!
//! # Flow
//!
//! 1. Fetch the listing page. Without it there is nothing to merge, so the
//!    run ends early.
//! 2. Extract candidates; cards that yielded no fields are skipped.
//! 3. Fetch article bodies in `max_concurrent_requests` lanes. Each lane is
//!    sequential and waits `delay_between_requests` between its own requests,
//!    so one lane reproduces the polite one-at-a-time crawl.
//! 4. Normalize, then load, merge and persist the dataset.
//!
//! Cancellation stops new requests (and abandons in-flight body fetches) but
//! still merges and persists whatever was collected.

use crate::config::ScraperConfig;
use crate::error::StoreError;
use crate::fetcher::Fetch;
use crate::models::{Article, Dataset, MergeStats, RawCandidate, RunSummary};
use crate::normalize::normalize;
use crate::scrapers::{Extractor, fetch_body};
use crate::store;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// What a run ended with.
#[derive(Debug)]
pub enum RunOutcome {
    /// The listing page could not be fetched; nothing was read or written.
    ListingUnavailable,
    /// The listing produced no usable articles; the dataset was left alone.
    NothingToSave,
    /// New records were merged. `persist_error` is set if writing failed; the
    /// merged dataset is still valid in memory.
    Merged {
        dataset: Dataset,
        stats: MergeStats,
        summary: RunSummary,
        persist_error: Option<StoreError>,
    },
}

#[derive(Debug)]
pub struct RunReport {
    /// Cards found on the listing page.
    pub found: usize,
    /// Cards skipped as malformed.
    pub skipped: usize,
    /// Records handed to the merge.
    pub collected: usize,
    /// The run was interrupted before every candidate was processed.
    pub cancelled: bool,
    pub outcome: RunOutcome,
}

impl RunReport {
    fn empty(outcome: RunOutcome, cancelled: bool) -> Self {
        Self {
            found: 0,
            skipped: 0,
            collected: 0,
            cancelled,
            outcome,
        }
    }
}

/// A configured scraper for one site.
pub struct Pipeline<F, E> {
    config: ScraperConfig,
    base_url: Url,
    fetcher: F,
    extractor: E,
}

impl<F, E> Pipeline<F, E>
where
    F: Fetch,
    E: Extractor,
{
    pub fn new(config: ScraperConfig, fetcher: F, extractor: E) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(&config.base_url)?;
        Ok(Self {
            config,
            base_url,
            fetcher,
            extractor,
        })
    }

    #[instrument(level = "info", skip_all, fields(source = %self.base_url, extractor = self.extractor.name()))]
    pub async fn run(&self, cancel: &CancellationToken) -> RunReport {
        info!("Starting scrape");

        let listing = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Interrupted before the listing page was fetched");
                return RunReport::empty(RunOutcome::ListingUnavailable, true);
            }
            listing = self.fetcher.fetch(self.base_url.as_str()) => listing,
        };
        let html = match listing {
            Ok(html) => html,
            Err(e) => {
                error!(url = e.url(), error = %e, stage = "listing", "Failed to fetch main page");
                return RunReport::empty(RunOutcome::ListingUnavailable, false);
            }
        };

        let candidates = self.extractor.extract_listing(&html, &self.base_url);
        let found = candidates.len();
        let (candidates, malformed): (Vec<_>, Vec<_>) =
            candidates.into_iter().enumerate().partition(|(_, c)| !c.is_empty());
        for (index, _) in &malformed {
            warn!(index = index + 1, stage = "extract", "Card has no recognizable fields; skipping");
        }

        let mut incoming = self.collect_articles(candidates, found, cancel).await;
        incoming.sort_by_key(|a| a.scraped_at);
        let cancelled = cancel.is_cancelled();
        if cancelled {
            warn!(collected = incoming.len(), "Scraping interrupted; saving what was collected");
        }
        info!(count = incoming.len(), "Successfully scraped articles");

        let mut report = RunReport {
            found,
            skipped: malformed.len(),
            collected: incoming.len(),
            cancelled,
            outcome: RunOutcome::NothingToSave,
        };
        if incoming.is_empty() {
            warn!("No data to save");
            return report;
        }

        let existing = store::load(&self.config.csv_path).await;
        let (dataset, stats) = store::merge(existing, incoming);
        let persist_error = store::persist(
            &dataset,
            &stats,
            &self.config.csv_path,
            &self.config.json_path,
            self.base_url.as_str(),
            Utc::now(),
        )
        .await
        .err();
        if let Some(e) = &persist_error {
            error!(error = %e, stage = "persist", "Failed to save dataset");
        }

        let summary = RunSummary::from_dataset(&dataset, &stats);
        report.outcome = RunOutcome::Merged {
            dataset,
            stats,
            summary,
            persist_error,
        };
        report
    }

    /// Distribute candidates round-robin over the lanes and gather the articles.
    async fn collect_articles(
        &self,
        candidates: Vec<(usize, RawCandidate)>,
        total: usize,
        cancel: &CancellationToken,
    ) -> Vec<Article> {
        let lanes = self.config.lanes().min(candidates.len()).max(1);
        let mut buckets: Vec<Vec<(usize, RawCandidate)>> = vec![Vec::new(); lanes];
        for (n, candidate) in candidates.into_iter().enumerate() {
            buckets[n % lanes].push(candidate);
        }
        debug!(lanes, "Processing candidates");

        let per_lane: Vec<Vec<Article>> = stream::iter(buckets)
            .map(|bucket| self.run_lane(bucket, total, cancel))
            .buffer_unordered(lanes)
            .collect()
            .await;
        per_lane.into_iter().flatten().collect()
    }

    /// Process one lane's candidates in order, throttling between requests.
    async fn run_lane(
        &self,
        bucket: Vec<(usize, RawCandidate)>,
        total: usize,
        cancel: &CancellationToken,
    ) -> Vec<Article> {
        let mut articles = Vec::with_capacity(bucket.len());
        let mut requested = false;

        for (index, candidate) in bucket {
            if cancel.is_cancelled() {
                break;
            }
            info!(index = index + 1, total, "Processing article");

            let body = match (self.config.fetch_full_content, candidate.anchor_link.as_deref()) {
                (true, Some(url)) => {
                    if requested {
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break,
                            _ = sleep(self.config.throttle()) => {}
                        }
                    }
                    requested = true;
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            warn!(index = index + 1, %url, "Interrupted during body fetch; dropping article");
                            break;
                        }
                        body = fetch_body(&self.fetcher, &self.extractor, url) => body,
                    }
                }
                _ => None,
            };

            articles.push(normalize(candidate, body, &self.base_url, Utc::now()));
        }
        articles
    }
}

/// Log the end-of-run summary block.
pub fn log_summary(summary: &RunSummary) {
    info!("=== SCRAPING SUMMARY ===");
    info!(total = summary.total_articles, "Total articles");
    info!(new = summary.new_articles, duplicates_removed = summary.duplicates_removed, "This run");
    info!(
        with_content = summary.articles_with_content,
        coverage = %format_args!("{:.1}%", summary.content_coverage * 100.0),
        "Articles with full content"
    );
    info!(avg = %format_args!("{:.1}", summary.avg_word_count), "Average word count");
    if let (Some(earliest), Some(latest)) = (summary.earliest, summary.latest) {
        info!(%earliest, %latest, "Date range");
    }
    info!("========================");
}
