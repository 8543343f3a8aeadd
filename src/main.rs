//! # News Harvest
//!
//! Scrapes a news site's listing page, optionally follows every article for
//! its full text, and merges the results into a deduplicated dataset kept as
//! both CSV and JSON.
//!
//! ## Usage
//!
//! ```sh
//! news_harvest --config config.json
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Fetching**: Download the listing page (with retries)
//! 2. **Extraction**: Pull article cards off the page, then fetch each article body
//! 3. **Normalization**: Build canonical records with derived fields
//! 4. **Storage**: Merge with the existing dataset, deduplicate, sort, and
//!    rewrite the CSV and JSON files

use clap::Parser;
use std::error::Error;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod fetcher;
mod models;
mod normalize;
mod pipeline;
mod scrapers;
mod store;
mod utils;

use cli::Cli;
use config::ScraperConfig;
use fetcher::build_fetcher;
use pipeline::{Pipeline, RunOutcome, log_summary};
use scrapers::ainews::AiNewsExtractor;
use utils::ensure_writable_parent;

/// Console logging always; file logging as well when `log_path` is given.
fn init_tracing(log_path: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = tfmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(UtcTime::rfc_3339());

    let opened = log_path.map(|path| OpenOptions::new().create(true).append(true).open(path));
    let (file_layer, file_error) = match opened {
        Some(Ok(file)) => {
            let layer = tfmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_timer(UtcTime::rfc_3339())
                .with_writer(Mutex::new(file));
            (Some(layer), None)
        }
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();

    if let Some(e) = file_error {
        warn!(path = ?log_path, error = %e, "Could not open log file; logging to console only");
    }
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();
    init_tracing(args.log_path());

    let start_time = std::time::Instant::now();
    info!("news_harvest starting up");
    debug!(?args, "Parsed CLI arguments");

    let mut config = ScraperConfig::load_or_create(&args.config);
    if args.no_content {
        config.fetch_full_content = false;
        info!("Full content fetching disabled from the command line");
    }
    debug!(?config, "Effective configuration");

    // Fail before scraping if the dataset can't be written
    for path in [&config.csv_path, &config.json_path] {
        if let Err(e) = ensure_writable_parent(path).await {
            error!(
                path = %path.display(),
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted by user; finishing with the articles collected so far");
            on_interrupt.cancel();
        }
    });

    let fetcher = build_fetcher(&config)?;
    let pipeline = Pipeline::new(config, fetcher, AiNewsExtractor)?;
    let report = pipeline.run(&cancel).await;
    info!(
        found = report.found,
        skipped = report.skipped,
        collected = report.collected,
        cancelled = report.cancelled,
        "Run finished"
    );

    let result = match report.outcome {
        RunOutcome::ListingUnavailable => {
            warn!("Listing page unavailable; dataset unchanged");
            Ok(())
        }
        RunOutcome::NothingToSave => Ok(()),
        RunOutcome::Merged {
            dataset,
            stats,
            summary,
            persist_error,
        } => {
            debug!(
                articles = dataset.len(),
                new = stats.new_count,
                dropped = stats.dropped_count,
                total = stats.total,
                "Merged dataset"
            );
            log_summary(&summary);
            match persist_error {
                Some(e) => Err(e.into()),
                None => Ok(()),
            }
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    result
}
