//! Command-line interface definitions for News Harvest.
//!
//! Scraping behaviour lives in the configuration file; the command line only
//! says where that file is and overrides a couple of run-level switches.

use clap::Parser;

/// Command-line arguments for the News Harvest scraper.
///
/// # Examples
///
/// ```sh
/// # Use ./config.json, creating it with defaults on first run
/// news_harvest
///
/// # Listing only, no per-article requests
/// news_harvest --config scraper.yaml --no-content
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Configuration file (JSON, or YAML with a .yaml/.yml extension)
    #[arg(short, long, env = "NEWS_HARVEST_CONFIG", default_value = "config.json")]
    pub config: String,

    /// Skip fetching full article content
    #[arg(long)]
    pub no_content: bool,

    /// Also write logs to this file
    #[arg(long, default_value = "scraper.log", conflicts_with = "no_log_file")]
    pub log_file: String,

    /// Log to the console only
    #[arg(long)]
    pub no_log_file: bool,
}

impl Cli {
    /// The log file to write, if any.
    pub fn log_path(&self) -> Option<&str> {
        (!self.no_log_file).then_some(self.log_file.as_str())
    }
}
