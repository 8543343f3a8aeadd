//! HTTP retrieval with bounded, fixed-delay retries.
//!
//! # Architecture
//!
//! - [`Fetch`]: core trait, "give me the document at this URL"
//! - [`HttpFetcher`]: `reqwest` client with browser-like headers and a per-attempt timeout
//! - [`RetryFetch`]: decorator that retries any [`Fetch`] implementation
//!
//! # Retry Strategy
//!
//! A failed attempt (network error or non-2xx status) is retried after a
//! fixed delay, up to `max_retries` times. A source that is down therefore
//! costs at most `1 + max_retries` requests. When retries are exhausted the
//! caller receives [`FetchError::Exhausted`] and treats the URL as "no data".

use crate::config::ScraperConfig;
use crate::error::FetchError;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Anything that can turn a URL into a document body.
pub trait Fetch {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Plain HTTP GET with a shared client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client that sends the same identifying headers on every request.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(default_headers())
            .build()?;
        Ok(Self { client })
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));
    headers.insert("dnt", HeaderValue::from_static("1"));
    headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));
    headers
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let request_err = |source: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        let body = response.text().await.map_err(request_err)?;
        debug!(%status, bytes = body.len(), "Fetched document");
        Ok(body)
    }
}

/// Wrapper that retries any [`Fetch`] implementation with a fixed delay.
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: Fetch,
{
    pub fn new(inner: T, max_retries: usize, delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            delay,
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("delay", &self.delay)
            .finish()
    }
}

impl<T> Fetch for RetryFetch<T>
where
    T: Fetch,
{
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "fetch exhausted retries"
                        );
                        return Err(FetchError::Exhausted {
                            url: url.to_string(),
                            attempts: attempt,
                            last: Box::new(e),
                        });
                    }

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis(),
                        delay = ?self.delay,
                        error = %e,
                        "fetch attempt failed; retrying"
                    );
                    sleep(self.delay).await;
                }
            }
        }
    }
}

/// Build the production fetcher from configuration.
pub fn build_fetcher(config: &ScraperConfig) -> Result<RetryFetch<HttpFetcher>, reqwest::Error> {
    let http = HttpFetcher::new(config.request_timeout())?;
    Ok(RetryFetch::new(http, config.max_retries, config.retry_delay()))
}
