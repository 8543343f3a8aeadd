//! Turn a listing candidate plus its optional body into an [`Article`].

use crate::models::{Article, RawCandidate};
use chrono::{DateTime, Utc};
use url::Url;

/// Build the canonical record for one candidate.
///
/// Pure: no I/O, never fails. `word_count` is the number of
/// whitespace-separated tokens in `body` (0 without a body).
pub fn normalize(raw: RawCandidate, body: Option<String>, base_url: &Url, now: DateTime<Utc>) -> Article {
    let word_count = body.as_deref().map_or(0, count_words);

    Article {
        title: raw.title,
        short_desc: raw.short_desc,
        image_url: raw.image_url,
        timestamp: raw.timestamp,
        source: base_url.to_string(),
        published: false,
        anchor_link: raw.anchor_link,
        long_desc: body,
        word_count,
        scraped_at: Some(now),
        domain: domain_of(base_url),
    }
}

/// Host of `url` including a non-default port, or `""` when it has none.
pub fn domain_of(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

fn count_words(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}
