//! Search queries, results and the per-subtask result accumulator.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A concrete query issued during one round of a subtask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Query string as sent to the provider
    pub text: String,
    /// Zero-based round that generated this query
    pub generation_round: u32,
}

impl SearchQuery {
    /// A query issued in round `generation_round`.
    pub fn new(text: impl Into<String>, generation_round: u32) -> Self {
        Self {
            text: text.into(),
            generation_round,
        }
    }
}

/// A single hit as returned by a search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Page title
    pub title: String,
    /// Result URL; may be empty for providers without one
    pub url: String,
    /// Extracted page text, or the provider snippet when the page was not fetched
    pub content: String,
}

impl SearchHit {
    /// A hit with already-extracted content.
    pub fn new(title: impl Into<String>, url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
        }
    }
}

/// A search hit attributed to the query that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Query that surfaced this result
    pub query_text: String,
    /// Page title
    pub title: String,
    /// Result URL, the deduplication key
    pub url: String,
    /// Page text, or the snippet when the page could not be fetched
    pub content: String,
}

impl SearchResult {
    /// Tag `hit` with the query that found it.
    pub fn from_hit(query_text: impl Into<String>, hit: SearchHit) -> Self {
        Self {
            query_text: query_text.into(),
            title: hit.title,
            url: hit.url,
            content: hit.content,
        }
    }
}

/// Union of every result a subtask has seen, in first-seen order.
///
/// Results are keyed by URL. A repeated URL never adds a second entry; it only replaces the
/// stored content when the newcomer carries strictly more of it. Nothing is ever removed.
#[derive(Debug, Clone, Default)]
pub struct SearchAccumulator {
    results: Vec<SearchResult>,
    by_url: HashMap<String, usize>,
}

impl SearchAccumulator {
    /// An empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one round's results. Returns the number of previously unseen URLs.
    pub fn extend(&mut self, round_results: impl IntoIterator<Item = SearchResult>) -> usize {
        let mut added = 0;
        for result in round_results {
            let key = dedup_key(&result);
            match self.by_url.get(&key) {
                Some(&index) => {
                    let existing = &mut self.results[index];
                    if result.content.len() > existing.content.len() {
                        existing.content = result.content;
                    }
                }
                None => {
                    self.by_url.insert(key, self.results.len());
                    self.results.push(result);
                    added += 1;
                }
            }
        }
        added
    }

    /// Results in first-seen order.
    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    /// Number of distinct URLs seen.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// True before any result has been merged.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Consume the accumulator, keeping first-seen order.
    pub fn into_results(self) -> Vec<SearchResult> {
        self.results
    }
}

/// Results without a URL are keyed by title so they are never merged together.
///
/// Scheme and host compare case-insensitively; path and query are case-sensitive.
fn dedup_key(result: &SearchResult) -> String {
    let url = result.url.trim();
    if url.is_empty() {
        return format!("title:{}", result.title);
    }
    let Ok(parsed) = Url::parse(url) else {
        return url.trim_end_matches('/').to_string();
    };

    let mut key = format!("{}://{}", parsed.scheme(), parsed.host_str().unwrap_or_default());
    if let Some(port) = parsed.port() {
        key.push_str(&format!(":{port}"));
    }
    key.push_str(parsed.path().trim_end_matches('/'));
    if let Some(query) = parsed.query() {
        key.push('?');
        key.push_str(query);
    }
    key
}
