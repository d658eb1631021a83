//! Google Custom Search client.
//!
//! Each hit's page is fetched and reduced to plain text. When the page cannot be fetched, or
//! yields no text, the search snippet stands in for it.

use async_trait::async_trait;
use futures::future::join_all;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use regex::Regex;
use reqwest::{header, Client};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::adapters::llm::{classify_status, classify_transport_error};
use crate::domain::errors::CollaboratorError;
use crate::domain::models::{SearchConfig, SearchHit};
use crate::domain::ports::SearchProvider;

const USER_AGENT: &str = concat!("sleuth/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// `SearchProvider` backed by the Custom Search JSON API.
pub struct GoogleSearchProvider {
    config: SearchConfig,
    api_key: String,
    engine_id: String,
    http: Client,
    page_http: Client,
    limiter: DefaultDirectRateLimiter,
}

impl GoogleSearchProvider {
    /// Fails with `Rejected` when the API key or engine id is missing.
    pub fn new(config: &SearchConfig) -> Result<Self, CollaboratorError> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            CollaboratorError::Rejected(
                "No Google API key: set search.api_key or GOOGLE_API_KEY".to_string(),
            )
        })?;
        let engine_id = config.resolved_engine_id().ok_or_else(|| {
            CollaboratorError::Rejected(
                "No search engine id: set search.engine_id or GOOGLE_CX".to_string(),
            )
        })?;

        let build = |timeout_secs: u64| {
            Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .map_err(|e| {
                    CollaboratorError::Rejected(format!("Failed to create HTTP client: {e}"))
                })
        };

        let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            config: config.clone(),
            api_key,
            engine_id,
            http: build(30)?,
            page_http: build(config.page_timeout_secs)?,
            limiter: RateLimiter::direct(Quota::per_second(rps)),
        })
    }

    async fn query_api(&self, query: &str) -> Result<Vec<SearchItem>, CollaboratorError> {
        self.limiter.until_ready().await;

        let num = self.config.results_per_query.to_string();
        let response = self
            .http
            .get(format!(
                "{}/customsearch/v1",
                self.config.base_url.trim_end_matches('/')
            ))
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            CollaboratorError::MalformedOutput(format!(
                "Failed to parse search response: {}",
                e.without_url()
            ))
        })?;
        Ok(parsed.items)
    }

    /// Page text, or `None` when the page is unreachable or has no readable text.
    async fn fetch_page_text(&self, url: &str) -> Option<String> {
        let response = match self.page_http.get(url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!(url, status = response.status().as_u16(), "Page fetch refused");
                return None;
            }
            Err(e) => {
                debug!(url, error = %e.without_url(), "Page fetch failed");
                return None;
            }
        };

        let is_html = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|v| v.contains("html") || v.starts_with("text/"));
        if !is_html {
            return None;
        }

        let body = response.text().await.ok()?;
        let text = html_to_text(&body);
        (!text.is_empty()).then_some(text)
    }

    async fn to_hit(&self, item: SearchItem) -> SearchHit {
        let page_text = if self.config.fetch_pages && !item.link.is_empty() {
            self.fetch_page_text(&item.link).await
        } else {
            None
        };
        let content = page_text.unwrap_or(item.snippet);
        SearchHit::new(
            item.title,
            item.link,
            truncate_chars(&content, self.config.max_content_chars),
        )
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchProvider {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, CollaboratorError> {
        let items = self.query_api(query).await?;
        debug!(hits = items.len(), "Search returned");
        Ok(join_all(items.into_iter().map(|item| self.to_hit(item))).await)
    }
}

static DROPPED_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|head|svg)\b.*?</(script|style|noscript|head|svg)>")
        .expect("static pattern")
});
static COMMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("static pattern"));
static BLOCK_BREAKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(br|/p|/div|/li|/h[1-6]|/tr|/section|/article)\b[^>]*>")
        .expect("static pattern")
});
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static pattern"));
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("static pattern"));

/// Reduce an HTML document to its readable text, one line per block.
pub fn html_to_text(html: &str) -> String {
    let without_blocks = DROPPED_BLOCKS.replace_all(html, " ");
    let without_comments = COMMENTS.replace_all(&without_blocks, " ");
    let with_breaks = BLOCK_BREAKS.replace_all(&without_comments, "\n");
    let stripped = TAGS.replace_all(&with_breaks, " ");
    let decoded = decode_entities(&stripped);

    decoded
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(text: &str) -> String {
    let numeric = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures<'_>| {
        let code = &caps[1];
        let value = code
            .strip_prefix('x')
            .map_or_else(|| code.parse().ok(), |hex| u32::from_str_radix(hex, 16).ok());
        value
            .and_then(char::from_u32)
            .map_or_else(String::new, |c| c.to_string())
    });

    numeric
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Truncate to at most `max_chars` characters, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str, fetch_pages: bool) -> SearchConfig {
        SearchConfig {
            api_key: Some("test-key".to_string()),
            engine_id: Some("test-cx".to_string()),
            base_url: base_url.to_string(),
            fetch_pages,
            max_content_chars: 40,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn test_html_to_text_drops_scripts_and_tags() {
        let html = r#"<html><head><title>t</title></head><body>
            <script>var x = "<p>hidden</p>";</script>
            <style>.a { color: red }</style>
            <h1>Tokyo</h1><p>Population:&nbsp;14 million &amp; growing in Caf&#xE9; &#60;districts&#62;</p>
            <!-- comment --><div>Second   line</div></body></html>"#;

        let text = html_to_text(html);
        assert_eq!(text, "Tokyo\nPopulation: 14 million & growing in Caf\u{e9} <districts>\nSecond line");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("東京都の人口", 2), "東京");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        temp_env::with_vars_unset(["GOOGLE_API_KEY", "GOOGLE_CX"], || {
            let result = GoogleSearchProvider::new(&SearchConfig::default());
            assert!(matches!(result, Err(CollaboratorError::Rejected(_))));
        });
    }

    #[tokio::test]
    async fn test_search_maps_items_and_uses_snippets() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/customsearch/v1")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("q".into(), "tokyo population".into()),
                mockito::Matcher::UrlEncoded("cx".into(), "test-cx".into()),
                mockito::Matcher::UrlEncoded("num".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"items": [
                    {"title": "Tokyo", "link": "https://example.com/tokyo", "snippet": "About 14 million people live in Tokyo proper, the capital."}
                ]}"#,
            )
            .create_async()
            .await;

        let provider = GoogleSearchProvider::new(&config(&server.url(), false)).unwrap();
        let hits = provider.search("tokyo population").await.unwrap();

        mock.assert_async().await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://example.com/tokyo");
        assert_eq!(hits[0].content.chars().count(), 40);
    }

    #[tokio::test]
    async fn test_search_without_items_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/customsearch/v1")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"kind": "customsearch#search"}"#)
            .create_async()
            .await;

        let provider = GoogleSearchProvider::new(&config(&server.url(), false)).unwrap();
        assert!(provider.search("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetched_page_replaces_snippet() {
        let mut server = mockito::Server::new_async().await;
        let page_url = format!("{}/page", server.url());
        server
            .mock("GET", "/customsearch/v1")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "items": [{"title": "Page", "link": page_url, "snippet": "snippet text"}]
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/page")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<html><body><p>Full page text</p></body></html>")
            .create_async()
            .await;

        let provider = GoogleSearchProvider::new(&config(&server.url(), true)).unwrap();
        let hits = provider.search("page").await.unwrap();
        assert_eq!(hits[0].content, "Full page text");
    }

    #[tokio::test]
    async fn test_unreachable_page_falls_back_to_snippet() {
        let mut server = mockito::Server::new_async().await;
        let page_url = format!("{}/gone", server.url());
        server
            .mock("GET", "/customsearch/v1")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "items": [{"title": "Gone", "link": page_url, "snippet": "snippet text"}]
                })
                .to_string(),
            )
            .create_async()
            .await;
        server.mock("GET", "/gone").with_status(404).create_async().await;

        let provider = GoogleSearchProvider::new(&config(&server.url(), true)).unwrap();
        let hits = provider.search("gone").await.unwrap();
        assert_eq!(hits[0].content, "snippet text");
    }

    #[tokio::test]
    async fn test_quota_errors_are_classified() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/customsearch/v1")
            .match_query(mockito::Matcher::UrlEncoded("q".into(), "limited".into()))
            .with_status(429)
            .with_body(r#"{"error": {"message": "Quota exceeded"}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/customsearch/v1")
            .match_query(mockito::Matcher::UrlEncoded("q".into(), "forbidden".into()))
            .with_status(403)
            .with_body(r#"{"error": {"message": "API key not valid"}}"#)
            .create_async()
            .await;

        let provider = GoogleSearchProvider::new(&config(&server.url(), false)).unwrap();
        assert!(provider.search("limited").await.unwrap_err().is_transient());
        assert!(matches!(
            provider.search("forbidden").await.unwrap_err(),
            CollaboratorError::Rejected(_)
        ));
    }
}
