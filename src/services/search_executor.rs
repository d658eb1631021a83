//! Single-query search execution.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::errors::CollaboratorError;
use crate::domain::models::{SearchQuery, SearchResult};
use crate::domain::ports::SearchProvider;

/// Runs one query against the search provider and attributes the hits to it.
#[derive(Clone)]
pub struct SearchExecutor {
    provider: Arc<dyn SearchProvider>,
}

impl SearchExecutor {
    /// Run searches against `provider`.
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }

    /// Zero hits is a valid outcome. Only provider failures are errors.
    #[instrument(skip(self), fields(query = %query.text, round = query.generation_round))]
    pub async fn execute(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, CollaboratorError> {
        let text = query.text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let hits = self.provider.search(text).await?;
        debug!(hits = hits.len(), "Search returned");

        Ok(hits
            .into_iter()
            .map(|mut hit| {
                hit.content = clean_text(&hit.content);
                SearchResult::from_hit(text, hit)
            })
            .collect())
    }
}

/// Trim every line and drop the blank ones.
pub fn clean_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockSearchProvider;
    use crate::domain::models::SearchHit;

    #[test]
    fn test_clean_text_collapses_blank_lines() {
        assert_eq!(clean_text("  a \n\n\n  b\n \n"), "a\nb");
    }

    #[tokio::test]
    async fn test_results_are_attributed_to_query() {
        let provider = MockSearchProvider::new().with_hits(
            "gdp japan",
            vec![SearchHit::new("Japan GDP", "https://stats.example/jp", "  4.2 trillion \n\n")],
        );
        let executor = SearchExecutor::new(Arc::new(provider));

        let results = executor.execute(&SearchQuery::new("gdp japan", 0)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].query_text, "gdp japan");
        assert_eq!(results[0].content, "4.2 trillion");
    }

    #[tokio::test]
    async fn test_unknown_query_is_empty_not_error() {
        let executor = SearchExecutor::new(Arc::new(MockSearchProvider::new()));
        let results = executor.execute(&SearchQuery::new("nothing here", 0)).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let provider = MockSearchProvider::new().with_failure("broken", "connection reset");
        let executor = SearchExecutor::new(Arc::new(provider));

        let err = executor.execute(&SearchQuery::new("broken", 1)).await.unwrap_err();
        assert!(err.is_transient());
    }
}
