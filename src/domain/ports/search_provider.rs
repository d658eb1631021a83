//! Web search port.

use async_trait::async_trait;

use crate::domain::errors::CollaboratorError;
use crate::domain::models::SearchHit;

/// External web search.
///
/// An empty result list is a valid answer; only transport or provider failures are errors.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Hits for `query`, best first.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, CollaboratorError>;
}
