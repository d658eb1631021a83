//! Deterministic collaborators for tests and benchmarks.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::errors::CollaboratorError;
use crate::domain::models::SearchHit;
use crate::domain::ports::{Prompted, SearchProvider};

type Handler<I, O> = Box<dyn Fn(&I) -> Result<O, CollaboratorError> + Send + Sync>;
type Latency<I> = Box<dyn Fn(&I) -> Duration + Send + Sync>;

/// A call site backed by a closure.
pub struct FnPrompted<I, O> {
    handler: Handler<I, O>,
    latency: Option<Latency<I>>,
    calls: AtomicUsize,
}

impl<I, O> FnPrompted<I, O> {
    /// Answer every call with `handler`.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&I) -> Result<O, CollaboratorError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            latency: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep before answering, for a duration chosen per input.
    pub fn with_latency<F>(mut self, latency: F) -> Self
    where
        F: Fn(&I) -> Duration + Send + Sync + 'static,
    {
        self.latency = Some(Box::new(latency));
        self
    }

    /// Number of invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<I, O> Prompted<I, O> for FnPrompted<I, O>
where
    I: Send + Sync,
    O: Send,
{
    async fn invoke(&self, input: &I) -> Result<O, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = &self.latency {
            tokio::time::sleep(latency(input)).await;
        }
        (self.handler)(input)
    }
}

#[derive(Debug, Clone)]
enum MockSearch {
    Hits(Vec<SearchHit>),
    Failure(String),
}

type Fallback = Arc<dyn Fn(&str) -> Vec<SearchHit> + Send + Sync>;

/// Search provider answering from a fixed table.
///
/// Unknown queries return the fallback's hits, or nothing.
#[derive(Clone, Default)]
pub struct MockSearchProvider {
    responses: HashMap<String, MockSearch>,
    latencies: HashMap<String, Duration>,
    fallback: Option<Fallback>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockSearchProvider {
    /// A provider that returns no hits for any query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `hits` for exactly `query`.
    pub fn with_hits(mut self, query: impl Into<String>, hits: Vec<SearchHit>) -> Self {
        self.responses.insert(query.into(), MockSearch::Hits(hits));
        self
    }

    /// Fail the query with a transient error.
    pub fn with_failure(mut self, query: impl Into<String>, message: impl Into<String>) -> Self {
        self.responses
            .insert(query.into(), MockSearch::Failure(message.into()));
        self
    }

    /// Sleep before answering `query`.
    pub fn with_latency(mut self, query: impl Into<String>, latency: Duration) -> Self {
        self.latencies.insert(query.into(), latency);
        self
    }

    /// Compute hits for queries without a canned response.
    pub fn with_fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn(&str) -> Vec<SearchHit> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    /// Every query received, in arrival order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, CollaboratorError> {
        self.calls.write().await.push(query.to_string());

        if let Some(latency) = self.latencies.get(query) {
            tokio::time::sleep(*latency).await;
        }

        match self.responses.get(query) {
            Some(MockSearch::Hits(hits)) => Ok(hits.clone()),
            Some(MockSearch::Failure(message)) => Err(CollaboratorError::Transient(message.clone())),
            None => Ok(self
                .fallback
                .as_ref()
                .map(|fallback| fallback(query))
                .unwrap_or_default()),
        }
    }
}
