//! [`Prompted`] implementation backed by an [`LlmClient`] and a prompt template.

use async_trait::async_trait;
use chrono::Local;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::prompts::PromptTemplate;
use crate::domain::errors::CollaboratorError;
use crate::domain::ports::{LlmClient, Prompted};

/// A prompted collaborator: renders a template, calls the LLM and decodes the reply.
pub struct LlmPrompted<T: PromptTemplate> {
    client: Arc<dyn LlmClient>,
    template: T,
}

impl<T: PromptTemplate> LlmPrompted<T> {
    /// Bind `template` to `client`.
    pub fn new(client: Arc<dyn LlmClient>, template: T) -> Self {
        Self { client, template }
    }
}

#[async_trait]
impl<T: PromptTemplate> Prompted<T::Input, T::Output> for LlmPrompted<T> {
    #[instrument(skip_all, fields(call = T::NAME))]
    async fn invoke(&self, input: &T::Input) -> Result<T::Output, CollaboratorError> {
        let today = Local::now().format("%Y-%m-%d").to_string();
        let prompt = self.template.render(input, &today);
        let schema = self.template.schema();

        let raw = self.client.generate(&prompt, schema.as_ref()).await?;
        debug!(response_len = raw.len(), "LLM responded");

        self.template.parse(&raw).inspect_err(|e| {
            warn!(error = %e, "Could not decode LLM response");
        })
    }
}

/// Extract the JSON object from a model reply.
///
/// Handles a bare object, a fenced ```json block, or an object embedded in prose.
pub fn extract_json_from_response(response: &str) -> String {
    let trimmed = response.trim();

    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return trimmed.to_string();
    }

    if let Some(fence_start) = trimmed.find("```") {
        let after_fence = &trimmed[fence_start + 3..];
        let body_start = after_fence.find('\n').map_or(0, |i| i + 1);
        let body = &after_fence[body_start..];
        if let Some(fence_end) = body.find("```") {
            let candidate = body[..fence_end].trim();
            if candidate.starts_with('{') {
                return candidate.to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end > start {
            return trimmed[start..=end].to_string();
        }
    }

    trimmed.to_string()
}
