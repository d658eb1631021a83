//! Language model port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::CollaboratorError;

/// A rendered prompt: system instructions plus the user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Instructions for the model
    pub system: String,
    /// The request itself
    pub user: String,
}

impl Prompt {
    /// A prompt with the given system and user parts.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Raw text generation against a language model.
///
/// `expected_schema` is a JSON schema the output should satisfy. Implementations pass it to the
/// model as guidance; validation happens in the caller.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete `prompt`, returning the raw reply text.
    async fn generate(
        &self,
        prompt: &Prompt,
        expected_schema: Option<&serde_json::Value>,
    ) -> Result<String, CollaboratorError>;
}
