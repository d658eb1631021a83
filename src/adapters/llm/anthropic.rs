//! Anthropic Messages API client.
//!
//! Rate limited with governor and retried with exponential backoff. Only transient failures
//! (network errors, 429, 5xx) are retried.

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::errors::CollaboratorError;
use crate::domain::models::LlmConfig;
use crate::domain::ports::{LlmClient, Prompt};
use crate::infrastructure::logging::scrub;

/// Value sent in the `anthropic-version` header.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Speaker of a message turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The caller
    User,
    /// The model
    Assistant,
}

/// Cache control marker for Anthropic prompt caching.
#[derive(Debug, Clone, Serialize)]
pub struct CacheControl {
    /// Always `"ephemeral"`.
    #[serde(rename = "type")]
    pub control_type: &'static str,
}

/// System prompt content block.
#[derive(Debug, Clone, Serialize)]
pub struct SystemContentBlock {
    /// Always `"text"`.
    #[serde(rename = "type")]
    pub block_type: &'static str,
    /// Prompt text
    pub text: String,
    /// Set on the system block to cache the prompt prefix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

impl SystemContentBlock {
    /// A text block marked as an ephemeral cache breakpoint.
    pub fn cached_text(content: impl Into<String>) -> Self {
        Self {
            block_type: "text",
            text: content.into(),
            cache_control: Some(CacheControl {
                control_type: "ephemeral",
            }),
        }
    }
}

/// Content block of a message. Blocks other than text are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    /// Plain text
    #[serde(rename = "text")]
    Text {
        /// Block text
        text: String,
    },
    /// Thinking, tool use and any future block types.
    #[serde(other)]
    Other,
}

/// One conversation turn.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Who spoke
    pub role: MessageRole,
    /// Text blocks of the turn
    pub content: Vec<ContentBlock>,
}

/// Request to the Anthropic Messages API.
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    /// Model identifier, e.g. `claude-sonnet-4-5`.
    pub model: String,
    /// Completion budget
    pub max_tokens: u32,
    /// System prompt, sent as one cached block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<Vec<SystemContentBlock>>,
    /// Conversation so far; a single user turn here
    pub messages: Vec<Message>,
    /// Sampling temperature
    pub temperature: f32,
}

/// Token accounting reported with each response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    /// Prompt tokens billed
    #[serde(default)]
    pub input_tokens: u64,
    /// Completion tokens billed
    #[serde(default)]
    pub output_tokens: u64,
}

/// Response from the Anthropic Messages API.
#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    /// Response text blocks, concatenated by the client
    pub content: Vec<ContentBlock>,
    /// Why generation stopped (`end_turn`, `max_tokens`, ...).
    #[serde(default)]
    pub stop_reason: Option<String>,
    /// Token accounting, logged at debug
    #[serde(default)]
    pub usage: Usage,
}

impl MessagesResponse {
    /// Concatenated text blocks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// `LlmClient` backed by the Anthropic Messages API.
pub struct AnthropicClient {
    config: LlmConfig,
    api_key: String,
    client: Client,
    limiter: DefaultDirectRateLimiter,
}

impl AnthropicClient {
    /// Fails with `Rejected` when no API key is configured.
    pub fn new(config: &LlmConfig) -> Result<Self, CollaboratorError> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            CollaboratorError::Rejected(
                "No Anthropic API key: set llm.api_key or ANTHROPIC_API_KEY".to_string(),
            )
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                CollaboratorError::Rejected(format!("Failed to create HTTP client: {e}"))
            })?;

        let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            config: config.clone(),
            api_key,
            client,
            limiter: RateLimiter::direct(Quota::per_second(rps)),
        })
    }

    fn build_request(&self, prompt: &Prompt, schema: Option<&serde_json::Value>) -> MessagesRequest {
        let mut system = prompt.system.clone();
        if let Some(schema) = schema {
            system.push_str(
                "\n\n## Output format\nRespond with a single JSON object and nothing else. \
                 It must conform to this JSON schema:\n",
            );
            system.push_str(&schema.to_string());
        }

        MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system: (!system.is_empty()).then(|| vec![SystemContentBlock::cached_text(system)]),
            messages: vec![Message {
                role: MessageRole::User,
                content: vec![ContentBlock::Text {
                    text: prompt.user.clone(),
                }],
            }],
            temperature: self.config.temperature,
        }
    }

    async fn send_once(&self, request: &MessagesRequest) -> Result<String, CollaboratorError> {
        self.limiter.until_ready().await;

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url.trim_end_matches('/')))
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let result: MessagesResponse = response.json().await.map_err(|e| {
            CollaboratorError::MalformedOutput(format!("Failed to parse response: {}", e.without_url()))
        })?;
        debug!(
            input_tokens = result.usage.input_tokens,
            output_tokens = result.usage.output_tokens,
            stop_reason = result.stop_reason.as_deref().unwrap_or("none"),
            "LLM call completed"
        );

        let text = result.text();
        if text.trim().is_empty() {
            return Err(CollaboratorError::MalformedOutput(
                "API returned no text content".to_string(),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn generate(
        &self,
        prompt: &Prompt,
        expected_schema: Option<&serde_json::Value>,
    ) -> Result<String, CollaboratorError> {
        let request = self.build_request(prompt, expected_schema);
        let retry = &self.config.retry;
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(retry.initial_backoff_ms))
            .with_max_interval(Duration::from_millis(retry.max_backoff_ms))
            .with_max_elapsed_time(None)
            .build();

        let max_retries = retry.max_retries;
        let request = &request;
        let mut attempt = 0u32;
        backoff::future::retry_notify(
            policy,
            move || {
                attempt += 1;
                let retries_used = attempt - 1;
                async move {
                    self.send_once(request).await.map_err(|e| {
                        if e.is_transient() && retries_used < max_retries {
                            backoff::Error::transient(e)
                        } else {
                            backoff::Error::permanent(e)
                        }
                    })
                }
            },
            |e: CollaboratorError, wait: Duration| {
                warn!(error = %e, retry_in = ?wait, "Transient LLM failure, retrying");
            },
        )
        .await
    }
}

/// Map an HTTP error status to the collaborator taxonomy.
pub fn classify_status(status: StatusCode, body: &str) -> CollaboratorError {
    let message = format!("HTTP {}: {}", status.as_u16(), scrub(body.trim()));
    match status.as_u16() {
        429 | 500..=599 => CollaboratorError::Transient(message),
        _ => CollaboratorError::Rejected(message),
    }
}

/// Transport failures are transient; a body that cannot be decoded is malformed.
pub fn classify_transport_error(error: reqwest::Error) -> CollaboratorError {
    let is_decode = error.is_decode();
    let message = scrub(&error.without_url().to_string());
    if is_decode {
        CollaboratorError::MalformedOutput(message)
    } else {
        CollaboratorError::Transient(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RetryConfig;

    #[test]
    fn test_classify_status() {
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(classify_status(StatusCode::INTERNAL_SERVER_ERROR, "").is_transient());
        assert!(classify_status(StatusCode::from_u16(529).unwrap(), "overloaded").is_transient());
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "invalid x-api-key"),
            CollaboratorError::Rejected(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "max_tokens too large"),
            CollaboratorError::Rejected(_)
        ));
    }

    #[test]
    fn test_classified_body_is_scrubbed() {
        let err = classify_status(StatusCode::UNAUTHORIZED, "bad key sk-ant-api03-leakedleaked");
        assert!(!err.to_string().contains("leakedleaked"));
    }

    #[test]
    fn test_response_text_skips_non_text_blocks() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"content": [{"type": "thinking", "thinking": "..."}, {"type": "text", "text": "hello"}]}"#,
        )
        .unwrap();
        assert_eq!(response.text(), "hello");
    }

    #[test]
    fn test_schema_is_appended_to_system_prompt() {
        let config = LlmConfig {
            api_key: Some("sk-ant-test".to_string()),
            ..LlmConfig::default()
        };
        let client = AnthropicClient::new(&config).unwrap();
        let schema = serde_json::json!({"type": "object"});

        let request = client.build_request(&Prompt::new("Plan tasks.", "Hello"), Some(&schema));
        let system = request.system.unwrap();
        assert!(system[0].text.starts_with("Plan tasks."));
        assert!(system[0].text.contains(r#"{"type":"object"}"#));
    }

    #[test]
    fn test_missing_key_is_rejected() {
        temp_env::with_var_unset("ANTHROPIC_API_KEY", || {
            let result = AnthropicClient::new(&LlmConfig::default());
            assert!(matches!(result, Err(CollaboratorError::Rejected(_))));
        });
    }

    fn client_for(server: &mockito::ServerGuard, max_retries: u32) -> AnthropicClient {
        let config = LlmConfig {
            api_key: Some("sk-ant-test".to_string()),
            base_url: server.url(),
            requests_per_second: 100,
            retry: RetryConfig {
                max_retries,
                initial_backoff_ms: 1,
                max_backoff_ms: 5,
            },
            ..LlmConfig::default()
        };
        AnthropicClient::new(&config).unwrap()
    }

    const OK_BODY: &str = r#"{"content": [{"type": "text", "text": "Tokyo"}], "stop_reason": "end_turn", "usage": {"input_tokens": 12, "output_tokens": 1}}"#;

    #[tokio::test]
    async fn test_generate_returns_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "sk-ant-test")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(OK_BODY)
            .create_async()
            .await;

        let client = client_for(&server, 0);
        let text = client
            .generate(&Prompt::new("Answer tersely.", "Capital of Japan?"), None)
            .await
            .unwrap();

        assert_eq!(text, "Tokyo");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limited_call_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("POST", "/v1/messages")
            .with_status(429)
            .with_body(r#"{"error": {"type": "rate_limit_error"}}"#)
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(OK_BODY)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server, 2);
        let text = client.generate(&Prompt::new("", "hi"), None).await.unwrap();

        assert_eq!(text, "Tokyo");
        limited.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .with_status(401)
            .with_body(r#"{"error": {"type": "authentication_error"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server, 3);
        let result = client.generate(&Prompt::new("", "hi"), None).await;

        assert!(matches!(result, Err(CollaboratorError::Rejected(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_retries_are_capped() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .with_status(503)
            .with_body("overloaded")
            .expect(3)
            .create_async()
            .await;

        let client = client_for(&server, 2);
        let result = client.generate(&Prompt::new("", "hi"), None).await;

        assert!(matches!(result, Err(CollaboratorError::Transient(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_text_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content": []}"#)
            .create_async()
            .await;

        let client = client_for(&server, 0);
        let result = client.generate(&Prompt::new("", "hi"), None).await;

        assert!(matches!(result, Err(CollaboratorError::MalformedOutput(_))));
    }
}
