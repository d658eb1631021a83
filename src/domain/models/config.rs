//! Configuration model.
//!
//! Every section has defaults, so an empty file or no file at all is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for Sleuth
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Language model configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Web search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Planner and orchestrator bounds
    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Anthropic Messages API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LlmConfig {
    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// API key (falls back to `ANTHROPIC_API_KEY` when unset)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Messages API root, overridable for proxies and tests
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Completion budget per call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature (0.0-1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    /// Client-side rate limit
    #[serde(default = "default_llm_requests_per_second")]
    pub requests_per_second: u32,

    /// Retry policy for transient API failures
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_model() -> String {
    "claude-sonnet-4-5".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

const fn default_max_tokens() -> u32 {
    4096
}

const fn default_temperature() -> f32 {
    0.0
}

const fn default_llm_timeout_secs() -> u64 {
    120
}

const fn default_llm_requests_per_second() -> u32 {
    5
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: default_llm_base_url(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout_secs(),
            requests_per_second: default_llm_requests_per_second(),
            retry: RetryConfig::default(),
        }
    }
}

impl LlmConfig {
    /// Configured key, else the `ANTHROPIC_API_KEY` environment variable.
    pub fn resolved_api_key(&self) -> Option<String> {
        non_blank(self.api_key.clone()).or_else(|| non_blank(std::env::var("ANTHROPIC_API_KEY").ok()))
    }
}

/// Retry policy for transient collaborator failures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff interval; must be below `max_backoff_ms`
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Ceiling for a single backoff interval
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Google Custom Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SearchConfig {
    /// API key (falls back to `GOOGLE_API_KEY` when unset)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Programmable search engine id (falls back to `GOOGLE_CX` when unset)
    #[serde(default)]
    pub engine_id: Option<String>,

    /// Custom Search API root
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Hits requested per query (1-10)
    #[serde(default = "default_results_per_query")]
    pub results_per_query: u32,

    /// Fetch each hit's page and use its text instead of the snippet
    #[serde(default = "default_true")]
    pub fetch_pages: bool,

    /// Timeout for fetching one result page
    #[serde(default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,

    /// Page text is truncated to this many characters
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,

    /// Client-side rate limit for search API calls
    #[serde(default = "default_search_requests_per_second")]
    pub requests_per_second: u32,
}

fn default_search_base_url() -> String {
    "https://www.googleapis.com".to_string()
}

const fn default_results_per_query() -> u32 {
    2
}

const fn default_true() -> bool {
    true
}

const fn default_page_timeout_secs() -> u64 {
    15
}

const fn default_max_content_chars() -> usize {
    2500
}

const fn default_search_requests_per_second() -> u32 {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            engine_id: None,
            base_url: default_search_base_url(),
            results_per_query: default_results_per_query(),
            fetch_pages: default_true(),
            page_timeout_secs: default_page_timeout_secs(),
            max_content_chars: default_max_content_chars(),
            requests_per_second: default_search_requests_per_second(),
        }
    }
}

impl SearchConfig {
    /// Configured key, else the `GOOGLE_API_KEY` environment variable.
    pub fn resolved_api_key(&self) -> Option<String> {
        non_blank(self.api_key.clone()).or_else(|| non_blank(std::env::var("GOOGLE_API_KEY").ok()))
    }

    /// Configured engine id, else the `GOOGLE_CX` environment variable.
    pub fn resolved_engine_id(&self) -> Option<String> {
        non_blank(self.engine_id.clone()).or_else(|| non_blank(std::env::var("GOOGLE_CX").ok()))
    }
}

/// Bounds for the planner and the per-subtask orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OrchestrationConfig {
    /// Budget for each retry edge of a subtask (0-5)
    #[serde(default = "default_orchestration_max_retries")]
    pub max_retries: u32,

    /// Upper bound on queries generated per search round
    #[serde(default = "default_max_queries_per_round")]
    pub max_queries_per_round: usize,

    /// Upper bound on subtasks produced by decomposition
    #[serde(default = "default_max_subtasks")]
    pub max_subtasks: usize,

    /// Subtasks allowed to run at once (0 = unbounded)
    #[serde(default)]
    pub max_concurrent_subtasks: usize,
}

const fn default_orchestration_max_retries() -> u32 {
    2
}

const fn default_max_queries_per_round() -> usize {
    2
}

const fn default_max_subtasks() -> usize {
    5
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            max_retries: default_orchestration_max_retries(),
            max_queries_per_round: default_max_queries_per_round(),
            max_subtasks: default_max_subtasks(),
            max_concurrent_subtasks: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console output format
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for rolling JSON log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation of the log file
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}

/// Console log format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Human-readable, multi-line
    #[default]
    Pretty,
}

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    /// Roll at midnight
    #[default]
    Daily,
    /// Roll every hour
    Hourly,
    /// A single file, never rotated
    Never,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
