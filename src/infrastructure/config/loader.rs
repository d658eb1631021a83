//! Layered configuration loading and validation.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Upper bound on `orchestration.max_retries`
pub const MAX_ORCHESTRATION_RETRIES: u32 = 5;

/// Configuration error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Retry budget outside 0..=5
    #[error("Invalid orchestration.max_retries: {0}. Must be between 0 and 5")]
    InvalidMaxRetries(u32),

    /// Query cap outside 1..=10
    #[error("Invalid orchestration.max_queries_per_round: {0}. Must be between 1 and 10")]
    InvalidQueriesPerRound(usize),

    /// Subtask cap outside 1..=20
    #[error("Invalid orchestration.max_subtasks: {0}. Must be between 1 and 20")]
    InvalidMaxSubtasks(usize),

    /// Results per query outside 1..=10
    #[error("Invalid search.results_per_query: {0}. Must be between 1 and 10")]
    InvalidResultsPerQuery(u32),

    /// A zero rate limit, naming the section
    #[error("Invalid {0}.requests_per_second: must be at least 1")]
    InvalidRateLimit(&'static str),

    /// Unknown log level
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Initial backoff not below the maximum
    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    /// Temperature outside 0.0..=1.0
    #[error("Invalid llm.temperature: {0}. Must be between 0.0 and 1.0")]
    InvalidTemperature(String),

    /// Figment failed to extract the merged configuration
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .sleuth/config.yaml (project config)
    /// 3. .sleuth/local.yaml (local overrides, optional)
    /// 4. Environment variables (SLEUTH_* prefix, `__` separates nested keys)
    pub fn load() -> Result<Config> {
        let config: Config = Self::base_figment()
            .merge(Yaml::file(".sleuth/config.yaml"))
            .merge(Yaml::file(".sleuth/local.yaml"))
            .merge(Env::prefixed("SLEUTH_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring `SLEUTH_*` overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Self::base_figment()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("SLEUTH_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn base_figment() -> Figment {
        Figment::new().merge(Serialized::defaults(Config::default()))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let orchestration = &config.orchestration;
        if orchestration.max_retries > MAX_ORCHESTRATION_RETRIES {
            return Err(ConfigError::InvalidMaxRetries(orchestration.max_retries));
        }
        if !(1..=10).contains(&orchestration.max_queries_per_round) {
            return Err(ConfigError::InvalidQueriesPerRound(
                orchestration.max_queries_per_round,
            ));
        }
        if !(1..=20).contains(&orchestration.max_subtasks) {
            return Err(ConfigError::InvalidMaxSubtasks(orchestration.max_subtasks));
        }

        if !(1..=10).contains(&config.search.results_per_query) {
            return Err(ConfigError::InvalidResultsPerQuery(
                config.search.results_per_query,
            ));
        }
        if config.search.max_content_chars == 0 {
            return Err(ConfigError::ValidationFailed(
                "search.max_content_chars must be positive".to_string(),
            ));
        }
        if config.search.requests_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit("search"));
        }
        if config.search.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "search.base_url cannot be empty".to_string(),
            ));
        }

        let llm = &config.llm;
        if llm.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "llm.model cannot be empty".to_string(),
            ));
        }
        if llm.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "llm.base_url cannot be empty".to_string(),
            ));
        }
        if llm.max_tokens == 0 {
            return Err(ConfigError::ValidationFailed(
                "llm.max_tokens must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&llm.temperature) {
            return Err(ConfigError::InvalidTemperature(llm.temperature.to_string()));
        }
        if llm.requests_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit("llm"));
        }
        if llm.retry.initial_backoff_ms >= llm.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                llm.retry.initial_backoff_ms,
                llm.retry.max_backoff_ms,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}
