//! Implementation of the `sleuth config` commands.

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use std::path::Path;

use crate::cli::load_config;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

/// `sleuth config` subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Check the configuration and report missing credentials
    Validate,
}

/// Which credentials resolve, without revealing them.
#[derive(Debug, Serialize)]
pub struct CredentialStatus {
    /// Anthropic key resolves from config or environment
    pub anthropic_api_key: bool,
    /// Google key resolves from config or environment
    pub google_api_key: bool,
    /// Google engine id resolves from config or environment
    pub google_engine_id: bool,
}

impl CredentialStatus {
    fn of(config: &Config) -> Self {
        Self {
            anthropic_api_key: config.llm.resolved_api_key().is_some(),
            google_api_key: config.search.resolved_api_key().is_some(),
            google_engine_id: config.search.resolved_engine_id().is_some(),
        }
    }

    fn missing(&self) -> Vec<&'static str> {
        [
            (self.anthropic_api_key, "ANTHROPIC_API_KEY (llm.api_key)"),
            (self.google_api_key, "GOOGLE_API_KEY (search.api_key)"),
            (self.google_engine_id, "GOOGLE_CX (search.engine_id)"),
        ]
        .into_iter()
        .filter_map(|(present, name)| (!present).then_some(name))
        .collect()
    }
}

/// Output of `sleuth config show`.
#[derive(Debug, Serialize)]
pub struct ConfigShowOutput {
    /// Effective configuration, secrets omitted
    pub config: Config,
    /// Which credentials resolve
    pub credentials: CredentialStatus,
}

impl CommandOutput for ConfigShowOutput {
    fn to_human(&self) -> String {
        let yaml = serde_yaml::to_string(&self.config).unwrap_or_default();
        let mut lines = vec![yaml.trim_end().to_string(), String::new()];
        lines.push("credentials:".to_string());
        lines.push(format!("  anthropic_api_key: {}", set_or_missing(self.credentials.anthropic_api_key)));
        lines.push(format!("  google_api_key: {}", set_or_missing(self.credentials.google_api_key)));
        lines.push(format!("  google_engine_id: {}", set_or_missing(self.credentials.google_engine_id)));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Output of `sleuth config validate`.
#[derive(Debug, Serialize)]
pub struct ConfigValidateOutput {
    /// True when the configuration loaded and every credential is present
    pub valid: bool,
    /// Names of the credentials that do not resolve
    pub missing_credentials: Vec<&'static str>,
}

impl CommandOutput for ConfigValidateOutput {
    fn to_human(&self) -> String {
        let mut lines = vec!["Configuration is valid.".to_string()];
        if !self.missing_credentials.is_empty() {
            lines.push("\nMissing credentials:".to_string());
            for name in &self.missing_credentials {
                lines.push(format!("  - {name}"));
            }
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

const fn set_or_missing(present: bool) -> &'static str {
    if present {
        "set"
    } else {
        "missing"
    }
}

/// Run a `sleuth config` subcommand.
pub fn execute(command: &ConfigCommands, config_path: Option<&Path>, json_mode: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let credentials = CredentialStatus::of(&config);

    match command {
        ConfigCommands::Show => output(
            &ConfigShowOutput {
                config,
                credentials,
            },
            json_mode,
        ),
        ConfigCommands::Validate => output(
            &ConfigValidateOutput {
                valid: true,
                missing_credentials: credentials.missing(),
            },
            json_mode,
        ),
    }
    Ok(())
}
