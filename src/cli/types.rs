//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::ask::AskArgs;
use super::commands::config::ConfigCommands;

/// Sleuth: answer questions with planned, parallel web research.
#[derive(Parser, Debug)]
#[command(name = "sleuth")]
#[command(about = "Sleuth - answers questions by planning and running web research", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .sleuth/config.yaml and .sleuth/local.yaml)
    #[arg(short, long, global = true, env = "SLEUTH_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a question and print the answer
    Ask(AskArgs),

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_global_flags() {
        let cli = Cli::try_parse_from([
            "sleuth",
            "ask",
            "What is the tallest building in Europe?",
            "--json",
            "--no-progress",
            "--config",
            "custom.yaml",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
        match cli.command {
            Commands::Ask(args) => {
                assert_eq!(args.question, "What is the tallest building in Europe?");
                assert!(args.no_progress);
            }
            Commands::Config(_) => panic!("expected ask"),
        }
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = Cli::try_parse_from(["sleuth", "config", "validate"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommands::Validate)
        ));
    }

    #[test]
    fn test_ask_requires_question() {
        assert!(Cli::try_parse_from(["sleuth", "ask"]).is_err());
    }
}
