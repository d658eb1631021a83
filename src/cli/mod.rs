//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

use anyhow::Result;
use console::style;
use std::path::Path;

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::scrub;

pub use types::{Cli, Commands};

/// Load configuration from `path`, or from the default `.sleuth/` files.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Print `err` in the requested form and exit with a failure status.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    let message = scrub(&format!("{err:#}"));
    if json_mode {
        let body = serde_json::json!({ "success": false, "error": message });
        println!(
            "{}",
            serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string())
        );
    } else {
        eprintln!("{} {message}", style("Error:").red().bold());
    }
    std::process::exit(1)
}
