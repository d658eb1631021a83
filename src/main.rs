//! Sleuth CLI entry point.

use clap::Parser;

use sleuth::cli::commands::{ask, config};
use sleuth::cli::{handle_error, Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Ask(args) => ask::execute(args, config_path, cli.json).await,
        Commands::Config(ref command) => config::execute(command, config_path, cli.json),
    };

    if let Err(err) = result {
        handle_error(&err, cli.json);
    }
}
