//! Crunch CLI - perceptual JPEG compression for files and directory trees.
//!
//! # Usage
//!
//! ```bash
//! # Convert a single image
//! crunch convert --quality 90 original.png output.jpg
//!
//! # Convert a directory tree, selecting extensions
//! crunch convert input_dir output_dir .png .jpg .jpeg
//!
//! # Only paths matching a pattern, with a JSON Lines report
//! crunch convert --regexp '/\d+[^/]*$' input_dir output_dir .png --report run.jsonl
//!
//! # View configuration
//! crunch config show
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Crunch - perceptual JPEG compressor.
#[derive(Parser, Debug)]
#[command(name = "crunch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compress an image, or every selected image under a directory
    Convert(cli::convert::ConvertArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = resolve_config(crunch_core::Config::load(), &cli.command)?;
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Crunch v{}", crunch_core::VERSION);

    match cli.command {
        Commands::Convert(args) => cli::convert::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}

/// Decide what a config load failure means for the command about to run.
///
/// `convert` must not run on substituted settings, so the error is fatal.
/// The `config` subcommands fall back to defaults so a broken file can still
/// be located and replaced.
fn resolve_config(
    loaded: Result<crunch_core::Config, crunch_core::ConfigError>,
    command: &Commands,
) -> anyhow::Result<crunch_core::Config> {
    match (loaded, command) {
        (Ok(config), _) => Ok(config),
        (Err(e), Commands::Convert(_)) => Err(e).context(format!(
            "Failed to load config from {}",
            crunch_core::Config::default_path().display()
        )),
        (Err(e), Commands::Config(_)) => {
            // Logging isn't initialized yet, so the warning goes through eprintln.
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `crunch config path`."
            );
            Ok(crunch_core::Config::default())
        }
    }
}
