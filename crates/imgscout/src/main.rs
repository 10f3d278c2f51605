//! imgscout CLI - find product images and publish them to an image host.
//!
//! For every row of a product table, imgscout queries image-search providers,
//! downloads and verifies the results, uploads them, and writes the hosted
//! URLs back into per-provider columns.
//!
//! # Usage
//!
//! ```bash
//! # Fill image columns for every product
//! imgscout run products.csv
//!
//! # Three images per provider, Catbox as host, write to a new file
//! imgscout run products.csv --max-images 3 --host catbox --output out.csv
//!
//! # Try a query against one provider
//! imgscout search "oak chair" --provider openverse
//!
//! # Pick images by hand
//! imgscout curate products.csv
//! ```

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// imgscout - find product images across search providers and publish them.
#[derive(Parser, Debug)]
#[command(name = "imgscout")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "IMGSCOUT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Search, upload and record images for every row of a table
    Run(cli::run::RunArgs),

    /// Query providers for one product and print the URLs found
    Search(cli::search::SearchArgs),

    /// Pick images by hand and export them into the table
    Curate(cli::curate::CurateArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go straight to stderr.
    let config = match cli::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `imgscout config path`."
            );
            imgscout_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("imgscout v{}", imgscout_core::VERSION);

    match cli.command {
        Some(Commands::Run(args)) => cli::run::execute(args, config).await,
        Some(Commands::Search(args)) => cli::search::execute(args, config).await,
        Some(Commands::Curate(args)) => cli::curate::execute(args, config).await,
        Some(Commands::Config(args)) => cli::config::execute(args, cli.config).await,
        None if std::io::stdin().is_terminal() && std::io::stderr().is_terminal() => {
            cli::interactive::run(&config).await
        }
        None => {
            anyhow::bail!("No command given. Run `imgscout --help` for usage.");
        }
    }
}
