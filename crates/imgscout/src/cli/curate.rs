//! The `imgscout curate` command: interactive picking for a table.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Args;
use imgscout_core::Config;

/// Arguments for the `curate` command.
#[derive(Args, Debug)]
pub struct CurateArgs {
    /// Product table (CSV)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Where to write the updated table (defaults to updating the input in place)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Providers to query, comma-separated
    #[arg(long)]
    pub providers: Option<String>,

    /// Candidates per provider, and slots per provider on export
    #[arg(long)]
    pub max_images: Option<usize>,

    /// Only curate the first N rows
    #[arg(long)]
    pub limit_rows: Option<usize>,

    /// Save preview copies of candidates here
    #[arg(long)]
    pub preview_dir: Option<PathBuf>,
}

/// Execute the curate command.
pub async fn execute(args: CurateArgs, mut config: Config) -> anyhow::Result<()> {
    if !std::io::stdin().is_terminal() {
        anyhow::bail!("`imgscout curate` needs an interactive terminal");
    }

    if let Some(raw) = &args.providers {
        config.search.providers = super::parse_providers(raw)?;
    }
    if let Some(n) = args.max_images {
        config.search.max_images = n;
    }
    if args.limit_rows.is_some() {
        config.table.limit_rows = args.limit_rows;
    }
    let config = config.validated()?;

    super::interactive::curate::curate_table(&config, &args.input, args.output, args.preview_dir)
        .await
}
