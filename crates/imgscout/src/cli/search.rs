//! The `imgscout search` command: try one query against the providers.

use clap::Args;
use imgscout_core::output::to_json;
use imgscout_core::{Config, ImageResult, ProviderFactory, SearchQuery};

/// Arguments for the `search` command.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Product name to search for
    #[arg(required = true)]
    pub query: String,

    /// Providers to query, comma-separated (defaults to the configured list)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Results per provider
    #[arg(short, long, default_value = "5")]
    pub limit: usize,

    /// Print results as JSON instead of plain URLs
    #[arg(long)]
    pub json: bool,
}

/// Execute the search command.
pub async fn execute(args: SearchArgs, config: Config) -> anyhow::Result<()> {
    let Some(query) = SearchQuery::new(&args.query) else {
        anyhow::bail!("Query is empty");
    };

    let kinds = match &args.provider {
        Some(raw) => super::parse_providers(raw)?,
        None => config.search.providers.clone(),
    };

    let mut all: Vec<ImageResult> = Vec::new();
    for kind in kinds {
        let provider = ProviderFactory::create(kind, &config)?;
        let results = provider.image_results(&query, args.limit).await;
        tracing::info!("{} returned {} result(s)", provider.name(), results.len());

        if !args.json {
            for result in &results {
                println!("{}\t{}", kind, result.url);
            }
        }
        all.extend(results);
    }

    if args.json {
        println!("{}", to_json(&all, true)?);
    }
    Ok(())
}
