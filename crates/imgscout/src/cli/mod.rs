//! Command handlers.

pub mod config;
pub mod curate;
pub mod interactive;
pub mod run;
pub mod search;

use std::path::Path;

use imgscout_core::{Config, ConfigError};

/// Load config from an explicit path, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Parse a comma-separated provider list ("bing,ddg").
pub fn parse_providers(raw: &str) -> anyhow::Result<Vec<imgscout_core::ProviderKind>> {
    let mut providers = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let kind = part.parse().map_err(anyhow::Error::msg)?;
        if !providers.contains(&kind) {
            providers.push(kind);
        }
    }
    if providers.is_empty() {
        anyhow::bail!("No providers given");
    }
    Ok(providers)
}
