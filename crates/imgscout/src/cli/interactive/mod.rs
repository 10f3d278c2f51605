//! Interactive mode, started by a bare `imgscout` on a TTY.
//!
//! A menu-driven front end over the same handlers the flag-based commands
//! use.

pub mod batch;
pub mod curate;
pub mod setup;
pub mod theme;

use std::path::PathBuf;

use console::Style;
use dialoguer::{Confirm, Input, Select};
use imgscout_core::Config;

/// Convert a dialoguer result into `Ok(Some(value))` on success, `Ok(None)` on
/// interrupt (Ctrl+C / terminal disconnect), and `Err` for other I/O failures.
fn handle_interrupt<T>(result: dialoguer::Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Prompt for an existing CSV file. `None` when the user backs out.
fn prompt_table_path(theme: &dialoguer::theme::ColorfulTheme) -> anyhow::Result<Option<PathBuf>> {
    loop {
        let Some(raw) = handle_interrupt(
            Input::<String>::with_theme(theme)
                .with_prompt("Path to product table (CSV)")
                .interact_text(),
        )?
        else {
            return Ok(None);
        };

        let path = PathBuf::from(shellexpand::tilde(raw.trim()).into_owned());
        if path.is_file() {
            return Ok(Some(path));
        }
        theme::warn(format!("File not found: {}", path.display()));
    }
}

const MENU_ITEMS: &[&str] = &[
    "Fill image columns (batch run)",
    "Pick images by hand (curate)",
    "Set up credentials",
    "View configuration",
    "Exit",
];

/// Entry point for interactive mode.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    theme::print_banner();

    let theme = theme::scout_theme();
    let mut config = config.clone();

    loop {
        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(MENU_ITEMS)
            .default(0)
            .interact_opt()?;

        match selection {
            Some(0) => batch::guided_run(&config).await?,
            Some(1) => curate::guided_curate(&config).await?,
            Some(2) => setup::guided_credentials(&mut config)?,
            Some(3) => show_config(&config)?,
            _ => break,
        }
    }

    Ok(())
}

/// Label/value rows describing the session config.
fn config_rows(config: &Config) -> Vec<(&'static str, String)> {
    let providers: Vec<&str> = config.search.providers.iter().map(|p| p.label()).collect();
    let columns: Vec<&str> = config
        .search
        .providers
        .iter()
        .map(|&p| config.table.columns.prefix_for(p))
        .collect();

    vec![
        ("Providers", providers.join(", ")),
        ("Images", format!("{} per provider", config.search.max_images)),
        ("Output columns", columns.join(", ")),
        (
            "Upload host",
            format!(
                "{} ({})",
                config.upload.host,
                setup::host_credential_summary(config)
            ),
        ),
        ("Product column", config.table.product_column.clone()),
        (
            "Existing images",
            (if config.table.overwrite { "replaced" } else { "kept" }).to_string(),
        ),
        (
            "Local copies",
            config
                .save_root()
                .map_or_else(|| "off".to_string(), |p| p.display().to_string()),
        ),
    ]
}

/// Print the session settings, optionally followed by the full TOML.
fn show_config(config: &Config) -> anyhow::Result<()> {
    let theme = theme::scout_theme();
    let bold = Style::new().for_stderr().bold();
    let dim = Style::new().for_stderr().dim();

    let path = Config::default_path();
    let source = if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not created, using defaults)", path.display())
    };

    eprintln!();
    eprintln!("    {:<18} {}", bold.apply_to("Config file"), dim.apply_to(source));
    for (label, value) in config_rows(config) {
        eprintln!("    {:<18} {value}", bold.apply_to(label));
    }
    eprintln!();

    let dump = Confirm::with_theme(&theme)
        .with_prompt("Print the full TOML?")
        .default(false)
        .interact_opt()?;
    if dump == Some(true) {
        eprintln!("{}", config.to_toml()?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgscout_core::ProviderKind;

    #[test]
    fn config_rows_follow_provider_order() {
        let mut config = Config::default();
        config.search.providers = vec![ProviderKind::Openverse, ProviderKind::Bing];
        config.table.overwrite = true;

        let rows = config_rows(&config);
        assert_eq!(rows[0], ("Providers", "Openverse, Bing".to_string()));
        assert_eq!(
            rows[2],
            ("Output columns", "image_openverse, image_bing".to_string())
        );
        assert!(rows.contains(&("Existing images", "replaced".to_string())));
        assert!(rows.contains(&("Local copies", "off".to_string())));
    }
}
