//! Guided batch run.
//!
//! Walks the user through: table path → providers → images per provider →
//! upload host → overwrite → output path → confirmation, then hands a
//! `RunArgs` to the `run` command.

use std::path::PathBuf;

use console::Style;
use dialoguer::{Confirm, Input, MultiSelect, Select};
use imgscout_core::config::MAX_IMAGES_LIMIT;
use imgscout_core::{Config, HostKind, ProviderKind};

use super::theme::{note, scout_theme, warn};
use crate::cli::run::{Host, RunArgs};

/// Walk the user through a batch run.
pub async fn guided_run(config: &Config) -> anyhow::Result<()> {
    let theme = scout_theme();

    let Some(input) = super::prompt_table_path(&theme)? else {
        return Ok(());
    };

    // ── Providers ───────────────────────────────────────────────────────────

    let labels: Vec<&str> = ProviderKind::ALL.iter().map(|p| p.label()).collect();
    let defaults: Vec<bool> = ProviderKind::ALL
        .iter()
        .map(|p| config.search.providers.contains(p))
        .collect();
    let Some(picked) = MultiSelect::with_theme(&theme)
        .with_prompt("Providers (space to toggle)")
        .items(&labels)
        .defaults(&defaults)
        .interact_opt()?
    else {
        return Ok(());
    };
    if picked.is_empty() {
        warn("No providers selected.");
        return Ok(());
    }
    let providers: Vec<String> = picked
        .iter()
        .map(|&i| ProviderKind::ALL[i].to_string())
        .collect();

    // ── Images per provider ─────────────────────────────────────────────────

    let counts: Vec<String> = (1..=MAX_IMAGES_LIMIT).map(|n| n.to_string()).collect();
    let Some(count_idx) = Select::with_theme(&theme)
        .with_prompt("Images per provider")
        .items(&counts)
        .default(config.search.max_images.clamp(1, MAX_IMAGES_LIMIT) - 1)
        .interact_opt()?
    else {
        return Ok(());
    };
    let max_images = count_idx + 1;

    // ── Upload host ─────────────────────────────────────────────────────────

    let host_items = &["ImgBB (API key)", "Catbox (anonymous OK)"];
    let host_default = match config.upload.host {
        HostKind::Imgbb => 0,
        HostKind::Catbox => 1,
    };
    let host = match Select::with_theme(&theme)
        .with_prompt("Upload host")
        .items(host_items)
        .default(host_default)
        .interact_opt()?
    {
        Some(0) => Host::Imgbb,
        Some(_) => Host::Catbox,
        None => return Ok(()),
    };

    let mut session = config.clone();
    session.upload.host = host.into();
    if !super::setup::ensure_upload_credentials(&mut session)? {
        warn("ImgBB needs an API key. Pick Catbox or set the key first.");
        return Ok(());
    }

    // ── Overwrite and output ────────────────────────────────────────────────

    let Some(overwrite) = Confirm::with_theme(&theme)
        .with_prompt("Replace images already in the table?")
        .default(config.table.overwrite)
        .interact_opt()?
    else {
        return Ok(());
    };
    session.table.overwrite = overwrite;

    let default_output = input.display().to_string();
    let Some(raw_output) = super::handle_interrupt(
        Input::<String>::with_theme(&theme)
            .with_prompt("Write updated table to")
            .default(default_output)
            .interact_text(),
    )?
    else {
        return Ok(());
    };
    let output = PathBuf::from(shellexpand::tilde(raw_output.trim()).into_owned());

    // ── Confirmation ────────────────────────────────────────────────────────

    eprintln!();
    let bold = Style::new().for_stderr().bold();
    eprintln!("  {}", bold.apply_to(format!("Ready to process {}", input.display())));
    note(format!(
        "Providers: {} | Images: {max_images} | Host: {} | Output: {}",
        providers.join(", "),
        session.upload.host,
        output.display()
    ));
    eprintln!();

    let confirm = Confirm::with_theme(&theme)
        .with_prompt("Start?")
        .default(true)
        .interact_opt()?;
    if confirm != Some(true) {
        return Ok(());
    }

    let args = RunArgs {
        input,
        output: Some(output),
        providers: Some(providers.join(",")),
        max_images: Some(max_images),
        overwrite,
        host: Some(host),
        ..RunArgs::default()
    };

    if let Err(e) = crate::cli::run::execute(args, session).await {
        let err = Style::new().for_stderr().red();
        eprintln!("  {} {e}", err.apply_to("✗"));
    }
    Ok(())
}
