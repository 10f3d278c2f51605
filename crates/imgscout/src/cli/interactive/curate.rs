//! Hand-picking images per product.
//!
//! Fetch phase: every row is searched and its valid candidates kept. Then a
//! menu loop lets the user review rows, auto-select, clear, and export picks
//! into `<prefix>_1..N` columns, optionally uploading them first.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use console::Style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, MultiSelect, Select};
use indicatif::{ProgressBar, ProgressStyle};
use imgscout_core::curate::{
    collect_candidates, export, export_with_upload, product_label, ExportSummary, ExportUpload,
};
use imgscout_core::upload::Pacing;
use imgscout_core::{
    Candidate, Config, ImageFetcher, ImgScout, SearchQuery, Selection, Table, UploaderFactory,
};

use super::theme::{note, scout_theme, warn};

/// Menu entry: ask for a table, then curate it.
pub async fn guided_curate(config: &Config) -> anyhow::Result<()> {
    let theme = scout_theme();
    let Some(input) = super::prompt_table_path(&theme)? else {
        return Ok(());
    };
    if let Err(e) = curate_table(config, &input, None, None).await {
        let err = Style::new().for_stderr().red();
        eprintln!("  {} {e}", err.apply_to("✗"));
    }
    Ok(())
}

/// Fetch candidates for every row of `input`, then run the pick/export loop.
pub async fn curate_table(
    config: &Config,
    input: &Path,
    output: Option<PathBuf>,
    preview_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let theme = scout_theme();
    let scout = ImgScout::new(config.clone())?;
    let mut table = Table::load(input)?;
    let product_col = table.require_column(&config.table.product_column)?;

    let providers = scout.providers()?;
    let fetcher = scout.fetcher()?;
    let max_images = config.search.max_images;
    let preview_root = preview_dir.or_else(|| config.save_root());
    let rows = config
        .table
        .limit_rows
        .map_or(table.len(), |n| n.min(table.len()));

    // ── Fetch phase ─────────────────────────────────────────────────────────

    let progress = fetch_progress_bar(rows as u64);
    let mut candidates: BTreeMap<usize, Vec<Candidate>> = BTreeMap::new();
    for row in 0..rows {
        let label = product_label(&table, row, product_col);
        progress.set_message(label.clone());

        if let Some(query) = SearchQuery::new(&label) {
            let found = collect_candidates(
                &providers,
                &fetcher,
                &query,
                max_images,
                preview_root.as_deref(),
            )
            .await;
            if !found.is_empty() {
                candidates.insert(row, found);
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    if candidates.is_empty() {
        warn("No valid images were found across all products.");
        return Ok(());
    }
    note(format!(
        "{} of {rows} product(s) have images",
        candidates.len()
    ));
    if let Some(root) = &preview_root {
        note(format!("Previews saved under {}", root.display()));
    }

    // ── Pick / export loop ──────────────────────────────────────────────────

    let mut selection = Selection::new();
    let output = output.unwrap_or_else(|| input.to_path_buf());

    loop {
        let items = &[
            "Review a product",
            "Auto-select for all products",
            "Clear selections",
            "Export",
            "Back",
        ];
        let choice = Select::with_theme(&theme)
            .with_prompt(format!("{} image(s) picked", selection.count()))
            .items(items)
            .default(0)
            .interact_opt()?;

        match choice {
            Some(0) => review(&theme, &table, product_col, &candidates, &mut selection)?,
            Some(1) => {
                let counts: Vec<String> = (1..=max_images).map(|n| n.to_string()).collect();
                if let Some(i) = Select::with_theme(&theme)
                    .with_prompt("How many per product?")
                    .items(&counts)
                    .default(0)
                    .interact_opt()?
                {
                    let added = selection.auto_select(&candidates, i + 1);
                    note(format!("Auto-selected {added} image(s)"));
                }
            }
            Some(2) => {
                selection.clear();
                note("Selections cleared.");
            }
            Some(3) => {
                if export_flow(&theme, config, &mut table, &selection, &output).await? {
                    return Ok(());
                }
            }
            _ => return Ok(()),
        }
    }
}

/// Pick a row, then toggle its candidates.
fn review(
    theme: &ColorfulTheme,
    table: &Table,
    product_col: usize,
    candidates: &BTreeMap<usize, Vec<Candidate>>,
    selection: &mut Selection,
) -> anyhow::Result<()> {
    let rows: Vec<usize> = candidates.keys().copied().collect();

    loop {
        let items: Vec<String> = rows
            .iter()
            .map(|&row| {
                let picked = selection
                    .row(row)
                    .map_or(0, |p| p.values().map(Vec::len).sum::<usize>());
                format!(
                    "Row {}: {} ({} images, {picked} picked)",
                    row + 1,
                    product_label(table, row, product_col),
                    candidates[&row].len()
                )
            })
            .collect();

        let Some(i) = Select::with_theme(theme)
            .with_prompt("Product (Esc to go back)")
            .items(&items)
            .default(0)
            .interact_opt()?
        else {
            return Ok(());
        };

        let row = rows[i];
        let row_candidates = &candidates[&row];
        let labels: Vec<String> = row_candidates
            .iter()
            .enumerate()
            .map(|(j, c)| candidate_label(j, c))
            .collect();
        let defaults: Vec<bool> = row_candidates
            .iter()
            .map(|c| selection.is_selected(row, c.provider, &c.url))
            .collect();

        let Some(chosen) = MultiSelect::with_theme(theme)
            .with_prompt("Images to keep (space to toggle)")
            .items(&labels)
            .defaults(&defaults)
            .interact_opt()?
        else {
            continue;
        };

        for (j, c) in row_candidates.iter().enumerate() {
            if chosen.contains(&j) != selection.is_selected(row, c.provider, &c.url) {
                selection.toggle(row, c.provider, &c.url);
            }
        }
    }
}

fn candidate_label(index: usize, candidate: &Candidate) -> String {
    let location = candidate
        .local_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| candidate.url.clone());
    format!("[{}] #{} {location}", candidate.provider.label(), index + 1)
}

/// Export picks and save the table. Returns true when the table was written.
async fn export_flow(
    theme: &ColorfulTheme,
    config: &Config,
    table: &mut Table,
    selection: &Selection,
    default_output: &Path,
) -> anyhow::Result<bool> {
    if selection.is_empty() {
        warn("Nothing picked yet.");
        return Ok(false);
    }

    let upload_items = [
        "Keep source URLs".to_string(),
        format!("Upload to {} first", config.upload.host),
    ];
    let Some(mode) = Select::with_theme(theme)
        .with_prompt("Export")
        .items(&upload_items)
        .default(0)
        .interact_opt()?
    else {
        return Ok(false);
    };

    let Some(raw_output) = super::handle_interrupt(
        Input::<String>::with_theme(theme)
            .with_prompt("Write updated table to")
            .default(default_output.display().to_string())
            .interact_text(),
    )?
    else {
        return Ok(false);
    };
    let output = PathBuf::from(shellexpand::tilde(raw_output.trim()).into_owned());
    let max_images = config.search.max_images;

    let summary = if mode == 1 {
        let mut session = config.clone();
        if !super::setup::ensure_upload_credentials(&mut session)? {
            warn("No upload credentials; export cancelled.");
            return Ok(false);
        }
        let backend = UploaderFactory::from_config(&session)?;
        let fetcher = ImageFetcher::from_config(&session)?;
        let pacing = Pacing::from_config(&session.upload);
        let upload = ExportUpload {
            backend: backend.as_ref(),
            fetcher: &fetcher,
            deadline: Duration::from_secs(session.upload.deadline_secs),
            pacing: &pacing,
        };

        let spinner = ProgressBar::new_spinner();
        spinner.set_message(format!("Uploading {} image(s)...", selection.count()));
        spinner.enable_steady_tick(Duration::from_millis(120));
        let summary =
            export_with_upload(table, selection, &session.table, max_images, &upload).await;
        spinner.finish_and_clear();
        summary?
    } else {
        export(table, selection, &config.table, max_images)?
    };

    table.save(&output)?;
    print_export_summary(&summary, &output);
    Ok(true)
}

fn fetch_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} Fetching [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn print_export_summary(summary: &ExportSummary, output: &Path) {
    let green = Style::new().for_stderr().green();
    eprintln!();
    eprintln!(
        "  {} Exported {} image(s) for {} product(s)",
        green.apply_to("✓"),
        summary.urls_written,
        summary.rows_updated
    );
    if summary.uploaded + summary.fell_back > 0 {
        note(format!(
            "{} hosted, {} kept as source URL",
            summary.uploaded, summary.fell_back
        ));
    }
    note(format!("Saved to {}", output.display()));
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgscout_core::ProviderKind;

    #[test]
    fn candidate_label_prefers_local_path() {
        let mut c = Candidate {
            provider: ProviderKind::Openverse,
            url: "http://o/1.jpg".to_string(),
            local_path: None,
        };
        assert_eq!(candidate_label(0, &c), "[Openverse] #1 http://o/1.jpg");

        c.local_path = Some(PathBuf::from("/tmp/openverse/Chair.jpg"));
        assert_eq!(candidate_label(2, &c), "[Openverse] #3 /tmp/openverse/Chair.jpg");
    }
}
