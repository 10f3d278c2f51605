//! The `imgscout run` command: batch search, upload and record.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};
use imgscout_core::output::OutputFormat as CoreOutputFormat;
use imgscout_core::{Config, HostKind, ImgScout, ReportWriter, RowReport, RunStats, Table};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Product table (CSV)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Where to write the updated table (defaults to updating the input in place)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Providers to query, comma-separated (bing, duckduckgo, openverse, google)
    #[arg(long)]
    pub providers: Option<String>,

    /// Images per provider per row
    #[arg(long)]
    pub max_images: Option<usize>,

    /// Replace existing values in provider columns
    #[arg(long)]
    pub overwrite: bool,

    /// Upload host
    #[arg(long, value_enum)]
    pub host: Option<Host>,

    /// Only process the first N rows
    #[arg(long)]
    pub limit_rows: Option<usize>,

    /// Keep a local copy of every downloaded image under this directory
    #[arg(long)]
    pub save_root: Option<PathBuf>,

    /// Write a per-row report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value = "jsonl")]
    pub report_format: ReportFormat,

    /// Query providers only; no downloads, uploads or table writes
    #[arg(long)]
    pub dry_run: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: None,
            providers: None,
            max_images: None,
            overwrite: false,
            host: None,
            limit_rows: None,
            save_root: None,
            report: None,
            report_format: ReportFormat::Jsonl,
            dry_run: false,
        }
    }
}

/// Upload hosts selectable from the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Host {
    Imgbb,
    Catbox,
}

impl From<Host> for HostKind {
    fn from(host: Host) -> Self {
        match host {
            Host::Imgbb => HostKind::Imgbb,
            Host::Catbox => HostKind::Catbox,
        }
    }
}

/// Supported report formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReportFormat {
    /// Single JSON document
    Json,
    /// One JSON object per line
    Jsonl,
}

impl From<ReportFormat> for CoreOutputFormat {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Json => CoreOutputFormat::Json,
            ReportFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Apply command-line overrides on top of the loaded config.
pub fn apply_overrides(mut config: Config, args: &RunArgs) -> anyhow::Result<Config> {
    if let Some(raw) = &args.providers {
        config.search.providers = super::parse_providers(raw)?;
    }
    if let Some(n) = args.max_images {
        config.search.max_images = n;
    }
    if args.overwrite {
        config.table.overwrite = true;
    }
    if let Some(host) = args.host {
        config.upload.host = host.into();
    }
    if args.limit_rows.is_some() {
        config.table.limit_rows = args.limit_rows;
    }
    if args.save_root.is_some() {
        config.storage.save_root = args.save_root.clone();
    }
    Ok(config.validated()?)
}

/// Execute the run command.
pub async fn execute(args: RunArgs, config: Config) -> anyhow::Result<()> {
    let config = apply_overrides(config, &args)?;
    let scout = ImgScout::new(config)?;
    let orchestrator = scout.orchestrator(args.dry_run)?;

    let mut table = Table::load(&args.input)?;
    let total = scout
        .config()
        .table
        .limit_rows
        .map_or(table.len(), |n| n.min(table.len()));
    tracing::info!("Processing {total} rows from {:?}", args.input);

    let mut report = match &args.report {
        Some(path) => Some(ReportWriter::create(path, args.report_format.into())?),
        None => None,
    };
    let mut report_error = None;

    let progress = create_progress_bar(total as u64);
    let stats = orchestrator
        .run(&mut table, |row| {
            progress.inc(1);
            progress.set_message(row_message(row));
            if let Some(writer) = report.as_mut() {
                if let Err(e) = writer.row(row) {
                    report_error.get_or_insert(e);
                }
            }
        })
        .await?;
    progress.finish_and_clear();

    if let Some(e) = report_error {
        tracing::warn!("Report incomplete: {e}");
    }
    if let (Some(writer), Some(path)) = (report, &args.report) {
        writer.finish(&stats)?;
        tracing::info!("Report written to {:?}", path);
    }

    let output = args.output.as_ref().unwrap_or(&args.input);
    if args.dry_run {
        tracing::info!("Dry run: table not written");
    } else {
        table.save(output)?;
        tracing::info!("Saved table to {:?}", output);
    }

    print_summary(&stats, scout.config().save_root());
    Ok(())
}

fn row_message(row: &RowReport) -> String {
    match &row.product {
        Some(product) if product.chars().count() > 32 => {
            let short: String = product.chars().take(31).collect();
            format!("{short}…")
        }
        Some(product) => product.clone(),
        None => "(blank)".to_string(),
    }
}

/// Create a progress bar for the row loop.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after the run.
fn print_summary(stats: &RunStats, save_root: Option<PathBuf>) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Rows:         {:>8}", stats.rows_total);
    eprintln!("    Processed:    {:>8}", stats.rows_processed);
    if stats.rows_skipped > 0 {
        eprintln!("    Skipped:      {:>8}", stats.rows_skipped);
    }
    eprintln!("    Uploaded:     {:>8}", stats.uploads_succeeded);
    if stats.uploads_failed > 0 {
        eprintln!("    Failed:       {:>8}", stats.uploads_failed);
    }
    eprintln!("  ------------------------------------");
    for (column, n) in &stats.updates {
        eprintln!("    {:<18}{:>8}", column, n);
    }
    eprintln!("    Duration:     {:>7.1}s", stats.total_seconds);
    if let Some(root) = save_root {
        eprintln!("    Local images: {}", root.display());
    }
    eprintln!("  ====================================");
}
