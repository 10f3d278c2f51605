//! Batch driver: search, fetch, upload and record for every table row.
//!
//! Rows are processed in order and providers in configured order, so the
//! output depends only on what the providers and hosts return. A failing
//! provider or upload never fails the row; only table errors abort a run.

use std::path::PathBuf;
use std::time::Instant;

use crate::config::{ColumnsConfig, Config};
use crate::error::TableError;
use crate::pipeline::{save_local, FetchImage};
use crate::search::ImageSearchProvider;
use crate::table::Table;
use crate::types::{
    slot_columns, ProviderOutcome, ProviderStatus, RowReport, RunStats, SearchQuery,
};
use crate::upload::{Pacing, PauseFn, UploadBackend};

/// Knobs for one batch run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub product_column: String,
    /// Source image column; never written
    pub image_column: String,
    pub columns: ColumnsConfig,
    pub max_images: usize,
    pub overwrite: bool,
    pub skip_if_blank: bool,
    pub limit_rows: Option<usize>,
    pub pause_min_ms: u64,
    pub pause_max_ms: u64,
    /// Keep a local copy of every downloaded image under this directory
    pub save_root: Option<PathBuf>,
    /// Query providers only; no downloads, uploads or writes
    pub dry_run: bool,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            product_column: config.table.product_column.clone(),
            image_column: config.table.image_column.clone(),
            columns: config.table.columns.clone(),
            max_images: config.search.max_images,
            overwrite: config.table.overwrite,
            skip_if_blank: config.table.skip_if_blank,
            limit_rows: config.table.limit_rows,
            pause_min_ms: config.upload.pause_min_ms,
            pause_max_ms: config.upload.pause_max_ms,
            save_root: config.save_root(),
            dry_run: false,
        }
    }
}

/// Drives providers, fetcher and upload host over a table.
pub struct Orchestrator {
    providers: Vec<Box<dyn ImageSearchProvider>>,
    fetcher: Box<dyn FetchImage>,
    uploader: Option<Box<dyn UploadBackend>>,
    options: RunOptions,
    pacing: Pacing,
}

impl Orchestrator {
    pub fn new(
        providers: Vec<Box<dyn ImageSearchProvider>>,
        fetcher: Box<dyn FetchImage>,
        uploader: Box<dyn UploadBackend>,
        options: RunOptions,
    ) -> Self {
        let pacing = Pacing::new(options.pause_min_ms, options.pause_max_ms);
        Self {
            providers,
            fetcher,
            uploader: Some(uploader),
            options,
            pacing,
        }
    }

    /// An orchestrator that only queries providers and reports what it found.
    pub fn dry_run(
        providers: Vec<Box<dyn ImageSearchProvider>>,
        fetcher: Box<dyn FetchImage>,
        mut options: RunOptions,
    ) -> Self {
        options.dry_run = true;
        Self {
            providers,
            fetcher,
            uploader: None,
            options,
            pacing: Pacing::disabled(),
        }
    }

    /// Replace the pause between uploads.
    pub fn with_pause(mut self, pause: PauseFn) -> Self {
        self.pacing = self.pacing.with_pause(pause);
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Process the table in place.
    ///
    /// `on_row` is called once per row in the processed range, in order.
    pub async fn run<F>(&self, table: &mut Table, mut on_row: F) -> Result<RunStats, TableError>
    where
        F: FnMut(&RowReport),
    {
        let start = Instant::now();
        let opts = &self.options;

        let product_col = table.require_column(&opts.product_column)?;
        table.protect(&opts.image_column);

        let mut provider_cols = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let prefix = opts.columns.prefix_for(provider.kind());
            let mut cols = Vec::new();
            for name in slot_columns(prefix, opts.max_images) {
                if name == opts.image_column {
                    return Err(TableError::ProtectedColumn(name));
                }
                cols.push(table.ensure_column(&name));
            }
            provider_cols.push(cols);
        }

        let total = opts
            .limit_rows
            .map_or(table.len(), |n| n.min(table.len()));
        let mut stats = RunStats {
            rows_total: total,
            ..RunStats::default()
        };

        tracing::info!(
            "Processing {total} rows with {} provider(s)",
            self.providers.len()
        );

        for row in 0..total {
            let report = self
                .process_row(table, row, product_col, &provider_cols, &mut stats)
                .await?;
            on_row(&report);
        }

        stats.total_seconds = start.elapsed().as_secs_f64();
        Ok(stats)
    }

    async fn process_row(
        &self,
        table: &mut Table,
        row: usize,
        product_col: usize,
        provider_cols: &[Vec<usize>],
        stats: &mut RunStats,
    ) -> Result<RowReport, TableError> {
        let product = table.get(row, product_col).trim().to_string();
        let mut report = RowReport {
            row,
            product: Some(product.clone()).filter(|p| !p.is_empty()),
            skipped_blank: false,
            outcomes: Vec::new(),
        };

        let query = SearchQuery::new(&product);
        if query.is_none() && self.options.skip_if_blank {
            tracing::info!("[row {}] skip: empty product name", row + 1);
            report.skipped_blank = true;
            stats.rows_skipped += 1;
            return Ok(report);
        }

        tracing::info!("[row {}] {:?}", row + 1, product);
        stats.rows_processed += 1;

        for (provider, cols) in self.providers.iter().zip(provider_cols) {
            let outcome = self
                .process_provider(table, row, query.as_ref(), provider.as_ref(), cols, stats)
                .await?;
            report.outcomes.push(outcome);
        }
        Ok(report)
    }

    async fn process_provider(
        &self,
        table: &mut Table,
        row: usize,
        query: Option<&SearchQuery>,
        provider: &dyn ImageSearchProvider,
        cols: &[usize],
        stats: &mut RunStats,
    ) -> Result<ProviderOutcome, TableError> {
        let opts = &self.options;
        let kind = provider.kind();

        if !opts.overwrite && cols.iter().any(|&c| !table.is_blank(row, c)) {
            tracing::info!("  [{kind}] skip: column already set");
            return Ok(ProviderOutcome::new(kind, ProviderStatus::Skipped));
        }

        let Some(query) = query else {
            return Ok(ProviderOutcome::new(kind, ProviderStatus::NoResults));
        };

        let urls = provider.image_urls(query, opts.max_images).await;
        if urls.is_empty() {
            tracing::info!("  [{kind}] no image URL from provider");
            return Ok(ProviderOutcome::new(kind, ProviderStatus::NoResults));
        }

        let mut outcome = ProviderOutcome::new(kind, ProviderStatus::Found);
        outcome.source_urls = urls.clone();

        let Some(uploader) = self.uploader.as_deref().filter(|_| !opts.dry_run) else {
            tracing::info!("  [{kind}] found {} URL(s) (dry run)", urls.len());
            return Ok(outcome);
        };

        for (i, url) in urls.iter().enumerate() {
            let Some(image) = self.fetcher.fetch_image(url).await else {
                outcome.errors.push(format!("download failed: {url}"));
                continue;
            };

            if let Some(root) = &opts.save_root {
                match save_local(
                    root,
                    &kind.to_string(),
                    query.as_str(),
                    i + 1,
                    url,
                    &image.bytes,
                    image.content_type.as_deref(),
                ) {
                    Ok(path) => tracing::info!("  [{kind}] saved -> {}", path.display()),
                    Err(e) => tracing::warn!("  [{kind}] local save failed: {e}"),
                }
            }

            let display_name = if opts.max_images > 1 {
                format!("{} ({kind}) {}", query.as_str(), i + 1)
            } else {
                format!("{} ({kind})", query.as_str())
            };

            match uploader.upload(image, &display_name).await {
                Ok(hosted) => {
                    tracing::info!("  [{kind}] uploaded -> {hosted}");
                    stats.uploads_succeeded += 1;
                    outcome.hosted_urls.push(hosted);
                }
                Err(e) => {
                    tracing::warn!("  [{kind}] upload failed: {e}");
                    stats.uploads_failed += 1;
                    outcome.errors.push(e.to_string());
                }
            }

            self.pacing.wait().await;
        }

        if outcome.hosted_urls.is_empty() {
            outcome.status = ProviderStatus::Failed;
            return Ok(outcome);
        }

        for (i, &col) in cols.iter().enumerate() {
            match outcome.hosted_urls.get(i) {
                Some(url) => table.set(row, col, url.as_str())?,
                None if opts.overwrite => table.set(row, col, "")?,
                None => {}
            }
        }

        let prefix = opts.columns.prefix_for(kind).to_string();
        *stats.updates.entry(prefix).or_insert(0) += 1;
        outcome.status = ProviderStatus::Uploaded;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PipelineError, PipelineResult};
    use crate::pipeline::validate::fixtures;
    use crate::types::{FetchedImage, HostKind, ImageResult, ProviderKind};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct StubProvider {
        kind: ProviderKind,
        urls: Vec<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ImageSearchProvider for StubProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn search(
            &self,
            _query: &SearchQuery,
            _limit: usize,
        ) -> PipelineResult<Vec<ImageResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .urls
                .iter()
                .map(|u| ImageResult {
                    provider: self.kind,
                    url: u.to_string(),
                    thumbnail_url: None,
                })
                .collect())
        }
    }

    struct StubFetcher {
        broken: Vec<&'static str>,
    }

    #[async_trait]
    impl FetchImage for StubFetcher {
        async fn fetch_image(&self, url: &str) -> Option<FetchedImage> {
            if self.broken.contains(&url) {
                return None;
            }
            Some(FetchedImage {
                url: url.to_string(),
                bytes: fixtures::jpeg(4, 4),
                content_type: Some("image/jpeg".to_string()),
                extension: ".jpg".to_string(),
            })
        }
    }

    struct StubUploader {
        responses: Mutex<VecDeque<Result<&'static str, &'static str>>>,
        names: Arc<Mutex<Vec<String>>>,
    }

    impl StubUploader {
        fn new(responses: Vec<Result<&'static str, &'static str>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                names: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl UploadBackend for StubUploader {
        fn name(&self) -> &str {
            "stub"
        }

        fn kind(&self) -> HostKind {
            HostKind::Imgbb
        }

        async fn upload(&self, _image: FetchedImage, display_name: &str) -> PipelineResult<String> {
            self.names.lock().unwrap().push(display_name.to_string());
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err("no response queued"));
            next.map(str::to_string).map_err(|msg| PipelineError::Upload {
                message: msg.to_string(),
                status_code: None,
            })
        }

        async fn upload_url(&self, source_url: &str) -> PipelineResult<String> {
            Ok(source_url.to_string())
        }
    }

    fn provider(
        kind: ProviderKind,
        urls: Vec<&'static str>,
    ) -> (Box<dyn ImageSearchProvider>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let p = StubProvider {
            kind,
            urls,
            calls: Arc::clone(&calls),
        };
        (Box::new(p), calls)
    }

    fn options() -> RunOptions {
        let mut opts = RunOptions::from_config(&Config::default());
        opts.pause_min_ms = 0;
        opts.pause_max_ms = 0;
        opts
    }

    fn no_pause() -> PauseFn {
        Box::new(|_| Box::pin(async {}))
    }

    fn table(rows: Vec<Vec<&str>>) -> Table {
        Table::new(
            vec!["Product Name".into(), "Image URL".into()],
            rows.into_iter()
                .map(|r| r.into_iter().map(str::to_string).collect())
                .collect(),
        )
    }

    fn orchestrator(
        providers: Vec<Box<dyn ImageSearchProvider>>,
        uploader: StubUploader,
        options: RunOptions,
    ) -> Orchestrator {
        Orchestrator::new(
            providers,
            Box::new(StubFetcher { broken: vec![] }),
            Box::new(uploader),
            options,
        )
        .with_pause(no_pause())
    }

    #[tokio::test]
    async fn test_end_to_end_single_row() {
        let (bing, _) = provider(ProviderKind::Bing, vec!["http://example/a.jpg"]);
        let orch = orchestrator(
            vec![bing],
            StubUploader::new(vec![Ok("http://hosted/a.jpg")]),
            options(),
        );

        let mut t = table(vec![vec!["Widget", ""]]);
        let stats = orch.run(&mut t, |_| {}).await.unwrap();

        let col = t.column_index("image_bing").unwrap();
        assert_eq!(t.get(0, col), "http://hosted/a.jpg");
        assert_eq!(stats.rows_processed, 1);
        assert_eq!(stats.uploads_succeeded, 1);
        assert_eq!(stats.updates.get("image_bing"), Some(&1));
    }

    #[tokio::test]
    async fn test_blank_product_left_untouched() {
        let (bing, calls) = provider(ProviderKind::Bing, vec!["http://example/a.jpg"]);
        let orch = orchestrator(
            vec![bing],
            StubUploader::new(vec![Ok("http://hosted/a.jpg")]),
            options(),
        );

        let mut t = table(vec![vec!["   ", "http://orig/x.jpg"]]);
        let mut reports = Vec::new();
        let stats = orch.run(&mut t, |r| reports.push(r.clone())).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(stats.rows_skipped, 1);
        assert!(reports[0].skipped_blank);
        let col = t.column_index("image_bing").unwrap();
        assert!(t.is_blank(0, col));
        assert_eq!(t.get(0, 0), "   ");
        assert_eq!(t.get(0, 1), "http://orig/x.jpg");
    }

    #[tokio::test]
    async fn test_existing_value_skipped_without_overwrite() {
        let (bing, calls) = provider(ProviderKind::Bing, vec!["http://example/a.jpg"]);
        let orch = orchestrator(
            vec![bing],
            StubUploader::new(vec![Ok("http://hosted/new.jpg")]),
            options(),
        );

        let mut t = table(vec![vec!["Widget", ""]]);
        let col = t.ensure_column("image_bing");
        t.set(0, col, "http://hosted/old.jpg").unwrap();

        let mut reports = Vec::new();
        orch.run(&mut t, |r| reports.push(r.clone())).await.unwrap();

        assert_eq!(t.get(0, col), "http://hosted/old.jpg");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(reports[0].outcomes[0].status, ProviderStatus::Skipped);
    }

    #[tokio::test]
    async fn test_existing_value_replaced_with_overwrite() {
        let (bing, _) = provider(ProviderKind::Bing, vec!["http://example/a.jpg"]);
        let mut opts = options();
        opts.overwrite = true;
        let orch = orchestrator(
            vec![bing],
            StubUploader::new(vec![Ok("http://hosted/new.jpg")]),
            opts,
        );

        let mut t = table(vec![vec!["Widget", ""]]);
        let col = t.ensure_column("image_bing");
        t.set(0, col, "http://hosted/old.jpg").unwrap();
        orch.run(&mut t, |_| {}).await.unwrap();

        assert_eq!(t.get(0, col), "http://hosted/new.jpg");
    }

    #[tokio::test]
    async fn test_multi_slot_fills_and_clears() {
        let (ov, _) = provider(
            ProviderKind::Openverse,
            vec!["http://ov/1.jpg", "http://ov/2.jpg"],
        );
        let mut opts = options();
        opts.max_images = 3;
        opts.overwrite = true;
        let orch = orchestrator(
            vec![ov],
            StubUploader::new(vec![Ok("http://hosted/1"), Ok("http://hosted/2")]),
            opts,
        );

        let mut t = table(vec![vec!["Chair", ""]]);
        let stale = t.ensure_column("image_openverse_3");
        t.set(0, stale, "http://hosted/stale").unwrap();
        orch.run(&mut t, |_| {}).await.unwrap();

        let c1 = t.column_index("image_openverse_1").unwrap();
        let c2 = t.column_index("image_openverse_2").unwrap();
        assert_eq!(t.get(0, c1), "http://hosted/1");
        assert_eq!(t.get(0, c2), "http://hosted/2");
        assert_eq!(t.get(0, stale), "");
    }

    #[tokio::test]
    async fn test_upload_failure_leaves_column_and_continues() {
        let (bing, _) = provider(ProviderKind::Bing, vec!["http://example/a.jpg"]);
        let (ddg, _) = provider(ProviderKind::DuckDuckGo, vec!["http://example/b.jpg"]);
        let orch = orchestrator(
            vec![bing, ddg],
            StubUploader::new(vec![Err("host down"), Ok("http://hosted/b.jpg")]),
            options(),
        );

        let mut t = table(vec![vec!["Widget", ""]]);
        let mut reports = Vec::new();
        let stats = orch.run(&mut t, |r| reports.push(r.clone())).await.unwrap();

        let bing_col = t.column_index("image_bing").unwrap();
        let ddg_col = t.column_index("image_duckduckgo").unwrap();
        assert!(t.is_blank(0, bing_col));
        assert_eq!(t.get(0, ddg_col), "http://hosted/b.jpg");
        assert_eq!(stats.uploads_failed, 1);
        assert_eq!(reports[0].outcomes[0].status, ProviderStatus::Failed);
        assert_eq!(reports[0].outcomes[1].status, ProviderStatus::Uploaded);
    }

    #[tokio::test]
    async fn test_no_results_and_broken_downloads() {
        let (bing, _) = provider(ProviderKind::Bing, vec![]);
        let (ov, _) = provider(ProviderKind::Openverse, vec!["http://broken/x.jpg"]);
        let orch = Orchestrator::new(
            vec![bing, ov],
            Box::new(StubFetcher {
                broken: vec!["http://broken/x.jpg"],
            }),
            Box::new(StubUploader::new(vec![])),
            options(),
        )
        .with_pause(no_pause());

        let mut t = table(vec![vec!["Widget", ""]]);
        let mut reports = Vec::new();
        orch.run(&mut t, |r| reports.push(r.clone())).await.unwrap();

        assert_eq!(reports[0].outcomes[0].status, ProviderStatus::NoResults);
        assert_eq!(reports[0].outcomes[1].status, ProviderStatus::Failed);
        assert_eq!(reports[0].outcomes[1].errors.len(), 1);
    }

    #[tokio::test]
    async fn test_limit_rows_respected() {
        let (bing, calls) = provider(ProviderKind::Bing, vec!["http://example/a.jpg"]);
        let mut opts = options();
        opts.limit_rows = Some(1);
        let orch = orchestrator(
            vec![bing],
            StubUploader::new(vec![Ok("http://hosted/1"), Ok("http://hosted/2")]),
            opts,
        );

        let mut t = table(vec![vec!["A", ""], vec!["B", ""]]);
        let stats = orch.run(&mut t, |_| {}).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(stats.rows_total, 1);
        let col = t.column_index("image_bing").unwrap();
        assert!(t.is_blank(1, col));
    }

    #[tokio::test]
    async fn test_missing_product_column_is_fatal() {
        let (bing, _) = provider(ProviderKind::Bing, vec![]);
        let orch = orchestrator(vec![bing], StubUploader::new(vec![]), options());
        let mut t = Table::new(vec!["SKU".into()], vec![vec!["1".into()]]);
        let err = orch.run(&mut t, |_| {}).await.unwrap_err();
        assert!(matches!(err, TableError::MissingColumn { .. }));
    }

    #[tokio::test]
    async fn test_prefix_on_image_column_is_rejected() {
        let (bing, calls) = provider(ProviderKind::Bing, vec!["http://example/a.jpg"]);
        let mut opts = options();
        opts.columns.bing = "Image URL".to_string();
        let orch = orchestrator(vec![bing], StubUploader::new(vec![]), opts);

        let mut t = table(vec![vec!["Widget", "http://orig/x.jpg"]]);
        let err = orch.run(&mut t, |_| {}).await.unwrap_err();
        assert!(matches!(err, TableError::ProtectedColumn(_)));
        assert_eq!(t.get(0, 1), "http://orig/x.jpg");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let (bing, calls) = provider(ProviderKind::Bing, vec!["http://example/a.jpg"]);
        let orch = Orchestrator::dry_run(
            vec![bing],
            Box::new(StubFetcher { broken: vec![] }),
            options(),
        );

        let mut t = table(vec![vec!["Widget", ""]]);
        let mut reports = Vec::new();
        let stats = orch.run(&mut t, |r| reports.push(r.clone())).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(reports[0].outcomes[0].status, ProviderStatus::Found);
        assert_eq!(reports[0].outcomes[0].source_urls, vec!["http://example/a.jpg"]);
        assert_eq!(stats.uploads_succeeded, 0);
        let col = t.column_index("image_bing").unwrap();
        assert!(t.is_blank(0, col));
    }

    #[tokio::test]
    async fn test_local_save_and_display_names() {
        let dir = tempfile::tempdir().unwrap();
        let (bing, _) = provider(ProviderKind::Bing, vec!["http://example/a.jpg"]);
        let mut opts = options();
        opts.save_root = Some(dir.path().to_path_buf());
        let uploader = StubUploader::new(vec![Ok("http://hosted/a.jpg")]);
        let names = Arc::clone(&uploader.names);
        let orch = orchestrator(vec![bing], uploader, opts);

        let mut t = table(vec![vec!["Red Widget", ""]]);
        orch.run(&mut t, |_| {}).await.unwrap();

        assert!(dir.path().join("bing").join("Red_Widget.jpg").exists());
        assert_eq!(names.lock().unwrap().as_slice(), ["Red Widget (bing)"]);
    }

    #[tokio::test]
    async fn test_pause_after_every_upload_attempt() {
        let (bing, _) = provider(
            ProviderKind::Bing,
            vec!["http://example/a.jpg", "http://example/b.jpg"],
        );
        let uploader = StubUploader::new(vec![Ok("http://hosted/a"), Err("rejected")]);
        let mut opts = options();
        opts.max_images = 2;

        let pauses = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pauses);
        let orch = Orchestrator::new(
            vec![bing],
            Box::new(StubFetcher { broken: vec![] }),
            Box::new(uploader),
            opts,
        )
        .with_pause(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {})
        }));

        let mut t = table(vec![vec!["Chair", ""]]);
        orch.run(&mut t, |_| {}).await.unwrap();
        assert_eq!(pauses.load(Ordering::SeqCst), 2);
    }
}
