//! Candidate collection, selection and export for interactive curation.
//!
//! The terminal flow lives in the binary; this module holds the parts that
//! don't need a human: gathering verified candidates per row, tracking what
//! was picked, and writing picks back into the table.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::config::TableConfig;
use crate::error::TableError;
use crate::pipeline::{save_local, FetchImage};
use crate::search::ImageSearchProvider;
use crate::table::Table;
use crate::types::{ProviderKind, SearchQuery};
use crate::upload::{upload_with_deadline, Pacing, UploadBackend};

/// A verified image offered to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub provider: ProviderKind,
    pub url: String,
    /// Preview copy on disk, when a save root was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
}

/// Query every provider, dedupe across providers in order, and keep only
/// URLs that download and verify.
pub async fn collect_candidates(
    providers: &[Box<dyn ImageSearchProvider>],
    fetcher: &dyn FetchImage,
    query: &SearchQuery,
    limit: usize,
    save_root: Option<&Path>,
) -> Vec<Candidate> {
    let mut pairs = Vec::new();
    for provider in providers {
        let urls = provider.image_urls(query, limit).await;
        tracing::info!("{} returned {} URLs for {:?}", provider.name(), urls.len(), query.as_str());
        pairs.extend(urls.into_iter().map(|u| (provider.kind(), u)));
    }

    let total = pairs.len();
    let mut seen = HashSet::new();
    pairs.retain(|(_, url)| seen.insert(url.clone()));
    tracing::debug!("{} unique URLs from {total}", pairs.len());

    let mut per_provider: HashMap<ProviderKind, usize> = HashMap::new();
    let mut candidates = Vec::new();
    for (provider, url) in pairs {
        let Some(image) = fetcher.fetch_image(&url).await else {
            tracing::debug!("Dropping candidate {url}");
            continue;
        };

        let local_path = save_root.and_then(|root| {
            let index = per_provider.entry(provider).or_insert(0);
            *index += 1;
            save_local(
                root,
                &provider.to_string(),
                query.as_str(),
                *index,
                &url,
                &image.bytes,
                image.content_type.as_deref(),
            )
            .map_err(|e| tracing::warn!("Preview save failed for {url}: {e}"))
            .ok()
        });

        candidates.push(Candidate {
            provider,
            url,
            local_path,
        });
    }

    tracing::info!("Valid images kept for {:?}: {}", query.as_str(), candidates.len());
    candidates
}

/// Picked URLs, per row and per provider, in pick order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    rows: BTreeMap<usize, BTreeMap<ProviderKind, Vec<String>>>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a pick. Returns true when the URL is now selected.
    pub fn toggle(&mut self, row: usize, provider: ProviderKind, url: &str) -> bool {
        let picks = self.rows.entry(row).or_default();
        let list = picks.entry(provider).or_default();

        let selected = match list.iter().position(|u| u == url) {
            Some(pos) => {
                list.remove(pos);
                false
            }
            None => {
                list.push(url.to_string());
                true
            }
        };

        if list.is_empty() {
            picks.remove(&provider);
        }
        if picks.is_empty() {
            self.rows.remove(&row);
        }
        selected
    }

    pub fn is_selected(&self, row: usize, provider: ProviderKind, url: &str) -> bool {
        self.rows
            .get(&row)
            .and_then(|p| p.get(&provider))
            .is_some_and(|list| list.iter().any(|u| u == url))
    }

    /// Select the first `n` candidates of every row, keeping existing picks.
    ///
    /// Returns how many new picks were made.
    pub fn auto_select(&mut self, candidates: &BTreeMap<usize, Vec<Candidate>>, n: usize) -> usize {
        let mut added = 0;
        for (&row, items) in candidates {
            for item in items.iter().take(n) {
                if !self.is_selected(row, item.provider, &item.url) {
                    self.toggle(row, item.provider, &item.url);
                    added += 1;
                }
            }
        }
        added
    }

    /// Drop every pick.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total picks across rows and providers.
    pub fn count(&self) -> usize {
        self.rows
            .values()
            .flat_map(|p| p.values())
            .map(Vec::len)
            .sum()
    }

    /// Picks for one row, ordered by provider.
    pub fn row(&self, row: usize) -> Option<&BTreeMap<ProviderKind, Vec<String>>> {
        self.rows.get(&row)
    }

    /// Rows with at least one pick, ascending.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &BTreeMap<ProviderKind, Vec<String>>)> {
        self.rows.iter().map(|(&row, picks)| (row, picks))
    }
}

/// Product name for display, or `Product_<n>` when the cell is blank.
pub fn product_label(table: &Table, row: usize, product_col: usize) -> String {
    let name = table.get(row, product_col).trim();
    if name.is_empty() {
        format!("Product_{}", row + 1)
    } else {
        name.to_string()
    }
}

/// Counts from an export pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportSummary {
    pub rows_updated: usize,
    pub urls_written: usize,
    /// Picks replaced by a hosted URL
    pub uploaded: usize,
    /// Picks kept as their source URL after a failed or timed-out upload
    pub fell_back: usize,
}

/// Upload settings for [`export_with_upload`].
pub struct ExportUpload<'a> {
    pub backend: &'a dyn UploadBackend,
    pub fetcher: &'a dyn FetchImage,
    pub deadline: Duration,
    /// Pause after each upload attempt
    pub pacing: &'a Pacing,
}

/// Write picks into `<prefix>_1..<prefix>_N`, recording source URLs.
///
/// Every provider gets its numbered columns. Rows without picks are left
/// alone; for rows with picks, each picked provider's slots are filled in
/// order and the remainder blanked. The source image column is never
/// written.
pub fn export(
    table: &mut Table,
    selection: &Selection,
    layout: &TableConfig,
    max_images: usize,
) -> Result<ExportSummary, TableError> {
    let columns = ensure_export_columns(table, layout, max_images)?;
    let mut summary = ExportSummary::default();

    for (row, picks) in selection.rows() {
        for (provider, urls) in picks {
            let chosen: Vec<String> = urls.iter().take(max_images).cloned().collect();
            summary.urls_written += chosen.len();
            write_slots(table, row, &columns[provider], &chosen)?;
        }
        summary.rows_updated += 1;
    }
    Ok(summary)
}

/// Like [`export`], but uploads each pick first and records the hosted URL.
///
/// Each upload waits at most `upload.deadline`. A pick whose download,
/// upload or deadline fails is recorded as its source URL.
pub async fn export_with_upload(
    table: &mut Table,
    selection: &Selection,
    layout: &TableConfig,
    max_images: usize,
    upload: &ExportUpload<'_>,
) -> Result<ExportSummary, TableError> {
    let product_col = table.require_column(&layout.product_column)?;
    let columns = ensure_export_columns(table, layout, max_images)?;
    let mut summary = ExportSummary::default();

    for (row, picks) in selection.rows() {
        let product = product_label(table, row, product_col);

        for (provider, urls) in picks {
            let mut values = Vec::new();
            for (i, source) in urls.iter().take(max_images).enumerate() {
                let hosted = match upload.fetcher.fetch_image(source).await {
                    Some(image) => {
                        let name = format!("{product} ({provider}) {}", i + 1);
                        let outcome =
                            upload_with_deadline(upload.backend, image, &name, upload.deadline)
                                .await;
                        upload.pacing.wait().await;
                        outcome.hosted_or(source)
                    }
                    None => source.clone(),
                };

                if &hosted == source {
                    summary.fell_back += 1;
                } else {
                    summary.uploaded += 1;
                }
                values.push(hosted);
            }

            summary.urls_written += values.len();
            write_slots(table, row, &columns[provider], &values)?;
        }
        summary.rows_updated += 1;
    }
    Ok(summary)
}

fn ensure_export_columns(
    table: &mut Table,
    layout: &TableConfig,
    max_images: usize,
) -> Result<HashMap<ProviderKind, Vec<usize>>, TableError> {
    table.protect(&layout.image_column);

    let slots = max_images.max(1);
    let mut columns = HashMap::new();
    for kind in ProviderKind::ALL {
        let prefix = layout.columns.prefix_for(kind);
        let mut cols = Vec::with_capacity(slots);
        for n in 1..=slots {
            let name = format!("{prefix}_{n}");
            if name == layout.image_column {
                return Err(TableError::ProtectedColumn(name));
            }
            cols.push(table.ensure_column(&name));
        }
        columns.insert(kind, cols);
    }
    Ok(columns)
}

fn write_slots(
    table: &mut Table,
    row: usize,
    columns: &[usize],
    values: &[String],
) -> Result<(), TableError> {
    for (i, &col) in columns.iter().enumerate() {
        let value = values.get(i).map(String::as_str).unwrap_or("");
        table.set(row, col, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PipelineError, PipelineResult};
    use crate::pipeline::validate::fixtures;
    use crate::types::{FetchedImage, HostKind, ImageResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedProvider {
        kind: ProviderKind,
        urls: Vec<&'static str>,
    }

    #[async_trait]
    impl ImageSearchProvider for FixedProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn search(
            &self,
            _query: &SearchQuery,
            _limit: usize,
        ) -> PipelineResult<Vec<ImageResult>> {
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

    struct FakeFetcher;

    #[async_trait]
    impl FetchImage for FakeFetcher {
        async fn fetch_image(&self, url: &str) -> Option<FetchedImage> {
            if url.contains("broken") {
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

    struct EchoBackend {
        fail_on: &'static str,
        delay: Duration,
    }

    #[async_trait]
    impl UploadBackend for EchoBackend {
        fn name(&self) -> &str {
            "echo"
        }

        fn kind(&self) -> HostKind {
            HostKind::Catbox
        }

        async fn upload(&self, _image: FetchedImage, display_name: &str) -> PipelineResult<String> {
            tokio::time::sleep(self.delay).await;
            if display_name.contains(self.fail_on) {
                return Err(PipelineError::Upload {
                    message: "rejected".to_string(),
                    status_code: Some(400),
                });
            }
            Ok(format!("http://hosted/{}", display_name.len()))
        }

        async fn upload_url(&self, source_url: &str) -> PipelineResult<String> {
            Ok(source_url.to_string())
        }
    }

    fn query(s: &str) -> SearchQuery {
        SearchQuery::new(s).unwrap()
    }

    fn table() -> Table {
        Table::new(
            vec!["Product Name".into()],
            vec![vec!["Chair".into()], vec!["".into()], vec!["Lamp".into()]],
        )
    }

    #[tokio::test]
    async fn test_collect_dedupes_across_providers_in_order() {
        let providers: Vec<Box<dyn ImageSearchProvider>> = vec![
            Box::new(FixedProvider {
                kind: ProviderKind::Bing,
                urls: vec!["http://a/1.jpg", "http://a/2.jpg"],
            }),
            Box::new(FixedProvider {
                kind: ProviderKind::Openverse,
                urls: vec!["http://a/2.jpg", "http://b/broken.jpg", "http://b/3.jpg"],
            }),
        ];

        let candidates =
            collect_candidates(&providers, &FakeFetcher, &query("Chair"), 5, None).await;

        let got: Vec<_> = candidates
            .iter()
            .map(|c| (c.provider, c.url.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                (ProviderKind::Bing, "http://a/1.jpg"),
                (ProviderKind::Bing, "http://a/2.jpg"),
                (ProviderKind::Openverse, "http://b/3.jpg"),
            ]
        );
        assert!(candidates.iter().all(|c| c.local_path.is_none()));
    }

    #[tokio::test]
    async fn test_collect_saves_previews() {
        let dir = tempfile::tempdir().unwrap();
        let providers: Vec<Box<dyn ImageSearchProvider>> = vec![Box::new(FixedProvider {
            kind: ProviderKind::Bing,
            urls: vec!["http://a/1.jpg", "http://a/2.jpg"],
        })];

        let candidates = collect_candidates(
            &providers,
            &FakeFetcher,
            &query("Oak Chair"),
            5,
            Some(dir.path()),
        )
        .await;

        assert_eq!(
            candidates[0].local_path.as_deref(),
            Some(dir.path().join("bing").join("Oak_Chair.jpg").as_path())
        );
        assert_eq!(
            candidates[1].local_path.as_deref(),
            Some(dir.path().join("bing").join("Oak_Chair_2.jpg").as_path())
        );
    }

    #[test]
    fn test_toggle_and_clear() {
        let mut sel = Selection::new();
        assert!(sel.toggle(0, ProviderKind::Bing, "u1"));
        assert!(sel.toggle(0, ProviderKind::Bing, "u2"));
        assert!(sel.is_selected(0, ProviderKind::Bing, "u1"));
        assert_eq!(sel.count(), 2);

        assert!(!sel.toggle(0, ProviderKind::Bing, "u1"));
        assert_eq!(sel.row(0).unwrap()[&ProviderKind::Bing], vec!["u2"]);

        sel.toggle(0, ProviderKind::Bing, "u2");
        assert!(sel.row(0).is_none());

        sel.toggle(3, ProviderKind::Google, "g");
        sel.clear();
        assert!(sel.is_empty());
    }

    #[test]
    fn test_auto_select_takes_first_n_per_row() {
        let cand = |provider, url: &str| Candidate {
            provider,
            url: url.to_string(),
            local_path: None,
        };
        let mut candidates = BTreeMap::new();
        candidates.insert(
            0,
            vec![
                cand(ProviderKind::Bing, "b1"),
                cand(ProviderKind::Openverse, "o1"),
                cand(ProviderKind::Openverse, "o2"),
            ],
        );
        candidates.insert(2, vec![cand(ProviderKind::DuckDuckGo, "d1")]);

        let mut sel = Selection::new();
        sel.toggle(0, ProviderKind::Bing, "b1");
        let added = sel.auto_select(&candidates, 2);

        assert_eq!(added, 2);
        assert!(sel.is_selected(0, ProviderKind::Openverse, "o1"));
        assert!(!sel.is_selected(0, ProviderKind::Openverse, "o2"));
        assert!(sel.is_selected(2, ProviderKind::DuckDuckGo, "d1"));
    }

    #[test]
    fn test_export_writes_slots_and_blanks_rest() {
        let mut t = table();
        let mut sel = Selection::new();
        sel.toggle(0, ProviderKind::Bing, "http://a/1.jpg");
        sel.toggle(0, ProviderKind::Bing, "http://a/2.jpg");
        sel.toggle(0, ProviderKind::Bing, "http://a/3.jpg");

        let b3 = t.ensure_column("image_bing_3");
        t.set(0, b3, "stale").unwrap();

        let summary = export(&mut t, &sel, &TableConfig::default(), 2).unwrap();

        let b1 = t.column_index("image_bing_1").unwrap();
        let b2 = t.column_index("image_bing_2").unwrap();
        assert_eq!(t.get(0, b1), "http://a/1.jpg");
        assert_eq!(t.get(0, b2), "http://a/2.jpg");
        assert_eq!(t.get(0, b3), "stale");
        assert!(t.column_index("image_google_2").is_some());
        assert_eq!(summary.rows_updated, 1);
        assert_eq!(summary.urls_written, 2);
    }

    #[test]
    fn test_export_leaves_unselected_rows() {
        let mut t = table();
        let o1 = t.ensure_column("image_openverse_1");
        t.set(2, o1, "keep").unwrap();

        let mut sel = Selection::new();
        sel.toggle(0, ProviderKind::Openverse, "http://o/1.jpg");
        export(&mut t, &sel, &TableConfig::default(), 1).unwrap();

        assert_eq!(t.get(0, o1), "http://o/1.jpg");
        assert_eq!(t.get(2, o1), "keep");
    }

    #[tokio::test]
    async fn test_export_with_upload_falls_back_to_source() {
        let mut t = table();
        let mut sel = Selection::new();
        sel.toggle(0, ProviderKind::Bing, "http://a/1.jpg");
        sel.toggle(1, ProviderKind::Bing, "http://a/broken.jpg");
        sel.toggle(2, ProviderKind::Bing, "http://a/lamp.jpg");

        let backend = EchoBackend {
            fail_on: "Lamp",
            delay: Duration::ZERO,
        };
        let upload = ExportUpload {
            backend: &backend,
            fetcher: &FakeFetcher,
            deadline: Duration::from_secs(1),
            pacing: &Pacing::disabled(),
        };

        let summary = export_with_upload(&mut t, &sel, &TableConfig::default(), 1, &upload)
            .await
            .unwrap();

        let col = t.column_index("image_bing_1").unwrap();
        assert!(t.get(0, col).starts_with("http://hosted/"));
        assert_eq!(t.get(1, col), "http://a/broken.jpg");
        assert_eq!(t.get(2, col), "http://a/lamp.jpg");
        assert_eq!(summary.uploaded, 1);
        assert_eq!(summary.fell_back, 2);
    }

    #[tokio::test]
    async fn test_export_with_upload_deadline() {
        let mut t = table();
        let mut sel = Selection::new();
        sel.toggle(0, ProviderKind::Google, "http://g/1.jpg");

        let backend = EchoBackend {
            fail_on: "never-matches",
            delay: Duration::from_secs(5),
        };
        let upload = ExportUpload {
            backend: &backend,
            fetcher: &FakeFetcher,
            deadline: Duration::from_millis(20),
            pacing: &Pacing::disabled(),
        };

        export_with_upload(&mut t, &sel, &TableConfig::default(), 1, &upload)
            .await
            .unwrap();
        let col = t.column_index("image_google_1").unwrap();
        assert_eq!(t.get(0, col), "http://g/1.jpg");
    }

    #[tokio::test]
    async fn test_export_with_upload_pauses_after_each_attempt() {
        let mut t = table();
        let mut sel = Selection::new();
        sel.toggle(0, ProviderKind::Bing, "http://a/1.jpg");
        sel.toggle(0, ProviderKind::Bing, "http://a/2.jpg");
        sel.toggle(1, ProviderKind::Bing, "http://a/broken.jpg");
        sel.toggle(2, ProviderKind::Openverse, "http://o/lamp.jpg");

        let backend = EchoBackend {
            fail_on: "Lamp",
            delay: Duration::ZERO,
        };
        let pauses = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pauses);
        let pacing = Pacing::new(600, 1200).with_pause(Box::new(move |d| {
            assert!(d >= Duration::from_millis(600));
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {})
        }));
        let upload = ExportUpload {
            backend: &backend,
            fetcher: &FakeFetcher,
            deadline: Duration::from_secs(1),
            pacing: &pacing,
        };

        export_with_upload(&mut t, &sel, &TableConfig::default(), 2, &upload)
            .await
            .unwrap();

        // Three uploads attempted (one rejected); the broken download never reaches the host.
        assert_eq!(pauses.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_export_never_writes_image_column() {
        let mut t = table();
        let mut sel = Selection::new();
        sel.toggle(0, ProviderKind::Openverse, "http://o/1.jpg");

        let layout = TableConfig {
            image_column: "image_bing_1".to_string(),
            ..TableConfig::default()
        };
        let err = export(&mut t, &sel, &layout, 1).unwrap_err();
        assert!(matches!(err, TableError::ProtectedColumn(ref c) if c == "image_bing_1"));
        assert!(t.column_index("image_openverse_1").is_none());

        let source = t.ensure_column("Image URL");
        export(&mut t, &sel, &TableConfig::default(), 1).unwrap();
        assert!(matches!(
            t.set(0, source, "x"),
            Err(TableError::ProtectedColumn(_))
        ));
    }

    #[test]
    fn test_product_label_fallback() {
        let t = table();
        assert_eq!(product_label(&t, 0, 0), "Chair");
        assert_eq!(product_label(&t, 1, 0), "Product_2");
    }
}
