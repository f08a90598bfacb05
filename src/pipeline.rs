//! Preview pipeline: rasterize, plan, redact, publish.
//!
//! A run moves through [`Stage`]s:
//!
//! ```text
//! Init -> Rasterized -> {Planned, Redacted}* -> PublishedPages
//!      -> ManifestBuilt -> ManifestPublished -> CleanedUp
//! ```
//!
//! and ends in [`Stage::Failed`] on any fatal error. Pages are processed in
//! batches of `upload_batch_size`; a page that cannot be decoded, encoded or
//! uploaded is recorded in [`PreviewOutcome::failed_pages`] and the run
//! continues. Rasterization failures, geometry errors and a manifest that
//! cannot be published abort the run. The scratch directory holding the page
//! images is removed on every exit path.
//!
//! # Example
//!
//! ```no_run
//! use pdfveil::pipeline::PreviewPipeline;
//! use pdfveil::publish::{MemoryStore, Publisher};
//! use pdfveil::raster::PdftoppmRasterizer;
//! use pdfveil::{Document, PreviewOptions};
//! use std::sync::Arc;
//!
//! # async fn run() -> pdfveil::Result<()> {
//! let options = PreviewOptions::new().with_unredacted_pages(1);
//! let mut pipeline = PreviewPipeline::new(
//!     Arc::new(PdftoppmRasterizer::new()),
//!     Publisher::new(Arc::new(MemoryStore::new())),
//!     options,
//! );
//!
//! let outcome = pipeline.run(&Document::from_path("report.pdf")).await?;
//! println!("manifest: {}", outcome.manifest_content_id());
//! for failure in &outcome.failed_pages {
//!     println!("page {} skipped: {}", failure.page, failure.error);
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use crate::index::{append_to_index, IndexEntry};
use crate::model::{encode_png, ContentId, Document, Manifest, Page, PageFailure, RedactionPlan};
use crate::options::PreviewOptions;
use crate::publish::{Payload, Publisher, UploadItem, UploadResult};
use crate::raster::{self, RasterFile, Rasterizer};
use crate::redact::{PatchPlanner, Redactor};
use crate::scratch::with_scratch_dir;
use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Name the manifest payload is published under.
pub const MANIFEST_NAME: &str = "ipfs_cids.json";

/// File name used when an in-memory document carries none.
const UNNAMED_SOURCE: &str = "document.pdf";

/// Progress of a preview run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing done yet
    Init,
    /// Page images written
    Rasterized,
    /// Patches planned for the current batch
    Planned,
    /// Current batch redacted
    Redacted,
    /// Every page uploaded or recorded as failed
    PublishedPages,
    /// Manifest payload assembled
    ManifestBuilt,
    /// Manifest uploaded
    ManifestPublished,
    /// Scratch directory removed after success
    CleanedUp,
    /// Run aborted
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::Rasterized => "rasterized",
            Stage::Planned => "planned",
            Stage::Redacted => "redacted",
            Stage::PublishedPages => "published pages",
            Stage::ManifestBuilt => "manifest built",
            Stage::ManifestPublished => "manifest published",
            Stage::CleanedUp => "cleaned up",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of a successful preview run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewOutcome {
    /// The published manifest
    pub manifest: Manifest,
    /// Pages left out of the manifest, in page order
    pub failed_pages: Vec<PageFailure>,
    /// Index file the manifest was recorded in; `None` when no index is
    /// configured or the write failed
    pub index_path: Option<PathBuf>,
}

impl PreviewOutcome {
    /// Content id of the published manifest.
    pub fn manifest_content_id(&self) -> &ContentId {
        &self.manifest.manifest_content_id
    }

    /// Whether every page made it into the manifest.
    pub fn is_complete(&self) -> bool {
        self.failed_pages.is_empty()
    }
}

/// A page ready for upload, or the reason it cannot be.
enum PreparedPage {
    Ready { index: u32, item: UploadItem },
    Failed(PageFailure),
}

/// Work planned for one page of a batch.
enum PageJob<'a> {
    /// Published as the rasterizer wrote it, never decoded
    Verbatim(&'a RasterFile),
    Redact { page: Page, plan: RedactionPlan },
    Skipped(PageFailure),
}

fn page_failure(index: u32, file: impl Into<String>, err: &Error) -> PageFailure {
    PageFailure {
        page: index,
        file: file.into(),
        error: err.to_string(),
    }
}

/// Redact and encode one page. Verbatim pages keep their raster bytes.
fn render_page(redactor: &Redactor, job: PageJob<'_>) -> Result<PreparedPage> {
    let (index, name, bytes) = match job {
        PageJob::Skipped(failure) => return Ok(PreparedPage::Failed(failure)),
        PageJob::Verbatim(file) => (file.index, file.file_name(), file.read()),
        PageJob::Redact { page, plan } => {
            let bytes = redactor
                .redact(&page, &plan)
                .and_then(|image| encode_png(&image));
            (page.index, page.file_name, bytes)
        }
    };

    match bytes {
        Ok(bytes) => Ok(PreparedPage::Ready {
            index,
            item: UploadItem::bytes(name, bytes),
        }),
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            log::warn!("Failed to prepare {}: {}", name, err);
            Ok(PreparedPage::Failed(page_failure(index, name, &err)))
        }
    }
}

/// Record a published manifest in the local index.
///
/// The manifest is already published at this point, so a failed write is
/// logged and reported as `None` rather than failing the run.
fn record_in_index(path: &Path, file: &str, manifest_content_id: &ContentId) -> Option<PathBuf> {
    let entry = IndexEntry::new(file, manifest_content_id.clone());
    match append_to_index(path, &entry) {
        Ok(count) => {
            log::debug!("Index {} now holds {} entries", path.display(), count);
            Some(path.to_path_buf())
        }
        Err(err) => {
            log::warn!(
                "Manifest {} not recorded in {}: {}",
                manifest_content_id,
                path.display(),
                err
            );
            None
        }
    }
}

/// Runs the preview flow for documents.
pub struct PreviewPipeline<R = StdRng> {
    rasterizer: Arc<dyn Rasterizer>,
    publisher: Publisher,
    options: PreviewOptions,
    planner: PatchPlanner<R>,
    redactor: Redactor,
    stage: Stage,
}

impl PreviewPipeline<StdRng> {
    /// Create a pipeline with an entropy-seeded patch planner.
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        publisher: Publisher,
        options: PreviewOptions,
    ) -> Self {
        let planner = PatchPlanner::new(&options);
        Self::with_planner(rasterizer, publisher, options, planner)
    }

    /// Create a pipeline whose patch placement is fixed by `seed`.
    pub fn seeded(
        rasterizer: Arc<dyn Rasterizer>,
        publisher: Publisher,
        options: PreviewOptions,
        seed: u64,
    ) -> Self {
        let planner = PatchPlanner::seeded(&options, seed);
        Self::with_planner(rasterizer, publisher, options, planner)
    }
}

impl<R: Rng> PreviewPipeline<R> {
    /// Create a pipeline with an explicit patch planner.
    pub fn with_planner(
        rasterizer: Arc<dyn Rasterizer>,
        publisher: Publisher,
        options: PreviewOptions,
        planner: PatchPlanner<R>,
    ) -> Self {
        let redactor = Redactor::new(options.blur_strength);
        Self {
            rasterizer,
            publisher,
            options,
            planner,
            redactor,
            stage: Stage::Init,
        }
    }

    /// Options in use.
    pub fn options(&self) -> &PreviewOptions {
        &self.options
    }

    /// Stage reached by the most recent run.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn enter(&mut self, stage: Stage) {
        log::debug!("Preview stage: {}", stage);
        self.stage = stage;
    }

    /// Produce and publish a redacted preview of `document`.
    pub async fn run(&mut self, document: &Document) -> Result<PreviewOutcome> {
        self.stage = Stage::Init;
        let started = Instant::now();

        let result = self.run_checked(document).await;
        match &result {
            Ok(outcome) => {
                self.enter(Stage::CleanedUp);
                log::info!(
                    "Preview of {} finished in {}ms: {} pages published, {} failed",
                    outcome.manifest.source_filename,
                    started.elapsed().as_millis(),
                    outcome.manifest.page_count(),
                    outcome.failed_pages.len()
                );
            }
            Err(err) => {
                log::error!("Preview failed after stage '{}': {}", self.stage, err);
                self.stage = Stage::Failed;
            }
        }
        result
    }

    async fn run_checked(&mut self, document: &Document) -> Result<PreviewOutcome> {
        self.options.validate()?;
        if !document.is_resolvable() {
            let path = document
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            return Err(Error::Conversion(format!(
                "Input PDF file does not exist: {}",
                path
            )));
        }

        let parent = self.options.temp_dir.clone();
        with_scratch_dir(parent.as_deref(), move |dir| async move {
            self.run_in(&dir, document).await
        })
        .await
    }

    async fn run_in(&mut self, scratch: &Path, document: &Document) -> Result<PreviewOutcome> {
        let source_filename = document
            .filename()
            .unwrap_or_else(|| UNNAMED_SOURCE.to_string());
        let source_path = match document.path() {
            Some(path) => path.to_path_buf(),
            None => {
                let path = scratch.join("source.pdf");
                std::fs::write(&path, document.read()?)?;
                path
            }
        };

        let pages_dir = scratch.join("pages");
        std::fs::create_dir_all(&pages_dir)?;

        let started = Instant::now();
        let pages = raster::rasterize(
            self.rasterizer.as_ref(),
            &source_path,
            self.options.dpi,
            &pages_dir,
        )?
        .require_pages()?;
        log::info!(
            "Converted {} to {} pages with {} in {}ms",
            source_filename,
            pages.len(),
            self.rasterizer.name(),
            started.elapsed().as_millis()
        );
        self.enter(Stage::Rasterized);

        let started = Instant::now();
        let batch_size = self.options.upload_batch_size;
        let retries = self.options.upload_retries;
        let mut content_ids = Vec::with_capacity(pages.len());
        let mut failed_pages = Vec::new();

        for batch in pages.files().chunks(batch_size) {
            let mut indices = Vec::with_capacity(batch.len());
            let mut items = Vec::with_capacity(batch.len());
            for page in self.prepare_batch(batch)? {
                match page {
                    PreparedPage::Ready { index, item } => {
                        indices.push(index);
                        items.push(item);
                    }
                    PreparedPage::Failed(failure) => failed_pages.push(failure),
                }
            }

            let results = self.publisher.publish_all(&items, batch_size, retries).await;
            for (index, result) in indices.into_iter().zip(results) {
                match result {
                    UploadResult::Published { content_id } => content_ids.push(content_id),
                    UploadResult::Failed { source_ref, error } => {
                        log::warn!("Page {} ({}) left out of preview: {}", index, source_ref, error);
                        failed_pages.push(PageFailure {
                            page: index,
                            file: source_ref,
                            error,
                        });
                    }
                }
            }
        }
        failed_pages.sort_by_key(|failure| failure.page);
        self.enter(Stage::PublishedPages);
        log::info!(
            "Processing and upload of {} pages took {}ms",
            pages.len(),
            started.elapsed().as_millis()
        );

        let payload = Payload::json(Manifest::payload(&content_ids));
        self.enter(Stage::ManifestBuilt);

        let started = Instant::now();
        let manifest_content_id = self
            .publisher
            .publish(&payload, MANIFEST_NAME, retries)
            .await
            .map_err(|e| Error::ManifestPublish(Box::new(e)))?;
        log::info!(
            "Manifest uploaded as {} in {}ms",
            manifest_content_id,
            started.elapsed().as_millis()
        );
        self.enter(Stage::ManifestPublished);

        let index_path = self
            .options
            .index_path
            .as_deref()
            .and_then(|path| record_in_index(path, &source_filename, &manifest_content_id));

        Ok(PreviewOutcome {
            manifest: Manifest {
                source_filename,
                content_ids,
                manifest_content_id,
            },
            failed_pages,
            index_path,
        })
    }

    /// Decode, plan and redact one batch of pages.
    ///
    /// Planning draws from the shared random source in page order, so a
    /// seeded run is reproducible; decoding and redaction run in parallel.
    /// Pages below `unredactedPageCount` are never decoded.
    fn prepare_batch(&mut self, batch: &[RasterFile]) -> Result<Vec<PreparedPage>> {
        let options = &self.options;
        let loaded: Vec<Option<Result<Page>>> = batch
            .par_iter()
            .map(|file| (!options.is_unredacted(file.index)).then(|| file.load()))
            .collect();

        let mut jobs = Vec::with_capacity(batch.len());
        for (file, page) in batch.iter().zip(loaded) {
            match page {
                None => {
                    log::debug!("Page {} published without redaction", file.index);
                    jobs.push(PageJob::Verbatim(file));
                }
                Some(Ok(page)) => {
                    let plan = self.planner.plan(page.width(), page.height())?;
                    log::debug!("Planned {} patches for page {}", plan.len(), page.index);
                    jobs.push(PageJob::Redact { page, plan });
                }
                Some(Err(err)) => {
                    log::warn!("Failed to load {}: {}", file.file_name(), err);
                    jobs.push(PageJob::Skipped(page_failure(file.index, file.file_name(), &err)));
                }
            }
        }
        self.enter(Stage::Planned);

        let redactor = self.redactor;
        let prepared = jobs
            .into_par_iter()
            .map(|job| render_page(&redactor, job))
            .collect::<Result<Vec<_>>>()?;
        self.enter(Stage::Redacted);

        Ok(prepared)
    }
}

impl<R> fmt::Debug for PreviewPipeline<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewPipeline")
            .field("rasterizer", &self.rasterizer.name())
            .field("options", &self.options)
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}
