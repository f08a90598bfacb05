//! # pdfveil
//!
//! Redacted previews and encrypted copies of PDF documents, published to a
//! content-addressed store.
//!
//! A preview run rasterizes a document, blurs randomly placed horizontal
//! bands on each page, uploads the pages and publishes a manifest listing
//! their content ids. The encryption flow seals the whole document with
//! AES-256-GCM and publishes the ciphertext, handing the key back to the
//! caller.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfveil::publish::MemoryStore;
//! use pdfveil::{Document, Pdfveil, PreviewOptions};
//! use std::sync::Arc;
//!
//! # async fn run() -> pdfveil::Result<()> {
//! let veil = Pdfveil::new(Arc::new(MemoryStore::new()))
//!     .with_options(PreviewOptions::new().with_unredacted_pages(2));
//!
//! let outcome = veil.preview(&Document::from_path("thesis.pdf")).await?;
//! println!("preview manifest: {}", outcome.manifest_content_id());
//!
//! let artifact = veil.encrypt(&Document::from_path("thesis.pdf")).await?;
//! println!("ciphertext: {} (key {})", artifact.content_id, artifact.key_hex());
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Bounded uploads**: pages go out in fixed-size windows with retries and
//!   exponential backoff
//! - **Partial previews**: a page that cannot be uploaded is reported, not fatal
//! - **Reproducible redaction**: patch placement takes an injectable RNG
//! - **Scoped scratch space**: page images never outlive the run
//! - **Parallel redaction**: pages in a batch are blurred with Rayon

pub mod cipher;
pub mod detect;
pub mod error;
pub mod index;
pub mod model;
pub mod options;
pub mod pipeline;
pub mod publish;
pub mod raster;
pub mod redact;
pub mod scratch;

// Re-export commonly used types
pub use cipher::{encrypt_and_publish, open_payload, seal};
pub use detect::{is_pdf_bytes, read_header, read_header_from_path, PdfHeader};
pub use error::{Error, Result};
pub use model::{
    ContentId, Document, EncryptionArtifact, Manifest, Page, PageFailure, Patch, RedactionPlan,
};
pub use options::PreviewOptions;
pub use pipeline::{PreviewOutcome, PreviewPipeline, Stage};
pub use publish::{ContentStore, MemoryStore, Publisher};
pub use raster::{PdftoppmRasterizer, Rasterizer};
pub use redact::{PatchPlanner, Redactor};

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Build and publish a redacted preview of a PDF file using `pdftoppm`.
///
/// # Example
///
/// ```no_run
/// use pdfveil::{make_preview, MemoryStore, PreviewOptions};
/// use std::sync::Arc;
///
/// # async fn run() -> pdfveil::Result<()> {
/// let outcome = make_preview(
///     "document.pdf",
///     Arc::new(MemoryStore::new()),
///     PreviewOptions::default(),
/// )
/// .await?;
/// println!("{} pages published", outcome.manifest.page_count());
/// # Ok(())
/// # }
/// ```
pub async fn make_preview<P: AsRef<Path>>(
    path: P,
    store: Arc<dyn ContentStore>,
    options: PreviewOptions,
) -> Result<PreviewOutcome> {
    Pdfveil::new(store)
        .with_options(options)
        .preview(&Document::from_path(path.as_ref()))
        .await
}

/// Summary of a full upload: the encrypted original plus its preview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    /// Content id of the encrypted document
    pub encrypted_cid: ContentId,
    /// Hex-encoded AES-256 key
    pub key: String,
    /// Hex-encoded GCM nonce
    pub iv: String,
    /// Content id of the preview manifest
    pub preview_cid: ContentId,
    /// Pages missing from the preview
    pub failed_pages: Vec<PageFailure>,
}

impl UploadReport {
    fn new(artifact: &EncryptionArtifact, preview: PreviewOutcome) -> Self {
        Self {
            encrypted_cid: artifact.content_id.clone(),
            key: artifact.key_hex(),
            iv: artifact.iv_hex(),
            preview_cid: preview.manifest.manifest_content_id,
            failed_pages: preview.failed_pages,
        }
    }
}

/// Builder for preview and encryption runs against one content store.
///
/// # Example
///
/// ```no_run
/// use pdfveil::{Document, MemoryStore, Pdfveil, PreviewOptions};
/// use std::sync::Arc;
///
/// # async fn run() -> pdfveil::Result<()> {
/// let report = Pdfveil::new(Arc::new(MemoryStore::new()))
///     .with_options(PreviewOptions::new().with_coverage(0.3).with_batch_size(3))
///     .with_seed(42)
///     .upload(&Document::from_path("document.pdf"))
///     .await?;
/// println!("{}", serde_json::to_string_pretty(&report)?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Pdfveil {
    publisher: Publisher,
    rasterizer: Arc<dyn Rasterizer>,
    options: PreviewOptions,
    seed: Option<u64>,
    encrypt_retries: u32,
}

impl Pdfveil {
    /// Create a builder publishing to `store` with default options.
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self::with_publisher(Publisher::new(store))
    }

    /// Create a builder around a configured publisher.
    pub fn with_publisher(publisher: Publisher) -> Self {
        Self {
            publisher,
            rasterizer: Arc::new(PdftoppmRasterizer::new()),
            options: PreviewOptions::default(),
            seed: None,
            encrypt_retries: cipher::DEFAULT_RETRIES,
        }
    }

    /// Set preview options.
    pub fn with_options(mut self, options: PreviewOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a different rasterizer.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Fix patch placement with a seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set retries for the encrypted upload.
    pub fn with_encrypt_retries(mut self, retries: u32) -> Self {
        self.encrypt_retries = retries;
        self
    }

    /// Preview options in use.
    pub fn options(&self) -> &PreviewOptions {
        &self.options
    }

    /// A preview pipeline configured from this builder.
    pub fn pipeline(&self) -> PreviewPipeline {
        let rasterizer = Arc::clone(&self.rasterizer);
        let publisher = self.publisher.clone();
        let options = self.options.clone();
        match self.seed {
            Some(seed) => PreviewPipeline::seeded(rasterizer, publisher, options, seed),
            None => PreviewPipeline::new(rasterizer, publisher, options),
        }
    }

    /// Build and publish a redacted preview.
    pub async fn preview(&self, document: &Document) -> Result<PreviewOutcome> {
        self.pipeline().run(document).await
    }

    /// Encrypt and publish the full document.
    pub async fn encrypt(&self, document: &Document) -> Result<EncryptionArtifact> {
        encrypt_and_publish(&self.publisher, document, self.encrypt_retries).await
    }

    /// Encrypt and publish the document, then publish its preview.
    pub async fn upload(&self, document: &Document) -> Result<UploadReport> {
        let artifact = self.encrypt(document).await?;
        let preview = self.preview(document).await?;
        Ok(UploadReport::new(&artifact, preview))
    }
}

impl std::fmt::Debug for Pdfveil {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pdfveil")
            .field("rasterizer", &self.rasterizer.name())
            .field("options", &self.options)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}
