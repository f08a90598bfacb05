//! Page rasterization.
//!
//! A [`Rasterizer`] writes one PNG per page into a directory; [`RasterPages`]
//! lists those files in page order and decodes them on demand, so the
//! sequence can be walked as many times as needed while the directory lives.
//!
//! # Example
//!
//! ```no_run
//! use pdfveil::raster::{rasterize, PdftoppmRasterizer};
//! use std::path::Path;
//!
//! fn main() -> pdfveil::Result<()> {
//!     let scratch = tempfile::tempdir()?;
//!     let pages = rasterize(
//!         &PdftoppmRasterizer::new(),
//!         Path::new("document.pdf"),
//!         150,
//!         scratch.path(),
//!     )?;
//!     for page in pages.iter() {
//!         let page = page?;
//!         println!("page {}: {}x{}", page.index, page.width(), page.height());
//!     }
//!     Ok(())
//! }
//! ```

mod pdftoppm;

pub use pdftoppm::PdftoppmRasterizer;

use crate::error::{Error, Result};
use crate::model::Page;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Converts a document into per-page PNG files.
pub trait Rasterizer: Send + Sync {
    /// Name of the converter, for logs.
    fn name(&self) -> &str;

    /// Write `page-<n>.png` for every page of `source` into `out_dir`.
    ///
    /// Fails with [`Error::Conversion`] when the source is not a valid
    /// document or the converter fails.
    fn rasterize(&self, source: &Path, dpi: u32, out_dir: &Path) -> Result<()>;
}

/// Run a rasterizer and list the pages it produced.
pub fn rasterize(
    rasterizer: &dyn Rasterizer,
    source: &Path,
    dpi: u32,
    out_dir: &Path,
) -> Result<RasterPages> {
    rasterizer.rasterize(source, dpi, out_dir)?;
    RasterPages::scan(out_dir)
}

/// One page image written by a rasterizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFile {
    /// Page number (1-indexed), parsed from the file name
    pub index: u32,
    /// Full path to the image
    pub path: PathBuf,
}

impl RasterFile {
    /// File name without directory.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Raw image bytes as the converter wrote them.
    pub fn read(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.path)?)
    }

    /// Read and decode the page.
    pub fn load(&self) -> Result<Page> {
        Page::from_png(self.index, self.file_name(), self.read()?)
    }
}

/// Page images in a directory, ordered by page number.
#[derive(Debug, Clone, Default)]
pub struct RasterPages {
    files: Vec<RasterFile>,
}

fn page_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^page-(\d+)\.png$").expect("valid page name pattern"))
}

/// Parse the page number from a converter file name such as `page-007.png`.
pub fn parse_page_index(file_name: &str) -> Option<u32> {
    page_name_pattern()
        .captures(file_name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

impl RasterPages {
    /// List the page images in `dir`.
    ///
    /// Files that do not match `page-<n>.png` are ignored. Ordering is by the
    /// numeric suffix, so `page-10.png` follows `page-9.png`.
    pub fn scan(dir: &Path) -> Result<Self> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(index) = name.to_str().and_then(parse_page_index) else {
                continue;
            };
            files.push(RasterFile {
                index,
                path: entry.path(),
            });
        }
        files.sort_by_key(|f| f.index);

        log::debug!("Found {} page images in {}", files.len(), dir.display());
        Ok(Self { files })
    }

    /// Build from an explicit file list.
    pub fn from_files(mut files: Vec<RasterFile>) -> Self {
        files.sort_by_key(|f| f.index);
        Self { files }
    }

    /// Number of pages.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no pages were produced.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Page files in order.
    pub fn files(&self) -> &[RasterFile] {
        &self.files
    }

    /// Decode pages in order. Each call starts from the first page again.
    pub fn iter(&self) -> impl Iterator<Item = Result<Page>> + '_ {
        self.files.iter().map(RasterFile::load)
    }

    /// Fail with [`Error::NoPagesGenerated`] if empty.
    pub fn require_pages(self) -> Result<Self> {
        if self.is_empty() {
            return Err(Error::NoPagesGenerated);
        }
        Ok(self)
    }
}
