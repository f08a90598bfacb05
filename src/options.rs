//! Preview options and configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Options for building and publishing a redacted preview.
///
/// Field names deserialize from camelCase JSON, so a config file looks like:
///
/// ```json
/// { "patchHeight": 25, "coveragePercentage": 0.3, "unredactedPageCount": 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewOptions {
    /// Width of each blur patch in pixels (full page width when unset)
    pub patch_width: Option<u32>,

    /// Height of each blur patch in pixels
    pub patch_height: u32,

    /// Fraction of each page's area to blur (0 to 1)
    pub coverage_percentage: f64,

    /// Gaussian blur sigma
    pub blur_strength: f32,

    /// Rasterization resolution
    pub dpi: u32,

    /// Number of pages processed and uploaded concurrently
    pub upload_batch_size: usize,

    /// Retries after the first failed upload attempt
    pub upload_retries: u32,

    /// Leading pages published without redaction
    pub unredacted_page_count: u32,

    /// Local manifest index to append to (not written when unset)
    pub index_path: Option<PathBuf>,

    /// Parent directory for the per-run scratch directory (system temp when unset)
    pub temp_dir: Option<PathBuf>,
}

impl PreviewOptions {
    /// Create new preview options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        let options: Self = serde_json::from_slice(&data)?;
        options.validate()?;
        Ok(options)
    }

    /// Set a fixed patch width.
    pub fn with_patch_width(mut self, width: u32) -> Self {
        self.patch_width = Some(width);
        self
    }

    /// Set the patch height.
    pub fn with_patch_height(mut self, height: u32) -> Self {
        self.patch_height = height;
        self
    }

    /// Set the coverage fraction.
    pub fn with_coverage(mut self, coverage: f64) -> Self {
        self.coverage_percentage = coverage;
        self
    }

    /// Set the blur strength.
    pub fn with_blur_strength(mut self, sigma: f32) -> Self {
        self.blur_strength = sigma;
        self
    }

    /// Set the rasterization DPI.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Set the upload batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.upload_batch_size = size;
        self
    }

    /// Set the number of upload retries.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.upload_retries = retries;
        self
    }

    /// Publish the first `count` pages unmodified.
    pub fn with_unredacted_pages(mut self, count: u32) -> Self {
        self.unredacted_page_count = count;
        self
    }

    /// Append the published manifest id to a local index file.
    pub fn with_index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    /// Create scratch directories under `dir`.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Check every value is in range.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.coverage_percentage) {
            return Err(Error::InvalidConfig(
                "coveragePercentage must be between 0 and 1".into(),
            ));
        }
        if self.blur_strength.is_nan() || self.blur_strength <= 0.0 {
            return Err(Error::InvalidConfig(
                "blurStrength must be greater than 0".into(),
            ));
        }
        if self.dpi == 0 {
            return Err(Error::InvalidConfig("dpi must be greater than 0".into()));
        }
        if self.patch_height == 0 {
            return Err(Error::InvalidConfig(
                "patchHeight must be greater than 0".into(),
            ));
        }
        if self.patch_width == Some(0) {
            return Err(Error::InvalidConfig(
                "patchWidth must be greater than 0".into(),
            ));
        }
        if self.upload_batch_size == 0 {
            return Err(Error::InvalidConfig(
                "uploadBatchSize must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Whether a 1-based page index is published without redaction.
    pub fn is_unredacted(&self, page_index: u32) -> bool {
        page_index <= self.unredacted_page_count
    }
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            patch_width: None,
            patch_height: 80,
            coverage_percentage: 0.5,
            blur_strength: 15.0,
            dpi: 150,
            upload_batch_size: 5,
            upload_retries: 2,
            unredacted_page_count: 0,
            index_path: None,
            temp_dir: None,
        }
    }
}
