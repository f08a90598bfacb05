//! Error types for pdfveil.

use std::io;
use thiserror::Error;

/// Result type alias for pdfveil operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while building previews or publishing content.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not recognized as a PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The source document could not be rasterized.
    #[error("Conversion failed: {0}")]
    Conversion(String),

    /// Rasterization finished but produced no page images.
    #[error("No images generated from PDF")]
    NoPagesGenerated,

    /// Patch geometry cannot be planned for a page.
    #[error("Invalid patch geometry: {0}")]
    InvalidGeometry(String),

    /// A planned patch lies outside the page it was planned for.
    #[error("Patch {left},{top} {width}x{height} is outside the {page_width}x{page_height} page")]
    PatchExtraction {
        left: u32,
        top: u32,
        width: u32,
        height: u32,
        page_width: u32,
        page_height: u32,
    },

    /// Every upload attempt for a payload failed.
    #[error("Failed to publish {name} after {attempts} attempts: {cause}")]
    PublishExhausted {
        name: String,
        attempts: u32,
        #[source]
        cause: Box<Error>,
    },

    /// The preview manifest could not be published. No partial preview exists without it.
    #[error("Failed to publish manifest: {0}")]
    ManifestPublish(#[source] Box<Error>),

    /// The document to encrypt is neither a buffer nor a readable file.
    #[error("Invalid encryption input: {0}")]
    EncryptionInput(String),

    /// Authenticated encryption or decryption failed.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Error decoding or encoding a raster image.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The content store rejected or failed a request.
    #[error("Content store error: {0}")]
    Store(String),

    /// Transport error talking to a remote content store.
    #[cfg(feature = "pinata")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration values are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether this error must abort a preview run instead of being recorded
    /// against a single page.
    ///
    /// Geometry and extraction errors mean the planner or configuration is
    /// wrong for every page, so they are never retried or swallowed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::InvalidGeometry(_) | Error::PatchExtraction { .. } | Error::InvalidConfig(_)
        )
    }

    /// Whether retrying the operation that produced this error can help.
    pub fn is_retryable(&self) -> bool {
        !self.is_fatal()
            && !matches!(
                self,
                Error::EncryptionInput(_) | Error::Encryption(_) | Error::UnknownFormat
            )
    }
}
