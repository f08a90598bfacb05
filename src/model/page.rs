//! Raster page types.

use crate::error::Result;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

/// A single rasterized page.
#[derive(Debug, Clone)]
pub struct Page {
    /// Page number (1-indexed)
    pub index: u32,

    /// File name the converter wrote this page to (e.g. "page-03.png")
    pub file_name: String,

    /// Decoded pixels
    pub image: RgbaImage,

    /// Encoded image exactly as the converter produced it
    pub source: Vec<u8>,
}

impl Page {
    /// Decode a PNG page image.
    pub fn from_png(index: u32, file_name: impl Into<String>, source: Vec<u8>) -> Result<Self> {
        let image = image::load_from_memory_with_format(&source, ImageFormat::Png)?.to_rgba8();
        Ok(Self {
            index,
            file_name: file_name.into(),
            image,
            source,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Get page dimensions as (width, height) tuple.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Encode pixels as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}
