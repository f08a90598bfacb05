//! Blur compositing over planned patches.

use crate::error::{Error, Result};
use crate::model::{Page, Patch, RedactionPlan};
use image::{imageops, RgbaImage};

/// Blur one patch of `image` in place of the original pixels.
///
/// Only pixels inside the patch are read or written, so pixels outside every
/// patch are never altered.
pub fn composite_blur(mut image: RgbaImage, patch: &Patch, sigma: f32) -> Result<RgbaImage> {
    let (width, height) = image.dimensions();
    if !patch.fits_within(width, height) {
        return Err(Error::PatchExtraction {
            left: patch.left,
            top: patch.top,
            width: patch.width,
            height: patch.height,
            page_width: width,
            page_height: height,
        });
    }
    if patch.area() == 0 {
        return Ok(image);
    }

    let region =
        imageops::crop_imm(&image, patch.left, patch.top, patch.width, patch.height).to_image();
    let blurred = imageops::blur(&region, sigma);
    imageops::replace(&mut image, &blurred, patch.left as i64, patch.top as i64);
    Ok(image)
}

/// Applies a redaction plan to page images.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Redactor {
    blur_strength: f32,
}

impl Redactor {
    /// Create a redactor with the given blur sigma.
    pub fn new(blur_strength: f32) -> Self {
        Self { blur_strength }
    }

    /// Blur sigma.
    pub fn blur_strength(&self) -> f32 {
        self.blur_strength
    }

    /// Redact a working copy of `image`, folding the patches in plan order.
    pub fn redact_image(&self, image: &RgbaImage, plan: &RedactionPlan) -> Result<RgbaImage> {
        plan.patches()
            .iter()
            .try_fold(image.clone(), |img, patch| {
                composite_blur(img, patch, self.blur_strength)
            })
    }

    /// Redact a page. The page itself is left untouched.
    pub fn redact(&self, page: &Page, plan: &RedactionPlan) -> Result<RgbaImage> {
        self.redact_image(&page.image, plan)
    }
}
