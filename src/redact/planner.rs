//! Random placement of horizontal blur bands.

use crate::error::{Error, Result};
use crate::model::{Patch, RedactionPlan};
use crate::options::PreviewOptions;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Plan redaction patches for one page.
///
/// The patch count is `max(1, floor(page_area * coverage / patch_area))`.
/// Every patch spans `patch_width` (or the full page width) from the left
/// edge, with its top drawn uniformly from `[0, page_height - patch_height)`.
/// Draws are independent, so patches may overlap.
pub fn plan_patches<R: Rng + ?Sized>(
    rng: &mut R,
    page_width: u32,
    page_height: u32,
    coverage: f64,
    patch_height: u32,
    patch_width: Option<u32>,
) -> Result<RedactionPlan> {
    let effective_width = patch_width.unwrap_or(page_width);

    if patch_height == 0 || effective_width == 0 {
        return Err(Error::InvalidGeometry(format!(
            "patch {}x{} has no area",
            effective_width, patch_height
        )));
    }
    if page_height <= patch_height {
        return Err(Error::InvalidGeometry(format!(
            "page height {} must exceed patch height {}",
            page_height, patch_height
        )));
    }
    if effective_width > page_width {
        return Err(Error::InvalidGeometry(format!(
            "patch width {} exceeds page width {}",
            effective_width, page_width
        )));
    }
    if !(0.0..=1.0).contains(&coverage) {
        return Err(Error::InvalidGeometry(format!(
            "coverage {} is outside 0..=1",
            coverage
        )));
    }

    let page_area = page_width as f64 * page_height as f64;
    let patch_area = effective_width as f64 * patch_height as f64;
    let patch_count = ((page_area * coverage / patch_area).floor() as usize).max(1);

    let patches = (0..patch_count)
        .map(|_| {
            let top = rng.gen_range(0..page_height - patch_height);
            Patch::new(0, top, effective_width, patch_height)
        })
        .collect();

    log::debug!(
        "Generated {} patches for image {}x{}",
        patch_count,
        page_width,
        page_height
    );
    Ok(RedactionPlan::new(patches))
}

/// Plans patches for successive pages from one random source.
///
/// Seed it for reproducible placement:
///
/// ```
/// use pdfveil::redact::PatchPlanner;
/// use pdfveil::PreviewOptions;
///
/// let options = PreviewOptions::default();
/// let a = PatchPlanner::seeded(&options, 7).plan(1000, 1000).unwrap();
/// let b = PatchPlanner::seeded(&options, 7).plan(1000, 1000).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 6);
/// ```
#[derive(Debug, Clone)]
pub struct PatchPlanner<R = StdRng> {
    rng: R,
    patch_width: Option<u32>,
    patch_height: u32,
    coverage: f64,
}

impl PatchPlanner<StdRng> {
    /// Planner seeded from the operating system.
    pub fn new(options: &PreviewOptions) -> Self {
        Self::with_rng(options, StdRng::from_entropy())
    }

    /// Planner with a fixed seed.
    pub fn seeded(options: &PreviewOptions, seed: u64) -> Self {
        Self::with_rng(options, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> PatchPlanner<R> {
    /// Planner drawing from the given random source.
    pub fn with_rng(options: &PreviewOptions, rng: R) -> Self {
        Self {
            rng,
            patch_width: options.patch_width,
            patch_height: options.patch_height,
            coverage: options.coverage_percentage,
        }
    }

    /// Plan patches for a `page_width`x`page_height` page.
    pub fn plan(&mut self, page_width: u32, page_height: u32) -> Result<RedactionPlan> {
        plan_patches(
            &mut self.rng,
            page_width,
            page_height,
            self.coverage,
            self.patch_height,
            self.patch_width,
        )
    }
}
