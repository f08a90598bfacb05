//! Redaction patch geometry.

use serde::{Deserialize, Serialize};

/// A rectangle within a page's pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    /// Left edge in pixels
    pub left: u32,
    /// Top edge in pixels
    pub top: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Patch {
    /// Create a new patch.
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u64 {
        self.left as u64 + self.width as u64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u64 {
        self.top as u64 + self.height as u64
    }

    /// Area in pixels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether the patch lies entirely inside a `width`x`height` page.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width as u64 && self.bottom() <= height as u64
    }

    /// Whether the pixel at (x, y) lies inside the patch.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.left && (x as u64) < self.right() && y >= self.top && (y as u64) < self.bottom()
    }
}

/// The ordered patches to redact on one page.
///
/// Patches are independent draws and may overlap; later patches composite
/// over earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionPlan {
    patches: Vec<Patch>,
}

impl RedactionPlan {
    /// Create a plan from patches in application order.
    pub fn new(patches: Vec<Patch>) -> Self {
        Self { patches }
    }

    /// An empty plan (page published as-is).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Patches in application order.
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// Number of patches.
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// Whether the plan has no patches.
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Whether any patch covers the pixel at (x, y).
    pub fn covers(&self, x: u32, y: u32) -> bool {
        self.patches.iter().any(|p| p.contains(x, y))
    }
}

impl<'a> IntoIterator for &'a RedactionPlan {
    type Item = &'a Patch;
    type IntoIter = std::slice::Iter<'a, Patch>;

    fn into_iter(self) -> Self::IntoIter {
        self.patches.iter()
    }
}
