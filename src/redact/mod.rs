//! Patch planning and blur redaction.

mod blur;
mod planner;

pub use blur::{composite_blur, Redactor};
pub use planner::{plan_patches, PatchPlanner};
