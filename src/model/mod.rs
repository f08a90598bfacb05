//! Data types shared across the preview and encryption pipelines.
//!
//! Source documents flow in as [`Document`], are rasterized into [`Page`]s,
//! redacted according to a [`RedactionPlan`], and leave as [`ContentId`]s
//! collected into a [`Manifest`].

mod artifact;
mod document;
mod manifest;
mod page;
mod patch;

pub use artifact::{EncryptionArtifact, KEY_LEN, NONCE_LEN};
pub use document::Document;
pub use manifest::{ContentId, Manifest, PageFailure};
pub use page::{encode_png, Page};
pub use patch::{Patch, RedactionPlan};
