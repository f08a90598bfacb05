//! Published artifact descriptions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier returned by the content-addressed store for an uploaded payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Wrap a store-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ContentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ContentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A page that could not be included in the preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFailure {
    /// Page number (1-indexed)
    pub page: u32,
    /// Raster file name of the page
    pub file: String,
    /// Last error observed for the page
    pub error: String,
}

/// The published description of one document's redacted preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Base name of the source document
    pub source_filename: String,
    /// Content ids of the published pages, in page order
    pub content_ids: Vec<ContentId>,
    /// Content id of the published manifest payload
    pub manifest_content_id: ContentId,
}

impl Manifest {
    /// The JSON payload uploaded for a list of page content ids.
    ///
    /// Consumers fetch the manifest by id and read a plain array of page ids.
    pub fn payload(content_ids: &[ContentId]) -> serde_json::Value {
        serde_json::Value::Array(
            content_ids
                .iter()
                .map(|id| serde_json::Value::String(id.to_string()))
                .collect(),
        )
    }

    /// Number of pages in the preview.
    pub fn page_count(&self) -> usize {
        self.content_ids.len()
    }
}
