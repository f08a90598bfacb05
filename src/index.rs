//! Local index of published previews.
//!
//! The index is a JSON array of `{ "file": ..., "jsonCID": ... }` records.
//! New records are appended; existing ones are kept as they are.

use crate::error::Result;
use crate::model::ContentId;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// One published preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Source document file name
    pub file: String,
    /// Content id of the preview manifest
    #[serde(rename = "jsonCID")]
    pub json_cid: ContentId,
}

impl IndexEntry {
    /// Create an index entry.
    pub fn new(file: impl Into<String>, json_cid: ContentId) -> Self {
        Self {
            file: file.into(),
            json_cid,
        }
    }
}

/// Read the raw records of an index. A missing or unreadable index is empty.
fn read_records(path: &Path) -> Vec<serde_json::Value> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(_) => {
            log::info!(
                "No existing index found at {}, creating new one",
                path.display()
            );
            return Vec::new();
        }
    };

    match serde_json::from_slice(&data) {
        Ok(serde_json::Value::Array(records)) => records,
        Ok(_) | Err(_) => {
            log::warn!(
                "Index at {} is not a JSON array, starting a new one",
                path.display()
            );
            Vec::new()
        }
    }
}

/// Read the well-formed entries of an index.
pub fn read_index(path: &Path) -> Vec<IndexEntry> {
    read_records(path)
        .into_iter()
        .filter_map(|record| serde_json::from_value(record).ok())
        .collect()
}

/// Append `entry` to the index at `path`, creating it if needed.
///
/// The file is replaced atomically. Returns the number of records now in the
/// index.
pub fn append_to_index(path: &Path, entry: &IndexEntry) -> Result<usize> {
    let mut records = read_records(path);
    records.push(serde_json::to_value(entry)?);

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut file, &records)?;
    file.write_all(b"\n")?;
    file.persist(path).map_err(|e| e.error)?;

    log::info!("Appended {} to index {}", entry.json_cid, path.display());
    Ok(records.len())
}
