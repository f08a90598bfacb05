//! Source document references.

use crate::error::Result;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// A source document, either held in memory or referenced on disk.
///
/// The document is read-only for the duration of a run.
#[derive(Debug, Clone)]
pub enum Document {
    /// Document bytes held in memory
    Bytes {
        /// Raw PDF data
        data: Vec<u8>,
        /// Name to publish under, if known
        filename: Option<String>,
    },

    /// Document stored in a file
    File(PathBuf),
}

impl Document {
    /// Reference a document on disk.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Document::File(path.into())
    }

    /// Wrap document bytes.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Document::Bytes {
            data: data.into(),
            filename: None,
        }
    }

    /// Set the filename for an in-memory document. File references keep their own name.
    pub fn with_filename(self, name: impl Into<String>) -> Self {
        match self {
            Document::Bytes { data, .. } => Document::Bytes {
                data,
                filename: Some(name.into()),
            },
            file => file,
        }
    }

    /// The base filename, if one is known.
    pub fn filename(&self) -> Option<String> {
        match self {
            Document::Bytes { filename, .. } => filename.clone(),
            Document::File(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
        }
    }

    /// The file path, for documents stored on disk.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Document::File(path) => Some(path),
            Document::Bytes { .. } => None,
        }
    }

    /// Whether the document can be read: bytes always can, files must exist.
    pub fn is_resolvable(&self) -> bool {
        match self {
            Document::Bytes { .. } => true,
            Document::File(path) => path.is_file(),
        }
    }

    /// Read the document content.
    pub fn read(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            Document::Bytes { data, .. } => Ok(Cow::Borrowed(data)),
            Document::File(path) => Ok(Cow::Owned(std::fs::read(path)?)),
        }
    }
}

impl From<PathBuf> for Document {
    fn from(path: PathBuf) -> Self {
        Document::File(path)
    }
}

impl From<&Path> for Document {
    fn from(path: &Path) -> Self {
        Document::File(path.to_path_buf())
    }
}

impl From<Vec<u8>> for Document {
    fn from(data: Vec<u8>) -> Self {
        Document::from_bytes(data)
    }
}
