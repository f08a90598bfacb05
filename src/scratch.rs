//! Per-run scratch directories.
//!
//! Every run gets its own directory, removed when the run ends however it
//! ends: [`with_scratch_dir`] releases it after the body returns `Ok` or
//! `Err`, and the `TempDir` guard removes it if the body panics.

use crate::error::Result;
use std::future::Future;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PREFIX: &str = "pdfveil-";

/// A scratch directory owned by one run.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a fresh directory under `parent`, or the system temp dir.
    pub fn acquire(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX);
        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        log::debug!("Created scratch directory {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the directory and everything in it.
    ///
    /// Removal failures are logged, never returned, so they cannot mask the
    /// outcome of the run that used the directory.
    pub fn release(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => log::info!("Cleaned up temporary directory {}", path.display()),
            Err(e) => log::error!(
                "Failed to clean temporary directory {}: {}",
                path.display(),
                e
            ),
        }
    }
}

/// Acquire a scratch directory, run `body` in it, and always release it.
pub async fn with_scratch_dir<T, F, Fut>(parent: Option<&Path>, body: F) -> Result<T>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let scratch = ScratchDir::acquire(parent)?;
    let result = body(scratch.path().to_path_buf()).await;
    scratch.release();
    result
}
