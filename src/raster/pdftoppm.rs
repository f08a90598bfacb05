//! Rasterizer backed by the poppler `pdftoppm` tool.

use crate::detect::read_header_from_path;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use super::Rasterizer;

/// Runs `pdftoppm -png -r <dpi> <source> <out_dir>/page`.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    program: PathBuf,
}

impl PdftoppmRasterizer {
    /// Use `pdftoppm` from `PATH`.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("pdftoppm"),
        }
    }

    /// Use a specific `pdftoppm` binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn name(&self) -> &str {
        "pdftoppm"
    }

    fn rasterize(&self, source: &Path, dpi: u32, out_dir: &Path) -> Result<()> {
        read_header_from_path(source).map_err(|e| {
            Error::Conversion(format!("{} is not a readable PDF: {}", source.display(), e))
        })?;

        let started = Instant::now();
        let output = Command::new(&self.program)
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg(source)
            .arg(out_dir.join("page"))
            .output()
            .map_err(|e| {
                Error::Conversion(format!("failed to run {}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Conversion(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        log::info!("PDF conversion took {}ms", started.elapsed().as_millis());
        Ok(())
    }
}
