//! Repair of damaged PDF files through Ghostscript
//!
//! Files lopdf cannot load are often still readable by Ghostscript, which
//! rewrites them with a clean cross-reference table.

use crate::{PdfError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Ghostscript executable used to rewrite broken files
#[derive(Debug, Clone)]
pub struct Ghostscript {
    program: PathBuf,
}

impl Ghostscript {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Rewrite `data` as a PDF 1.4 file
    ///
    /// The result is checked with lopdf before it is returned.
    pub fn repair(&self, data: &[u8]) -> Result<Vec<u8>> {
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join("input.pdf");
        let output = workdir.path().join("repaired.pdf");
        std::fs::write(&input, data)?;

        let result = Command::new(&self.program)
            .arg("-sDEVICE=pdfwrite")
            .arg("-dCompatibilityLevel=1.4")
            .arg("-dNOPAUSE")
            .arg("-dQUIET")
            .arg("-dBATCH")
            .arg(format!("-sOutputFile={}", output.display()))
            .arg(&input)
            .output()
            .map_err(|e| {
                PdfError::RepairFailed(format!("cannot run {}: {e}", self.program.display()))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(PdfError::RepairFailed(format!(
                "ghostscript exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        let repaired = std::fs::read(&output)
            .map_err(|e| PdfError::RepairFailed(format!("no output written: {e}")))?;

        lopdf::Document::load_mem(&repaired)
            .map_err(|e| PdfError::RepairFailed(format!("output still unreadable: {e}")))?;

        Ok(repaired)
    }
}

/// Repair with an optional Ghostscript; `None` means repair is disabled
pub fn repair_with(ghostscript: Option<&Ghostscript>, data: &[u8]) -> Result<Vec<u8>> {
    match ghostscript {
        Some(gs) => gs.repair(data),
        None => Err(PdfError::RepairUnavailable),
    }
}
