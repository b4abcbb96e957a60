//! File storage under the configured root
//!
//! Layout:
//! - `templates/<key>-<uuid>.pdf` uploaded template PDFs
//! - `imports/<uuid>.<ext>` uploaded spreadsheets
//! - `bulk/<session>/` generated PDFs and `manifest.json`
//!
//! Paths stored in the database are relative to the root.

use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const TEMPLATES_DIR: &str = "templates";
const IMPORTS_DIR: &str = "imports";
const BULK_DIR: &str = "bulk";

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Create the storage directories if they are missing
    pub fn init(&self) -> AppResult<()> {
        for dir in [TEMPLATES_DIR, IMPORTS_DIR, BULK_DIR] {
            std::fs::create_dir_all(self.root.join(dir))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a stored relative path
    ///
    /// Only plain relative paths are accepted.
    pub fn resolve(&self, relative: &str) -> AppResult<PathBuf> {
        let path = Path::new(relative);
        let plain = !relative.is_empty()
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(AppError::BadRequest(format!("invalid storage path: {relative}")));
        }
        Ok(self.root.join(path))
    }

    pub fn read(&self, relative: &str) -> AppResult<Vec<u8>> {
        let path = self.resolve(relative)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                AppError::NotFound(format!("stored file {relative} is missing"))
            }
            _ => AppError::Io(e),
        })
    }

    /// Delete a stored file; a missing file is not an error
    pub fn remove(&self, relative: &str) -> AppResult<()> {
        let path = self.resolve(relative)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Store a template PDF and return its relative path
    pub fn save_template_pdf(&self, key: &str, bytes: &[u8]) -> AppResult<String> {
        let relative = format!("{TEMPLATES_DIR}/{key}-{}.pdf", Uuid::new_v4().simple());
        self.write(&relative, bytes)?;
        Ok(relative)
    }

    /// Store an uploaded spreadsheet, keeping its extension
    pub fn save_import(&self, extension: &str, bytes: &[u8]) -> AppResult<String> {
        let relative = format!("{IMPORTS_DIR}/{}.{extension}", Uuid::new_v4().simple());
        self.write(&relative, bytes)?;
        Ok(relative)
    }

    /// Directory of a bulk session
    pub fn bulk_dir(&self, session: Uuid) -> PathBuf {
        self.root.join(BULK_DIR).join(session.to_string())
    }

    fn write(&self, relative: &str, bytes: &[u8]) -> AppResult<()> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
