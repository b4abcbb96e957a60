//! Bulk generation sessions
//!
//! Each run renders every record into its own PDF under
//! `bulk/<session-id>/` and records the outcome in `manifest.json`.

use pdf_core::repair::Ghostscript;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Write};
use std::path::PathBuf;
use template::{lookup_value, value_to_string, OverlaySpec, Record};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::db::now;
use crate::error::{AppError, AppResult};
use crate::render::{render_record, RenderMode};
use crate::storage::Storage;

pub const MANIFEST_FILE: &str = "manifest.json";

const MAX_LABEL_LEN: usize = 60;

/// One generated PDF; `index` is the 1-indexed record number
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkFile {
    pub index: usize,
    pub file_name: String,
    pub label: String,
    pub mode: RenderMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkFailure {
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkManifest {
    pub session_id: Uuid,
    pub template_key: String,
    pub created_at: String,
    pub total_records: usize,
    /// Records were bundled ERP demo data
    #[serde(default)]
    pub demo: bool,
    pub files: Vec<BulkFile>,
    pub failures: Vec<BulkFailure>,
}

impl BulkManifest {
    pub fn file(&self, index: usize) -> AppResult<&BulkFile> {
        self.files
            .iter()
            .find(|f| f.index == index)
            .ok_or_else(|| AppError::NotFound(format!("bulk file {index} not found")))
    }
}

/// Inputs of one bulk run
pub struct BulkJob<'a> {
    pub template_key: &'a str,
    pub template_name: &'a str,
    pub pdf: &'a [u8],
    pub spec: &'a OverlaySpec,
    pub records: &'a [Record],
    /// Record field whose value names each file
    pub label_field: Option<&'a str>,
    pub ghostscript: Option<&'a Ghostscript>,
    pub demo: bool,
}

/// File-name-safe version of a label
pub fn sanitize_label(label: &str) -> String {
    let mut out = String::new();
    for c in label.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let out = out.trim_matches(|c| c == '_' || c == '.');
    out.chars().take(MAX_LABEL_LEN).collect()
}

fn record_label(record: &Record, label_field: Option<&str>, index: usize) -> String {
    label_field
        .and_then(|field| lookup_value(record, field))
        .map(value_to_string)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| index.to_string())
}

/// Render every record of `job` into a new session directory
///
/// Per-record failures are logged and listed in the manifest; the run
/// itself only fails on storage errors.
pub fn run_bulk(storage: &Storage, job: &BulkJob) -> AppResult<BulkManifest> {
    let session_id = Uuid::new_v4();
    let dir = storage.bulk_dir(session_id);
    std::fs::create_dir_all(&dir)?;

    tracing::info!(
        session = %session_id,
        template = job.template_key,
        records = job.records.len(),
        "starting bulk generation"
    );

    let mut files = Vec::new();
    let mut failures = Vec::new();

    for (offset, record) in job.records.iter().enumerate() {
        let index = offset + 1;
        let label = record_label(record, job.label_field, index);
        let mut safe = sanitize_label(&label);
        if safe.is_empty() {
            safe = index.to_string();
        }
        let file_name = format!("{index:04}_{safe}.pdf");

        let title = format!("{} #{index}", job.template_name);
        match render_record(job.pdf, job.spec, record, index, job.ghostscript, &title) {
            Ok(rendered) => {
                std::fs::write(dir.join(&file_name), &rendered.bytes)?;
                files.push(BulkFile {
                    index,
                    file_name,
                    label,
                    mode: rendered.mode,
                });
            }
            Err(e) => {
                tracing::warn!(session = %session_id, record = index, "bulk record failed: {e}");
                failures.push(BulkFailure {
                    index,
                    error: e.to_string(),
                });
            }
        }
    }

    let manifest = BulkManifest {
        session_id,
        template_key: job.template_key.to_string(),
        created_at: now(),
        total_records: job.records.len(),
        demo: job.demo,
        files,
        failures,
    };
    std::fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?)?;

    tracing::info!(
        session = %session_id,
        generated = manifest.files.len(),
        failed = manifest.failures.len(),
        "bulk generation finished"
    );
    Ok(manifest)
}

/// Session id from a URL segment
pub fn parse_session_id(session: &str) -> AppResult<Uuid> {
    Uuid::parse_str(session)
        .map_err(|_| AppError::BadRequest(format!("invalid bulk session id: {session}")))
}

pub fn load_manifest(storage: &Storage, session_id: Uuid) -> AppResult<BulkManifest> {
    let path = storage.bulk_dir(session_id).join(MANIFEST_FILE);
    let raw = std::fs::read(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            AppError::NotFound(format!("bulk session {session_id} not found"))
        }
        _ => AppError::Io(e),
    })?;
    Ok(serde_json::from_slice(&raw)?)
}

pub fn file_path(storage: &Storage, manifest: &BulkManifest, file: &BulkFile) -> PathBuf {
    storage.bulk_dir(manifest.session_id).join(&file.file_name)
}

/// Zip every generated PDF of a session
pub fn zip_session(storage: &Storage, manifest: &BulkManifest) -> AppResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for file in &manifest.files {
        let bytes = std::fs::read(file_path(storage, manifest, file))?;
        zip.start_file(file.file_name.as_str(), options)?;
        zip.write_all(&bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}
