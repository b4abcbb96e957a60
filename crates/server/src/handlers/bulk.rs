//! Bulk generation endpoints

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use template::{record_from_value, Record};
use uuid::Uuid;

use super::{file_response, pdf_response, Disposition};
use crate::bulk::{self, BulkFailure, BulkJob, BulkManifest};
use crate::error::{AppError, AppResult};
use crate::models::template as template_model;
use crate::render::RenderMode;
use crate::sources::load_records;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BulkRequest {
    /// Inline records; the template's data source is used when absent
    #[serde(default)]
    pub records: Option<Vec<Value>>,
    #[serde(default)]
    pub label_field: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkFileLinks {
    pub index: usize,
    pub file_name: String,
    pub label: String,
    pub mode: RenderMode,
    pub view_url: String,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
pub struct BulkSummary {
    pub session_id: Uuid,
    pub template_key: String,
    pub created_at: String,
    pub total_records: usize,
    pub generated: usize,
    pub demo: bool,
    pub files: Vec<BulkFileLinks>,
    pub failures: Vec<BulkFailure>,
    pub zip_url: String,
}

impl BulkSummary {
    fn new(manifest: BulkManifest) -> Self {
        let base = format!("/api/bulk/{}", manifest.session_id);
        let files = manifest
            .files
            .into_iter()
            .map(|f| BulkFileLinks {
                view_url: format!("{base}/files/{}", f.index),
                download_url: format!("{base}/files/{}/download", f.index),
                index: f.index,
                file_name: f.file_name,
                label: f.label,
                mode: f.mode,
            })
            .collect::<Vec<_>>();

        Self {
            session_id: manifest.session_id,
            template_key: manifest.template_key,
            created_at: manifest.created_at,
            total_records: manifest.total_records,
            generated: files.len(),
            demo: manifest.demo,
            files,
            failures: manifest.failures,
            zip_url: format!("{base}/zip"),
        }
    }
}

/// POST /api/templates/{key}/bulk
pub async fn run_bulk(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> AppResult<Response> {
    let request: BulkRequest = if body.iter().all(u8::is_ascii_whitespace) {
        BulkRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("invalid bulk request: {e}")))?
    };
    let template = {
        let conn = state.pool.get()?;
        template_model::get_by_key(&conn, &key)?
    };

    let (records, demo): (Vec<Record>, bool) = match request.records {
        Some(values) => (
            values
                .into_iter()
                .map(record_from_value)
                .collect::<template::Result<_>>()?,
            false,
        ),
        None => {
            let loaded = load_records(&state, &template).await?;
            (loaded.records, loaded.demo)
        }
    };
    if records.is_empty() {
        return Err(AppError::Validation("no records to generate".to_string()));
    }

    let storage = state.storage.clone();
    let ghostscript = state.config.ghostscript.clone();
    let label_field = request.label_field;
    let manifest = tokio::task::spawn_blocking(move || {
        let pdf = storage.read(&template.pdf_path)?;
        let spec = template.overlay_spec();
        bulk::run_bulk(
            &storage,
            &BulkJob {
                template_key: &template.key,
                template_name: &template.name,
                pdf: &pdf,
                spec: &spec,
                records: &records,
                label_field: label_field.as_deref(),
                ghostscript: ghostscript.as_ref(),
                demo,
            },
        )
    })
    .await??;

    Ok((StatusCode::CREATED, Json(BulkSummary::new(manifest))).into_response())
}

/// GET /api/bulk/{session}
pub async fn get_session(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> AppResult<Json<BulkSummary>> {
    let manifest = bulk::load_manifest(&state.storage, bulk::parse_session_id(&session)?)?;
    Ok(Json(BulkSummary::new(manifest)))
}

async fn session_file(
    state: &AppState,
    session: &str,
    index: usize,
    disposition: Disposition,
) -> AppResult<Response> {
    let manifest = bulk::load_manifest(&state.storage, bulk::parse_session_id(session)?)?;
    let file = manifest.file(index)?;
    let bytes = tokio::fs::read(bulk::file_path(&state.storage, &manifest, file))
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                AppError::NotFound(format!("bulk file {} is missing", file.file_name))
            }
            _ => AppError::Io(e),
        })?;
    Ok(pdf_response(bytes, &file.file_name, disposition, Some(file.mode)))
}

/// GET /api/bulk/{session}/files/{index}
pub async fn view_file(
    State(state): State<AppState>,
    Path((session, index)): Path<(String, usize)>,
) -> AppResult<Response> {
    session_file(&state, &session, index, Disposition::Inline).await
}

/// GET /api/bulk/{session}/files/{index}/download
pub async fn download_file(
    State(state): State<AppState>,
    Path((session, index)): Path<(String, usize)>,
) -> AppResult<Response> {
    session_file(&state, &session, index, Disposition::Attachment).await
}

/// GET /api/bulk/{session}/zip
pub async fn download_zip(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> AppResult<Response> {
    let session_id = bulk::parse_session_id(&session)?;
    let manifest = bulk::load_manifest(&state.storage, session_id)?;
    let file_name = format!("{}-{session_id}.zip", manifest.template_key);

    let storage = state.storage.clone();
    let bytes = tokio::task::spawn_blocking(move || bulk::zip_session(&storage, &manifest)).await??;
    Ok(file_response(bytes, "application/zip", &file_name, Disposition::Attachment))
}
