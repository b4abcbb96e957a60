//! Template upload, metadata, preview and generation

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pdf_core::units::round_mm;
use pdf_core::PdfDocument;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use template::record_from_value;

use super::{pdf_response, read_form, render_template, Disposition};
use crate::error::{AppError, AppResult};
use crate::models::data_import;
use crate::models::schema_admin::{table_exists, validate_identifier};
use crate::models::template::{self as template_model, DataSource, NewTemplate, TemplateSummary};
use crate::sources::{load_records, LoadedRecords};
use crate::state::AppState;

/// GET /api/templates
pub async fn list_templates(State(state): State<AppState>) -> AppResult<Json<Vec<TemplateSummary>>> {
    let conn = state.pool.get()?;
    let templates = template_model::list(&conn)?;
    Ok(Json(templates.into_iter().map(TemplateSummary::from).collect()))
}

/// Page count of an uploaded PDF; zero when it cannot be parsed
///
/// Unparseable uploads are kept so that rendering can repair or fall back.
fn inspect_pdf(bytes: &[u8]) -> AppResult<i64> {
    if !bytes.starts_with(b"%PDF-") {
        return Err(AppError::Validation("uploaded file is not a PDF".to_string()));
    }
    match PdfDocument::open_from_bytes(bytes) {
        Ok(doc) => Ok(doc.page_count() as i64),
        Err(e) => {
            tracing::warn!("uploaded PDF cannot be parsed, storing as-is: {e}");
            Ok(0)
        }
    }
}

/// POST /api/templates (multipart: key, name, file)
pub async fn create_template(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = read_form(multipart).await?;
    let key = form
        .text("key")
        .ok_or_else(|| AppError::Validation("'key' is required".to_string()))?
        .to_string();
    template_model::validate_key(&key)?;
    let name = form.text("name").unwrap_or(&key).to_string();
    let (_, upload) = form.require_file()?;

    let page_count = inspect_pdf(&upload.bytes)?;

    {
        let conn = state.pool.get()?;
        if template_model::find_by_key(&conn, &key)?.is_some() {
            return Err(AppError::Validation(format!("template key '{key}' already exists")));
        }
    }

    let pdf_path = state.storage.save_template_pdf(&key, &upload.bytes)?;
    let conn = state.pool.get()?;
    let created = template_model::insert(
        &conn,
        &NewTemplate {
            key: &key,
            name: &name,
            pdf_path: &pdf_path,
            page_count,
        },
    );

    match created {
        Ok(template) => {
            tracing::info!(key = %template.key, pages = page_count, "template created");
            Ok((StatusCode::CREATED, Json(template)).into_response())
        }
        Err(e) => {
            state.storage.remove(&pdf_path)?;
            Err(e)
        }
    }
}

/// GET /api/templates/{key}
pub async fn get_template(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<template_model::Template>> {
    let conn = state.pool.get()?;
    Ok(Json(template_model::get_by_key(&conn, &key)?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTemplate {
    pub name: String,
}

/// PUT /api/templates/{key}
pub async fn update_template(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(payload): Json<UpdateTemplate>,
) -> AppResult<Json<template_model::Template>> {
    let conn = state.pool.get()?;
    Ok(Json(template_model::update_name(&conn, &key, &payload.name)?))
}

/// DELETE /api/templates/{key}
///
/// Removes the stored PDF and every import file along with the row.
pub async fn delete_template(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<StatusCode> {
    let conn = state.pool.get()?;
    let template = template_model::get_by_key(&conn, &key)?;
    let imports = data_import::list_for_template(&conn, template.id)?;

    template_model::delete(&conn, &key)?;

    for import in &imports {
        state.storage.remove(&import.file_path)?;
    }
    state.storage.remove(&template.pdf_path)?;

    tracing::info!(key = %key, imports = imports.len(), "template deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/templates/{key}/pdf
pub async fn template_pdf(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Response> {
    let template = {
        let conn = state.pool.get()?;
        template_model::get_by_key(&conn, &key)?
    };
    let bytes = state.storage.read(&template.pdf_path)?;
    Ok(pdf_response(bytes, &format!("{key}.pdf"), Disposition::Inline, None))
}

#[derive(Debug, Serialize)]
pub struct PageInfo {
    pub page: usize,
    pub width_pt: f64,
    pub height_pt: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// GET /api/templates/{key}/pages
pub async fn template_pages(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<Vec<PageInfo>>> {
    let template = {
        let conn = state.pool.get()?;
        template_model::get_by_key(&conn, &key)?
    };
    let bytes = state.storage.read(&template.pdf_path)?;
    let doc = PdfDocument::open_from_bytes(&bytes)
        .map_err(|e| AppError::Validation(format!("template PDF cannot be read: {e}")))?;

    let pages = doc
        .page_sizes()?
        .into_iter()
        .enumerate()
        .map(|(idx, size)| PageInfo {
            page: idx + 1,
            width_pt: size.width,
            height_pt: size.height,
            width_mm: round_mm(size.width_mm()),
            height_mm: round_mm(size.height_mm()),
        })
        .collect();
    Ok(Json(pages))
}

/// PUT /api/templates/{key}/source
pub async fn set_data_source(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(source): Json<DataSource>,
) -> AppResult<Json<template_model::Template>> {
    let conn = state.pool.get()?;
    let template = template_model::get_by_key(&conn, &key)?;

    match &source {
        DataSource::None => {}
        DataSource::Table { table } => {
            validate_identifier(table)?;
            if !table_exists(&conn, table)? {
                return Err(AppError::Validation(format!("table '{table}' does not exist")));
            }
        }
        DataSource::Import { import_id } => {
            let import = data_import::find(&conn, *import_id)?
                .ok_or_else(|| AppError::Validation(format!("import {import_id} does not exist")))?;
            if import.template_id != template.id {
                return Err(AppError::Validation(format!(
                    "import {import_id} belongs to another template"
                )));
            }
        }
        DataSource::ErpDoctype { doctype: name, .. } | DataSource::ErpReport { report: name, .. } => {
            if name.trim().is_empty() {
                return Err(AppError::Validation("ERP source name must not be empty".to_string()));
            }
        }
    }

    Ok(Json(template_model::update_data_source(&conn, &key, &source)?))
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub total: usize,
    #[serde(flatten)]
    pub loaded: LoadedRecords,
}

/// GET /api/templates/{key}/records
pub async fn template_records(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<RecordsResponse>> {
    let template = {
        let conn = state.pool.get()?;
        template_model::get_by_key(&conn, &key)?
    };
    let loaded = load_records(&state, &template).await?;
    Ok(Json(RecordsResponse {
        total: loaded.records.len(),
        loaded,
    }))
}

async fn render_posted_record(
    state: &AppState,
    key: &str,
    body: Value,
    disposition: Disposition,
) -> AppResult<Response> {
    let template = {
        let conn = state.pool.get()?;
        template_model::get_by_key(&conn, key)?
    };
    let record = record_from_value(body)?;
    let rendered = render_template(state, &template, record, 1).await?;

    Ok(pdf_response(
        rendered.bytes,
        &format!("{key}.pdf"),
        disposition,
        Some(rendered.mode),
    ))
}

/// POST /api/templates/{key}/preview
pub async fn preview(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<Value>,
) -> AppResult<Response> {
    render_posted_record(&state, &key, body, Disposition::Inline).await
}

/// POST /api/templates/{key}/generate
pub async fn generate(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<Value>,
) -> AppResult<Response> {
    render_posted_record(&state, &key, body, Disposition::Attachment).await
}
