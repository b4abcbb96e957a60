//! Spreadsheet imports attached to templates

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use template::Record;

use super::read_form;
use crate::error::{AppError, AppResult};
use crate::models::data_import::{self, DataImport, NewDataImport};
use crate::models::template::{self as template_model, DataSource};
use crate::sources::spreadsheet::{self, SpreadsheetKind};
use crate::state::AppState;

const PREVIEW_ROWS: usize = 20;

#[derive(Debug, Serialize)]
pub struct ImportDetail {
    #[serde(flatten)]
    pub import: DataImport,
    pub preview: Vec<Record>,
}

/// Upload problems are the client's fault
fn as_validation(err: AppError) -> AppError {
    match err {
        AppError::Spreadsheet(msg) => AppError::Validation(format!("cannot read spreadsheet: {msg}")),
        other => other,
    }
}

/// POST /api/templates/{key}/imports (multipart: file)
pub async fn upload_import(
    State(state): State<AppState>,
    Path(key): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let template = {
        let conn = state.pool.get()?;
        template_model::get_by_key(&conn, &key)?
    };

    let (_, upload) = read_form(multipart).await?.require_file()?;
    let (_, extension) = SpreadsheetKind::from_file_name(&upload.file_name)?;
    let file_path = state.storage.save_import(&extension, &upload.bytes)?;

    let path = state.storage.resolve(&file_path)?;
    let sheet = match tokio::task::spawn_blocking(move || spreadsheet::read_file(&path)).await? {
        Ok(sheet) => sheet,
        Err(e) => {
            state.storage.remove(&file_path)?;
            return Err(as_validation(e));
        }
    };

    let conn = state.pool.get()?;
    let created = data_import::insert(
        &conn,
        &NewDataImport {
            template_id: template.id,
            original_name: &upload.file_name,
            file_path: &file_path,
            columns: &sheet.columns,
            total_rows: sheet.total_rows() as i64,
        },
    );
    let import = match created {
        Ok(import) => import,
        Err(e) => {
            state.storage.remove(&file_path)?;
            return Err(e);
        }
    };

    tracing::info!(
        template = %key,
        import = import.id,
        rows = import.total_rows,
        "spreadsheet imported"
    );

    Ok((
        StatusCode::CREATED,
        Json(ImportDetail {
            import,
            preview: sheet.preview(PREVIEW_ROWS),
        }),
    )
        .into_response())
}

/// GET /api/templates/{key}/imports
pub async fn list_imports(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<Vec<DataImport>>> {
    let conn = state.pool.get()?;
    let template = template_model::get_by_key(&conn, &key)?;
    Ok(Json(data_import::list_for_template(&conn, template.id)?))
}

/// GET /api/imports/{id}
pub async fn get_import(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ImportDetail>> {
    let import = {
        let conn = state.pool.get()?;
        data_import::get(&conn, id)?
    };

    let path = state.storage.resolve(&import.file_path)?;
    let sheet = tokio::task::spawn_blocking(move || spreadsheet::read_file(&path)).await??;

    Ok(Json(ImportDetail {
        import,
        preview: sheet.preview(PREVIEW_ROWS),
    }))
}

/// DELETE /api/imports/{id}
///
/// Templates reading from the import are reset to no data source.
pub async fn delete_import(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let conn = state.pool.get()?;
    let import = data_import::get(&conn, id)?;

    for template in template_model::list(&conn)? {
        if template.data_source == (DataSource::Import { import_id: id }) {
            template_model::update_data_source(&conn, &template.key, &DataSource::None)?;
        }
    }

    data_import::delete(&conn, id)?;
    state.storage.remove(&import.file_path)?;
    Ok(StatusCode::NO_CONTENT)
}
