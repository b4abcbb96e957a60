//! ERPNext passthrough and rendering

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use template::Record;

use super::{pdf_response, render_template, Disposition};
use crate::error::{AppError, AppResult};
use crate::models::template::{self as template_model, DataSource};
use crate::sources::erp::{self, ErpRecords, ErpStatus};
use crate::sources::table::DEFAULT_LIMIT;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ErpQuery {
    /// Frappe filters as a JSON string
    #[serde(default)]
    pub filters: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ErpQuery {
    fn filters(&self) -> AppResult<Option<Value>> {
        self.filters
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .map(|f| {
                serde_json::from_str(f)
                    .map_err(|e| AppError::BadRequest(format!("filters must be JSON: {e}")))
            })
            .transpose()
    }
}

/// GET /api/erp/status
pub async fn status(State(state): State<AppState>) -> Json<ErpStatus> {
    Json(erp::status(state.erp.as_ref()).await)
}

/// GET /api/erp/doctypes/{doctype}
pub async fn list_documents(
    State(state): State<AppState>,
    Path(doctype): Path<String>,
    Query(query): Query<ErpQuery>,
) -> AppResult<Json<ErpRecords>> {
    let filters = query.filters()?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, DEFAULT_LIMIT);
    Ok(Json(
        erp::documents_or_demo(state.erp.as_ref(), &doctype, filters.as_ref(), limit).await,
    ))
}

#[derive(Debug, Serialize)]
pub struct ErpDocument {
    pub record: Record,
    pub demo: bool,
}

async fn fetch_document(state: &AppState, doctype: &str, name: &str) -> AppResult<ErpDocument> {
    erp::document_or_demo(state.erp.as_ref(), doctype, name)
        .await
        .map(|(record, demo)| ErpDocument { record, demo })
        .ok_or_else(|| AppError::NotFound(format!("{doctype} '{name}' not found")))
}

/// GET /api/erp/doctypes/{doctype}/{name}
pub async fn get_document(
    State(state): State<AppState>,
    Path((doctype, name)): Path<(String, String)>,
) -> AppResult<Json<ErpDocument>> {
    Ok(Json(fetch_document(&state, &doctype, &name).await?))
}

/// GET /api/erp/reports/{report}
pub async fn run_report(
    State(state): State<AppState>,
    Path(report): Path<String>,
    Query(query): Query<ErpQuery>,
) -> AppResult<Json<ErpRecords>> {
    let filters = query.filters()?;
    Ok(Json(
        erp::report_or_demo(state.erp.as_ref(), &report, filters.as_ref()).await,
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct RenderDocumentQuery {
    /// Doctype to fetch; the template's ERP doctype source when absent
    #[serde(default)]
    pub doctype: Option<String>,
}

/// POST /api/templates/{key}/erp/{name}
pub async fn render_document(
    State(state): State<AppState>,
    Path((key, name)): Path<(String, String)>,
    Query(query): Query<RenderDocumentQuery>,
) -> AppResult<Response> {
    let template = {
        let conn = state.pool.get()?;
        template_model::get_by_key(&conn, &key)?
    };

    let doctype = match (query.doctype, &template.data_source) {
        (Some(doctype), _) if !doctype.trim().is_empty() => doctype,
        (_, DataSource::ErpDoctype { doctype, .. }) => doctype.clone(),
        _ => {
            return Err(AppError::Validation(format!(
                "template '{key}' has no ERP doctype; pass ?doctype="
            )))
        }
    };

    let document = fetch_document(&state, &doctype, &name).await?;
    let rendered = render_template(&state, &template, document.record, 1).await?;

    let mut response = pdf_response(
        rendered.bytes,
        &format!("{key}-{}.pdf", crate::bulk::sanitize_label(&name)),
        Disposition::Inline,
        Some(rendered.mode),
    );
    if document.demo {
        response.headers_mut().insert(
            axum::http::HeaderName::from_static("x-erp-demo"),
            axum::http::HeaderValue::from_static("true"),
        );
    }
    Ok(response)
}
