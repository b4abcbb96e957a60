//! Field map and image overlay editing

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use template::{decode_image_data, editor_position_to_mm, FieldMap, FieldPlacement, ImageOverlay};

use crate::error::{AppError, AppResult};
use crate::models::template::{self as template_model, Template};
use crate::state::AppState;

/// PUT /api/templates/{key}/fields
pub async fn replace_fields(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(fields): Json<FieldMap>,
) -> AppResult<Json<Template>> {
    let conn = state.pool.get()?;
    Ok(Json(template_model::update_field_map(&conn, &key, &fields)?))
}

/// PUT /api/templates/{key}/fields/{name}
pub async fn upsert_field(
    State(state): State<AppState>,
    Path((key, name)): Path<(String, String)>,
    Json(placement): Json<FieldPlacement>,
) -> AppResult<Json<Template>> {
    let conn = state.pool.get()?;
    let template = template_model::get_by_key(&conn, &key)?;
    placement.validate(&name)?;

    let mut fields = template.field_map;
    fields.insert(name, placement);
    Ok(Json(template_model::update_field_map(&conn, &key, &fields)?))
}

/// DELETE /api/templates/{key}/fields/{name}
pub async fn delete_field(
    State(state): State<AppState>,
    Path((key, name)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    let conn = state.pool.get()?;
    let mut fields = template_model::get_by_key(&conn, &key)?.field_map;
    if fields.remove(&name).is_none() {
        return Err(AppError::NotFound(format!("field '{name}' not found in '{key}'")));
    }
    template_model::update_field_map(&conn, &key, &fields)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Editor drag result in screen pixels
#[derive(Debug, Deserialize)]
pub struct PositionRequest {
    pub px: f64,
    pub py: f64,
    /// Editor pixels per PDF point; the configured zoom when absent
    #[serde(default)]
    pub zoom: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct PositionResponse {
    pub field: String,
    pub x: f64,
    pub y: f64,
    pub placement: FieldPlacement,
}

/// POST /api/templates/{key}/fields/{name}/position
pub async fn move_field(
    State(state): State<AppState>,
    Path((key, name)): Path<(String, String)>,
    Json(request): Json<PositionRequest>,
) -> AppResult<Json<PositionResponse>> {
    let zoom = request.zoom.unwrap_or(state.config.editor_zoom);
    if !(zoom.is_finite() && zoom > 0.0) {
        return Err(AppError::Validation("zoom must be a positive number".to_string()));
    }
    if !(request.px.is_finite() && request.py.is_finite()) {
        return Err(AppError::Validation("px and py must be numbers".to_string()));
    }

    let (x, y) = editor_position_to_mm(request.px.max(0.0), request.py.max(0.0), zoom);

    let conn = state.pool.get()?;
    let mut fields = template_model::get_by_key(&conn, &key)?.field_map;
    let placement = fields
        .get_mut(&name)
        .ok_or_else(|| AppError::NotFound(format!("field '{name}' not found in '{key}'")))?;
    placement.x = x;
    placement.y = y;
    let placement = placement.clone();

    template_model::update_field_map(&conn, &key, &fields)?;
    tracing::debug!(template = %key, field = %name, x, y, "field moved");

    Ok(Json(PositionResponse {
        field: name,
        x,
        y,
        placement,
    }))
}

/// PUT /api/templates/{key}/images
pub async fn replace_images(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(images): Json<Vec<ImageOverlay>>,
) -> AppResult<Json<Template>> {
    for image in &images {
        decode_image_data(&image.data).map_err(|e| {
            AppError::Validation(format!("image '{}' has invalid data: {e}", image.id))
        })?;
    }
    let conn = state.pool.get()?;
    Ok(Json(template_model::update_images(&conn, &key, &images)?))
}
