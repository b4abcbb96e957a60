use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use super::{pdf_response, render_template, Disposition};
use crate::error::{AppError, AppResult};
use crate::models::submission::{self, Submission, SubmissionInput};
use crate::models::template as template_model;
use crate::state::AppState;

/// GET /api/submissions
pub async fn list_submissions(State(state): State<AppState>) -> AppResult<Json<Vec<Submission>>> {
    let conn = state.pool.get()?;
    Ok(Json(submission::list(&conn)?))
}

/// POST /api/submissions
pub async fn create_submission(
    State(state): State<AppState>,
    Json(input): Json<SubmissionInput>,
) -> AppResult<Response> {
    let conn = state.pool.get()?;
    let created = submission::insert(&conn, &input)?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// GET /api/submissions/{id}
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Submission>> {
    let conn = state.pool.get()?;
    Ok(Json(submission::get(&conn, id)?))
}

/// PUT /api/submissions/{id}
pub async fn update_submission(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<SubmissionInput>,
) -> AppResult<Json<Submission>> {
    let conn = state.pool.get()?;
    Ok(Json(submission::update(&conn, id, &input)?))
}

/// DELETE /api/submissions/{id}
pub async fn delete_submission(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let conn = state.pool.get()?;
    if !submission::delete(&conn, id)? {
        return Err(AppError::NotFound(format!("submission {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SubmissionPdfQuery {
    pub template: Option<String>,
}

/// GET /api/submissions/{id}/pdf?template=KEY
pub async fn submission_pdf(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<SubmissionPdfQuery>,
) -> AppResult<Response> {
    let key = query
        .template
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("the 'template' query parameter is required".to_string()))?;

    let (submission, template) = {
        let conn = state.pool.get()?;
        (submission::get(&conn, id)?, template_model::get_by_key(&conn, &key)?)
    };

    let rendered = render_template(&state, &template, submission.to_record(), 1).await?;
    Ok(pdf_response(
        rendered.bytes,
        &format!("submission-{id}.pdf"),
        Disposition::Inline,
        Some(rendered.mode),
    ))
}
