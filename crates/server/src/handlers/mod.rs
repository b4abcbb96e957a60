pub mod bulk;
pub mod database;
pub mod erp;
pub mod fields;
pub mod health;
pub mod imports;
pub mod submissions;
pub mod templates;

use axum::extract::Multipart;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use template::Record;

use crate::error::{AppError, AppResult};
use crate::models::template::Template;
use crate::render::{render_record, RenderMode, RenderedPdf, RENDER_MODE_HEADER};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    fn as_str(&self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }
}

/// `application/pdf` response, tagged with the render mode when known
pub fn pdf_response(
    bytes: Vec<u8>,
    file_name: &str,
    disposition: Disposition,
    mode: Option<RenderMode>,
) -> Response {
    let mut response = file_response(bytes, "application/pdf", file_name, disposition);
    if let Some(mode) = mode {
        response.headers_mut().insert(
            HeaderName::from_static(RENDER_MODE_HEADER),
            HeaderValue::from_static(mode.as_str()),
        );
    }
    response
}

pub fn file_response(
    bytes: Vec<u8>,
    content_type: &'static str,
    file_name: &str,
    disposition: Disposition,
) -> Response {
    let file_name: String = file_name
        .chars()
        .filter(|c| c.is_ascii_graphic() && *c != '"' && *c != '\\')
        .collect();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("{}; filename=\"{file_name}\"", disposition.as_str()),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Render `record` onto a template's stored PDF on the blocking pool
pub async fn render_template(
    state: &AppState,
    template: &Template,
    record: Record,
    record_number: usize,
) -> AppResult<RenderedPdf> {
    let storage = state.storage.clone();
    let pdf_path = template.pdf_path.clone();
    let spec = template.overlay_spec();
    let ghostscript = state.config.ghostscript.clone();
    let title = template.name.clone();

    tokio::task::spawn_blocking(move || {
        let pdf = storage.read(&pdf_path)?;
        render_record(&pdf, &spec, &record, record_number, ghostscript.as_ref(), &title)
    })
    .await?
}

/// An uploaded file part
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Text fields and the `file` part of a multipart form
pub struct Form {
    pub fields: HashMap<String, String>,
    pub file: Option<Upload>,
}

impl Form {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require_file(self) -> AppResult<(HashMap<String, String>, Upload)> {
        match self.file {
            Some(file) if !file.bytes.is_empty() => Ok((self.fields, file)),
            _ => Err(AppError::Validation("a non-empty 'file' upload is required".to_string())),
        }
    }
}

pub async fn read_form(mut multipart: Multipart) -> AppResult<Form> {
    let mut form = Form {
        fields: HashMap::new(),
        file: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read multipart field: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read file data: {e}")))?;
            form.file = Some(Upload {
                file_name,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read field {name}: {e}")))?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}
