//! Template Engine - field maps and overlay rendering
//!
//! This crate provides:
//! - Field placement and image overlay types (stored as JSON)
//! - Record lookup and flattening
//! - Layout of values in page coordinates (alignment, wrapping, baseline)
//! - Rendering a record onto a template PDF
//!
//! # Example
//!
//! ```ignore
//! use template::{parse_field_map, render_to_bytes, OverlaySpec, Record};
//!
//! let fields = parse_field_map(r#"{"name": {"x": 20, "y": 30}}"#)?;
//! let spec = OverlaySpec::new(fields, Vec::new());
//! let record: Record = serde_json::from_str(r#"{"name": "Jane"}"#)?;
//! let (pdf, report) = render_to_bytes(&template_pdf, &spec, &record, 1)?;
//! ```

pub mod parser;
pub mod placement;
mod renderer;
mod schema;

pub use parser::{
    flatten_object, lookup_value, parse_field_map, parse_images, record_from_value,
    value_to_string, Record,
};
pub use placement::{editor_position_to_mm, layout_field, PlacedLine, LINE_HEIGHT_RATIO};
pub use renderer::{
    decode_image_data, render_to_bytes, OverlayRenderer, RenderReport, SkipReason, Skipped,
};
pub use schema::*;

use thiserror::Error;

/// Errors that can occur during template processing
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to parse template: {0}")]
    ParseError(String),

    #[error("Invalid template: {0}")]
    ValidationError(String),

    #[error("PDF error: {0}")]
    PdfError(#[from] pdf_core::PdfError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    ImageError(String),
}

/// Result type for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;
