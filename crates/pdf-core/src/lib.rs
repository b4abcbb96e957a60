//! PDF Core - Low-level PDF manipulation
//!
//! This crate provides functionality for:
//! - Opening and saving PDF documents
//! - Reading page sizes (with inherited MediaBox/CropBox)
//! - Inserting text at specific coordinates with the standard Helvetica fonts
//! - Inserting images (JPEG, PNG)
//! - Converting between editor pixels, millimetres and points
//! - Repairing damaged files with Ghostscript
//! - Building a plain key/value PDF when no template can be used
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{Align, PdfDocument, StandardFont};
//!
//! let mut doc = PdfDocument::open("template.pdf")?;
//! doc.set_font(StandardFont::Helvetica, 12.0);
//! doc.insert_text("Hello, World!", 1, 100.0, 100.0, Align::Left)?;
//! doc.save("output.pdf")?;
//! ```

mod document;
pub mod fallback;
mod image;
pub mod metrics;
pub mod repair;
mod text;
pub mod units;

pub use document::{Color, PdfDocument};
pub use image::{ImageFormat, ImageScaleMode};
pub use metrics::{StandardFont, CAP_HEIGHT};
pub use text::{calculate_x_offset, generate_text_operators, wrap_text, TextRenderContext};
pub use units::PageSize;

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("Ghostscript is not configured")]
    RepairUnavailable,

    #[error("Repair failed: {0}")]
    RepairFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Text alignment options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}
