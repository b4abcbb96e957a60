//! Overlay rendering

use crate::parser::{lookup_value, value_to_string, Record};
use crate::placement::layout_field;
use crate::schema::{FieldPlacement, ImageOverlay, OverlaySpec};
use crate::{Result, TemplateError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pdf_core::units::mm_to_pt;
use pdf_core::{Align, PdfDocument, StandardFont};

/// Why a field or image was left out of a rendered document
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The record has no value (or an empty one) for the field
    MissingValue,
    /// The placement points at a page the document does not have
    PageOutOfRange { page: usize, page_count: usize },
    /// The image is limited to other records
    OutsideRecordRange,
    /// The image data could not be decoded or embedded
    InvalidImage(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingValue => write!(f, "no value in record"),
            SkipReason::PageOutOfRange { page, page_count } => {
                write!(f, "page {page} does not exist (document has {page_count})")
            }
            SkipReason::OutsideRecordRange => write!(f, "outside record range"),
            SkipReason::InvalidImage(e) => write!(f, "invalid image: {e}"),
        }
    }
}

/// A field or image that was not drawn
#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    pub name: String,
    pub reason: SkipReason,
}

/// What one render call drew and skipped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    pub fields_drawn: Vec<String>,
    pub images_drawn: Vec<String>,
    pub skipped: Vec<Skipped>,
}

/// Draws a record's values and image overlays onto a PDF
pub struct OverlayRenderer<'a> {
    spec: &'a OverlaySpec,
}

impl<'a> OverlayRenderer<'a> {
    /// Create a new renderer for an overlay spec
    pub fn new(spec: &'a OverlaySpec) -> Self {
        Self { spec }
    }

    /// Render one record onto `doc`
    ///
    /// # Arguments
    /// * `doc` - PDF document to render into
    /// * `record` - Values by field name
    /// * `record_number` - 1-indexed position of the record in its batch,
    ///   used for image record ranges
    pub fn render(
        &self,
        doc: &mut PdfDocument,
        record: &Record,
        record_number: usize,
    ) -> Result<RenderReport> {
        let mut report = RenderReport::default();
        let page_count = doc.page_count();

        for image in &self.spec.images {
            match self.render_image(doc, image, record_number, page_count) {
                Ok(()) => report.images_drawn.push(image.id.clone()),
                Err(reason) => {
                    tracing::warn!(image = %image.id, %reason, "image overlay skipped");
                    report.skipped.push(Skipped {
                        name: image.id.clone(),
                        reason,
                    });
                }
            }
        }

        for (name, placement) in &self.spec.fields {
            let value = lookup_value(record, name)
                .map(value_to_string)
                .unwrap_or_default();

            if let Some(reason) = check_field(placement, &value, page_count) {
                tracing::warn!(field = %name, %reason, "field skipped");
                report.skipped.push(Skipped {
                    name: name.clone(),
                    reason,
                });
                continue;
            }

            self.render_field(doc, placement, &value)?;
            report.fields_drawn.push(name.clone());
        }

        Ok(report)
    }

    fn render_field(&self, doc: &mut PdfDocument, placement: &FieldPlacement, value: &str) -> Result<()> {
        let page_size = doc.page_size(placement.page)?;

        doc.set_font(StandardFont::from_bold(placement.bold), placement.font_size);
        doc.set_text_color(placement.color.unwrap_or_default().into());

        for line in layout_field(placement, value, page_size) {
            doc.insert_text(&line.text, placement.page, line.x, line.baseline, Align::Left)?;
        }

        Ok(())
    }

    fn render_image(
        &self,
        doc: &mut PdfDocument,
        image: &ImageOverlay,
        record_number: usize,
        page_count: usize,
    ) -> std::result::Result<(), SkipReason> {
        if !image.applies_to(record_number) {
            return Err(SkipReason::OutsideRecordRange);
        }
        if image.page == 0 || image.page > page_count {
            return Err(SkipReason::PageOutOfRange {
                page: image.page,
                page_count,
            });
        }

        let data = decode_image_data(&image.data)
            .map_err(|e| SkipReason::InvalidImage(e.to_string()))?;
        let page_size = doc
            .page_size(image.page)
            .map_err(|e| SkipReason::InvalidImage(e.to_string()))?;
        let (x, y) = page_size.clamp(mm_to_pt(image.x), mm_to_pt(image.y));

        doc.insert_image(
            &data,
            image.page,
            x,
            y,
            mm_to_pt(image.width),
            mm_to_pt(image.height),
        )
        .map_err(|e| SkipReason::InvalidImage(e.to_string()))
    }
}

fn check_field(placement: &FieldPlacement, value: &str, page_count: usize) -> Option<SkipReason> {
    if placement.page == 0 || placement.page > page_count {
        return Some(SkipReason::PageOutOfRange {
            page: placement.page,
            page_count,
        });
    }
    if value.trim().is_empty() {
        return Some(SkipReason::MissingValue);
    }
    None
}

/// Decode base64 image data, with or without a `data:` URL prefix
pub fn decode_image_data(data: &str) -> Result<Vec<u8>> {
    let payload = match data.trim().strip_prefix("data:") {
        Some(url) => url
            .split_once(',')
            .map(|(_, body)| body)
            .ok_or_else(|| TemplateError::ImageError("malformed data URL".to_string()))?,
        None => data.trim(),
    };

    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| TemplateError::ImageError(e.to_string()))
}

/// Open `pdf`, render one record and return the new PDF bytes
pub fn render_to_bytes(
    pdf: &[u8],
    spec: &OverlaySpec,
    record: &Record,
    record_number: usize,
) -> Result<(Vec<u8>, RenderReport)> {
    let mut doc = PdfDocument::open_from_bytes(pdf)?;
    let report = OverlayRenderer::new(spec).render(&mut doc, record, record_number)?;
    let bytes = doc.to_bytes()?;
    Ok((bytes, report))
}
