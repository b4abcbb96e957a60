//! Overlay rendering with repair and fallback
//!
//! A record is first drawn onto the template PDF. If the PDF cannot be
//! processed, it is passed through Ghostscript (when configured) and drawn
//! again; failing that, a plain "key: value" document is produced so the
//! caller always gets a PDF.

use pdf_core::fallback::render_key_value_pdf;
use pdf_core::repair::{repair_with, Ghostscript};
use serde::{Deserialize, Serialize};
use template::{lookup_value, render_to_bytes, value_to_string, OverlaySpec, Record, RenderReport};

use crate::error::AppResult;

/// Response header naming the path that produced a PDF
pub const RENDER_MODE_HEADER: &str = "x-render-mode";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Drawn onto the original PDF
    Overlay,
    /// Drawn onto a Ghostscript-rewritten copy
    Repaired,
    /// Key/value list without the template
    Fallback,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Overlay => "overlay",
            RenderMode::Repaired => "repaired",
            RenderMode::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub mode: RenderMode,
    /// Drawn and skipped items; absent for fallback documents
    pub report: Option<RenderReport>,
}

/// Render one record, degrading through repair and fallback as needed
///
/// `record_number` is 1-indexed and selects which image overlays apply.
/// `title` heads the fallback document.
pub fn render_record(
    pdf: &[u8],
    spec: &OverlaySpec,
    record: &Record,
    record_number: usize,
    ghostscript: Option<&Ghostscript>,
    title: &str,
) -> AppResult<RenderedPdf> {
    let overlay_error = match render_to_bytes(pdf, spec, record, record_number) {
        Ok((bytes, report)) => {
            log_skipped(&report);
            return Ok(RenderedPdf {
                bytes,
                mode: RenderMode::Overlay,
                report: Some(report),
            });
        }
        Err(e) => e,
    };
    tracing::warn!("overlay rendering failed: {overlay_error}");

    match repair_with(ghostscript, pdf) {
        Ok(repaired) => match render_to_bytes(&repaired, spec, record, record_number) {
            Ok((bytes, report)) => {
                tracing::info!("rendered after Ghostscript repair");
                log_skipped(&report);
                return Ok(RenderedPdf {
                    bytes,
                    mode: RenderMode::Repaired,
                    report: Some(report),
                });
            }
            Err(e) => tracing::warn!("rendering the repaired PDF failed: {e}"),
        },
        Err(e) => tracing::warn!("PDF repair skipped: {e}"),
    }

    let entries = fallback_entries(spec, record);
    let bytes = render_key_value_pdf(title, &entries)?;
    Ok(RenderedPdf {
        bytes,
        mode: RenderMode::Fallback,
        report: None,
    })
}

fn log_skipped(report: &RenderReport) {
    for skipped in &report.skipped {
        tracing::warn!(field = %skipped.name, "skipped: {}", skipped.reason);
    }
}

/// Entries listed by the fallback document
///
/// Mapped fields come first, in field map order; the remaining record
/// values follow.
fn fallback_entries(spec: &OverlaySpec, record: &Record) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = spec
        .fields
        .keys()
        .filter_map(|name| {
            lookup_value(record, name).map(|value| (name.clone(), value_to_string(value)))
        })
        .collect();

    for (key, value) in record {
        if !entries.iter().any(|(name, _)| name.eq_ignore_ascii_case(key)) {
            entries.push((key.clone(), value_to_string(value)));
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object, Stream};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use template::{FieldMap, FieldPlacement};

    fn blank_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(595), Object::Integer(842)],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn spec() -> OverlaySpec {
        let mut fields = FieldMap::new();
        fields.insert("name".to_string(), FieldPlacement::at(20.0, 20.0, 1));
        OverlaySpec::new(fields, Vec::new())
    }

    fn record() -> Record {
        let mut record = Record::new();
        record.insert("Name".to_string(), json!("Alice"));
        record.insert("city".to_string(), json!("Oslo"));
        record
    }

    #[test]
    fn test_overlay_mode() {
        let rendered = render_record(&blank_pdf(), &spec(), &record(), 1, None, "t").unwrap();
        assert_eq!(rendered.mode, RenderMode::Overlay);
        assert_eq!(rendered.report.unwrap().fields_drawn, vec!["name".to_string()]);
        assert!(rendered.bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_fallback_without_ghostscript() {
        let rendered =
            render_record(b"%PDF-1.4 not really", &spec(), &record(), 1, None, "invoice").unwrap();
        assert_eq!(rendered.mode, RenderMode::Fallback);
        assert!(rendered.report.is_none());

        let doc = lopdf::Document::load_mem(&rendered.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_fallback_with_missing_ghostscript() {
        let gs = Ghostscript::new("/nonexistent/bin/gs-docfill");
        let rendered = render_record(b"garbage", &spec(), &record(), 1, Some(&gs), "t").unwrap();
        assert_eq!(rendered.mode, RenderMode::Fallback);
    }

    #[test]
    fn test_fallback_entries_order() {
        let entries = fallback_entries(&spec(), &record());
        assert_eq!(
            entries,
            vec![
                ("name".to_string(), "Alice".to_string()),
                ("city".to_string(), "Oslo".to_string()),
            ]
        );
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(serde_json::to_value(RenderMode::Repaired).unwrap(), json!("repaired"));
        assert_eq!(RenderMode::Fallback.as_str(), "fallback");
    }
}
