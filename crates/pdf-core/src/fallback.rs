//! Plain key/value PDF for records that cannot be merged into a template

use crate::metrics::StandardFont;
use crate::text::wrap_text;
use crate::units::PageSize;
use crate::{Align, PdfDocument, Result};

const MARGIN: f64 = 50.0;
const TITLE_SIZE: f64 = 14.0;
const BODY_SIZE: f64 = 10.0;
const LINE_HEIGHT: f64 = 14.0;

/// Render `entries` as a "key: value" list on A4 pages
///
/// Long values wrap inside the page margins and the list continues on new
/// pages as needed.
pub fn render_key_value_pdf(title: &str, entries: &[(String, String)]) -> Result<Vec<u8>> {
    let page_size = PageSize::A4;
    let max_width = page_size.width - 2.0 * MARGIN;
    let bottom = page_size.height - MARGIN;

    let mut doc = PdfDocument::new_blank(page_size)?;
    let mut page = 1;
    let mut y = MARGIN + TITLE_SIZE;

    doc.set_font(StandardFont::HelveticaBold, TITLE_SIZE);
    doc.insert_text(title, page, MARGIN, y, Align::Left)?;
    y += LINE_HEIGHT * 2.0;

    let mut lines = Vec::new();
    if entries.is_empty() {
        lines.push("(no data)".to_string());
    }
    for (key, value) in entries {
        let text = format!("{key}: {value}");
        let wrapped = wrap_text(&text, StandardFont::Helvetica, BODY_SIZE, max_width);
        lines.extend(wrapped);
    }

    doc.set_font(StandardFont::Helvetica, BODY_SIZE);
    for line in lines {
        if y > bottom {
            page = doc.add_blank_page(page_size)?;
            y = MARGIN + BODY_SIZE;
        }
        doc.insert_text(&line, page, MARGIN, y, Align::Left)?;
        y += LINE_HEIGHT;
    }

    doc.to_bytes()
}
