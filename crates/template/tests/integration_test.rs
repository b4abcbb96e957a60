//! Integration tests for overlay rendering

use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use pretty_assertions::assert_eq;
use serde_json::json;
use template::{
    parse_field_map, record_from_value, render_to_bytes, FieldMap, FieldPlacement, ImageOverlay,
    OverlaySpec, RecordRange, SkipReason, TextAlign,
};

/// A PDF with `pages` empty A4 pages
fn blank_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for _ in 0..pages {
        let contents_id = doc.add_object(Stream::new(Dictionary::new(), b"0 g".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Real(595.28), Object::Real(841.89)],
            "Resources" => Dictionary::new(),
            "Contents" => contents_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn page_text(pdf: &[u8], page: u32) -> String {
    let doc = Document::load_mem(pdf).unwrap();
    let page_id = doc.get_pages()[&page];
    String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).to_string()
}

fn hex(text: &str) -> String {
    let mut out = String::from("<");
    for b in text.bytes() {
        out.push_str(&format!("{b:02X}"));
    }
    out.push('>');
    out
}

fn png_base64() -> String {
    use base64::Engine;
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    base64::engine::general_purpose::STANDARD.encode(out.into_inner())
}

#[test]
fn test_field_on_second_page_only() {
    let pdf = blank_pdf(2);
    let mut fields = FieldMap::new();
    fields.insert("customer".to_string(), FieldPlacement::at(20.0, 30.0, 2));
    let spec = OverlaySpec::new(fields, Vec::new());
    let record = record_from_value(json!({ "customer": "Acme Ltd" })).unwrap();

    let (out, report) = render_to_bytes(&pdf, &spec, &record, 1).unwrap();

    assert_eq!(report.fields_drawn, vec!["customer".to_string()]);
    assert!(report.skipped.is_empty());
    assert!(!page_text(&out, 1).contains(&hex("Acme Ltd")));
    assert!(page_text(&out, 2).contains(&hex("Acme Ltd")));
}

#[test]
fn test_missing_values_and_pages_are_reported() {
    let pdf = blank_pdf(1);
    let fields = parse_field_map(
        r#"{
            "name": { "x": 10, "y": 10 },
            "email": { "x": 10, "y": 20 },
            "notes": { "x": 10, "y": 30, "page": 3 }
        }"#,
    )
    .unwrap();
    let spec = OverlaySpec::new(fields, Vec::new());
    let record = record_from_value(json!({ "NAME": "Jane", "notes": "x" })).unwrap();

    let (out, report) = render_to_bytes(&pdf, &spec, &record, 1).unwrap();

    assert_eq!(report.fields_drawn, vec!["name".to_string()]);
    assert_eq!(report.skipped.len(), 2);
    let email = report.skipped.iter().find(|s| s.name == "email").unwrap();
    assert_eq!(email.reason, SkipReason::MissingValue);
    let notes = report.skipped.iter().find(|s| s.name == "notes").unwrap();
    assert_eq!(
        notes.reason,
        SkipReason::PageOutOfRange { page: 3, page_count: 1 }
    );
    assert!(page_text(&out, 1).contains(&hex("Jane")));
}

#[test]
fn test_same_input_same_operators() {
    let pdf = blank_pdf(1);
    let mut placement = FieldPlacement::at(40.0, 50.0, 1);
    placement.align = TextAlign::Center;
    placement.width = Some(60.0);
    placement.wrap = true;
    placement.bold = true;

    let mut fields = FieldMap::new();
    fields.insert("address".to_string(), placement);
    let spec = OverlaySpec::new(fields, Vec::new());
    let record = record_from_value(json!({ "address": "221B Baker Street, London NW1 6XE" })).unwrap();

    let (first, _) = render_to_bytes(&pdf, &spec, &record, 1).unwrap();
    let (second, _) = render_to_bytes(&pdf, &spec, &record, 1).unwrap();
    assert_eq!(page_text(&first, 1), page_text(&second, 1));
    assert!(page_text(&first, 1).contains("/DfHelvB 10 Tf"));
}

#[test]
fn test_image_record_range() {
    let pdf = blank_pdf(1);
    let images = vec![ImageOverlay {
        id: "signature".to_string(),
        x: 20.0,
        y: 250.0,
        width: 40.0,
        height: 15.0,
        page: 1,
        data: format!("data:image/png;base64,{}", png_base64()),
        record_range: Some(RecordRange { from: 1, to: 2 }),
    }];
    let spec = OverlaySpec::new(FieldMap::new(), images);
    let record = record_from_value(json!({})).unwrap();

    let (out, report) = render_to_bytes(&pdf, &spec, &record, 2).unwrap();
    assert_eq!(report.images_drawn, vec!["signature".to_string()]);
    assert!(page_text(&out, 1).contains(" Do"));

    let (out, report) = render_to_bytes(&pdf, &spec, &record, 3).unwrap();
    assert!(report.images_drawn.is_empty());
    assert_eq!(report.skipped[0].reason, SkipReason::OutsideRecordRange);
    assert!(!page_text(&out, 1).contains(" Do"));
}

#[test]
fn test_broken_image_is_skipped() {
    let pdf = blank_pdf(1);
    let images = vec![ImageOverlay {
        id: "logo".to_string(),
        x: 0.0,
        y: 0.0,
        width: 10.0,
        height: 10.0,
        page: 1,
        data: "aGVsbG8gd29ybGQ=".to_string(),
        record_range: None,
    }];
    let spec = OverlaySpec::new(FieldMap::new(), images);
    let record = record_from_value(json!({})).unwrap();

    let (_, report) = render_to_bytes(&pdf, &spec, &record, 1).unwrap();
    assert!(matches!(report.skipped[0].reason, SkipReason::InvalidImage(_)));
}

#[test]
fn test_unparseable_pdf_is_an_error() {
    let spec = OverlaySpec::default();
    let record = record_from_value(json!({})).unwrap();
    assert!(render_to_bytes(b"%PDF-1.4 garbage", &spec, &record, 1).is_err());
}
