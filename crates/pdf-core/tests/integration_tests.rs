//! Integration tests for pdf-core
//!
//! These tests build small PDFs with lopdf, overlay text and images and
//! read the saved result back.

use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use pdf_core::units::{mm_to_pt, px_to_mm};
use pdf_core::{Align, Color, PdfDocument, PdfError, StandardFont};
use pretty_assertions::assert_eq;

/// Build a PDF whose pages are given as (MediaBox on the page, content)
///
/// The Pages node carries an A4 MediaBox and a shared Resources dictionary
/// stored as an indirect object, so pages without their own box inherit it.
fn build_pdf(pages: &[(Option<(f32, f32)>, &str)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    let existing_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F0" => existing_font },
    });

    let mut kids = Vec::new();
    for (media_box, content) in pages {
        let contents_id = doc.add_object(Stream::new(Dictionary::new(), content.as_bytes().to_vec()));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => contents_id,
        };
        if let Some((w, h)) = media_box {
            page.set(
                "MediaBox",
                vec![Object::Integer(0), Object::Integer(0), Object::Real(*w as _), Object::Real(*h as _)],
            );
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Real(595.28), Object::Real(841.89)],
            "Resources" => resources_id,
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

fn content_of(bytes: &[u8], page: usize) -> String {
    let doc = PdfDocument::open_from_bytes(bytes).unwrap();
    String::from_utf8_lossy(&doc.page_content(page).unwrap()).to_string()
}

fn page_resources(bytes: &[u8], page: u32) -> Dictionary {
    let doc = Document::load_mem(bytes).unwrap();
    let page_id = doc.get_pages()[&page];
    let page_dict = doc.get_object(page_id).unwrap().as_dict().unwrap();
    page_dict.get(b"Resources").unwrap().as_dict().unwrap().clone()
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(4, 2, image::Rgba([200, 10, 10, 128]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[test]
fn test_open_and_page_count() {
    let pdf = build_pdf(&[(None, ""), (None, "")]);
    let doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    assert_eq!(doc.page_count(), 2);
}

#[test]
fn test_inherited_and_own_media_box() {
    let pdf = build_pdf(&[(None, ""), (Some((842.0, 595.0)), "")]);
    let doc = PdfDocument::open_from_bytes(&pdf).unwrap();

    let first = doc.page_size(1).unwrap();
    assert!((first.width_mm() - 210.0).abs() < 0.1);
    assert!((first.height_mm() - 297.0).abs() < 0.1);

    let second = doc.page_size(2).unwrap();
    assert!(second.is_landscape());
    assert_eq!(doc.page_sizes().unwrap().len(), 2);
}

#[test]
fn test_overlay_only_touches_target_page() {
    let pdf = build_pdf(&[(None, "0 0 1 rg 10 10 50 50 re f"), (None, "")]);
    let mut doc = PdfDocument::open_from_bytes(&pdf).unwrap();

    doc.set_font(StandardFont::Helvetica, 12.0);
    doc.insert_text("Page two", 2, 50.0, 100.0, Align::Left).unwrap();
    let out = doc.to_bytes().unwrap();

    let first = content_of(&out, 1);
    assert_eq!(first, "0 0 1 rg 10 10 50 50 re f");

    let second = content_of(&out, 2);
    assert!(second.contains("/DfHelv 12 Tf"));
    assert!(second.contains("50 741.89 Td"));
}

#[test]
fn test_original_content_is_isolated() {
    // Content that leaves a transformation matrix behind
    let pdf = build_pdf(&[(None, "2 0 0 2 100 100 cm 0 0 10 10 re f")]);
    let mut doc = PdfDocument::open_from_bytes(&pdf).unwrap();

    doc.insert_text("Total", 1, 10.0, 20.0, Align::Left).unwrap();
    let out = doc.to_bytes().unwrap();

    let content = content_of(&out, 1);
    let original = content.find("2 0 0 2 100 100 cm").unwrap();
    let restore = content.find("\nQ\n").unwrap();
    let overlay = content.find("BT").unwrap();
    assert!(content.starts_with("q\n"));
    assert!(original < restore && restore < overlay);
}

#[test]
fn test_indirect_resources_are_kept() {
    let pdf = build_pdf(&[(None, "BT /F0 12 Tf (x) Tj ET")]);
    let mut doc = PdfDocument::open_from_bytes(&pdf).unwrap();

    doc.set_font(StandardFont::HelveticaBold, 9.0);
    doc.insert_text("Bold", 1, 10.0, 20.0, Align::Left).unwrap();
    let out = doc.to_bytes().unwrap();

    let resources = page_resources(&out, 1);
    let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
    assert!(fonts.get(b"F0").is_ok());
    assert!(fonts.get(b"DfHelvB").is_ok());
}

#[test]
fn test_insert_image_registers_xobject() {
    let pdf = build_pdf(&[(None, "")]);
    let mut doc = PdfDocument::open_from_bytes(&pdf).unwrap();

    let png = png_bytes();
    doc.insert_image(&png, 1, 20.0, 30.0, 80.0, 40.0).unwrap();
    // Same bytes again reuse the embedded object
    doc.insert_image(&png, 1, 120.0, 30.0, 80.0, 40.0).unwrap();
    let out = doc.to_bytes().unwrap();

    let resources = page_resources(&out, 1);
    let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
    assert_eq!(xobjects.len(), 1);

    let content = content_of(&out, 1);
    assert_eq!(content.matches("/DfIm1 Do").count(), 2);
    // Top edge at 30pt from the top of an A4 page, 40pt tall
    assert!(content.contains("80 0 0 40 20 771.89 cm"));
}

#[test]
fn test_insert_invalid_image() {
    let pdf = build_pdf(&[(None, "")]);
    let mut doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    let err = doc.insert_image(b"GIF89a", 1, 0.0, 0.0, 10.0, 10.0).unwrap_err();
    assert!(matches!(err, PdfError::ImageError(_)));
}

#[test]
fn test_invalid_page() {
    let pdf = build_pdf(&[(None, "")]);
    let mut doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    let err = doc.insert_text("x", 5, 0.0, 0.0, Align::Left).unwrap_err();
    assert!(matches!(err, PdfError::InvalidPage(5, 1)));
}

#[test]
fn test_editor_click_to_points() {
    // A click at (150px, 300px) in an editor zoomed to 1.5
    let x_mm = px_to_mm(150.0, 1.5);
    let y_mm = px_to_mm(300.0, 1.5);
    assert!((mm_to_pt(x_mm) - 100.0).abs() < 1e-9);
    assert!((mm_to_pt(y_mm) - 200.0).abs() < 1e-9);
}

#[test]
fn test_color_and_save_to_file() {
    let pdf = build_pdf(&[(None, "")]);
    let mut doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    doc.set_text_color(Color::from_rgb(255, 0, 0));
    doc.insert_text("Red", 1, 10.0, 10.0, Align::Left).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.pdf");
    doc.save(&path).unwrap();

    let reopened = PdfDocument::open(&path).unwrap();
    let content = String::from_utf8_lossy(&reopened.page_content(1).unwrap()).to_string();
    assert!(content.contains("1 0 0 rg"));
}

#[test]
fn test_second_save_is_stable() {
    let pdf = build_pdf(&[(None, "")]);
    let mut doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    doc.insert_text("Once", 1, 10.0, 10.0, Align::Left).unwrap();

    let first = doc.to_bytes().unwrap();
    let second = doc.to_bytes().unwrap();
    assert_eq!(content_of(&first, 1), content_of(&second, 1));
}
