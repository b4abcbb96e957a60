//! PDF Document wrapper

use crate::image::{
    calculate_scaled_dimensions, generate_image_operators, ImageScaleMode, ImageXObject,
};
use crate::metrics::{win_ansi_hex, StandardFont};
use crate::text::{generate_text_operators, TextRenderContext};
use crate::units::PageSize;
use crate::{Align, PdfError, Result};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Parent chain depth limit when resolving inherited page attributes
const MAX_INHERITANCE_DEPTH: usize = 32;

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create color from RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Black color
    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// Visible page box in PDF user space
#[derive(Debug, Clone, Copy, PartialEq)]
struct PageBox {
    left: f64,
    bottom: f64,
    right: f64,
    top: f64,
}

impl PageBox {
    fn size(&self) -> PageSize {
        PageSize::new(self.right - self.left, self.top - self.bottom)
    }
}

/// An image already added to the document
#[derive(Debug, Clone, Copy)]
struct EmbeddedImage {
    id: ObjectId,
    width: u32,
    height: u32,
}

/// PDF document with an overlay layer
///
/// Every page of the source keeps its original content, wrapped in its own
/// graphics state so that whatever it leaves on the stack cannot shift the
/// overlay. Text and images are buffered per page and written on save.
#[derive(Debug)]
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
    /// Current font
    current_font: StandardFont,
    /// Current font size in points
    current_font_size: f64,
    /// Current text color
    current_text_color: Color,
    /// Standard font dictionaries added so far
    font_objects: HashMap<StandardFont, ObjectId>,
    /// Fonts used per page (page number -> resource name -> font)
    page_fonts: BTreeMap<usize, BTreeMap<String, StandardFont>>,
    /// Embedded images (data hash -> image)
    embedded_images: HashMap<u64, EmbeddedImage>,
    /// Images used per page (page number -> resource name -> object ID)
    page_images: BTreeMap<usize, BTreeMap<String, ObjectId>>,
    /// Next image resource number
    next_image_resource: u32,
    /// Buffered overlay operators per page
    page_content_buffer: BTreeMap<usize, Vec<u8>>,
}

impl PdfDocument {
    fn wrap(inner: Document) -> Result<Self> {
        if inner.is_encrypted() {
            return Err(PdfError::OpenError("document is encrypted".to_string()));
        }
        if inner.get_pages().is_empty() {
            return Err(PdfError::OpenError("document has no pages".to_string()));
        }

        Ok(Self {
            inner,
            current_font: StandardFont::default(),
            current_font_size: 10.0,
            current_text_color: Color::default(),
            font_objects: HashMap::new(),
            page_fonts: BTreeMap::new(),
            embedded_images: HashMap::new(),
            page_images: BTreeMap::new(),
            next_image_resource: 1,
            page_content_buffer: BTreeMap::new(),
        })
    }

    /// Open a PDF document from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let inner = Document::load(path).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Self::wrap(inner)
    }

    /// Open a PDF document from bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Self::wrap(inner)
    }

    /// Create a new document with a single blank page
    pub fn new_blank(size: PageSize) -> Result<Self> {
        let mut inner = Document::with_version("1.5");
        let pages_id = inner.new_object_id();
        inner.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0,
            }),
        );
        let catalog_id = inner.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        inner.trailer.set("Root", catalog_id);

        append_page(&mut inner, pages_id, size)?;
        Self::wrap(inner)
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Add a blank page at the end of the document
    ///
    /// # Returns
    /// New page number (1-indexed)
    pub fn add_blank_page(&mut self, size: PageSize) -> Result<usize> {
        let pages_id = self
            .inner
            .catalog()?
            .get(b"Pages")?
            .as_reference()?;
        append_page(&mut self.inner, pages_id, size)?;
        Ok(self.page_count())
    }

    /// Size of a page's visible box (CropBox, else MediaBox)
    pub fn page_size(&self, page: usize) -> Result<PageSize> {
        Ok(self.page_box(page)?.size())
    }

    /// Sizes of all pages, in page order
    pub fn page_sizes(&self) -> Result<Vec<PageSize>> {
        (1..=self.page_count()).map(|p| self.page_size(p)).collect()
    }

    /// Set the current font and size
    pub fn set_font(&mut self, font: StandardFont, size: f64) {
        self.current_font = font;
        self.current_font_size = size;
    }

    /// Set the text color
    pub fn set_text_color(&mut self, color: Color) {
        self.current_text_color = color;
    }

    /// Width of `text` in points with the current font
    pub fn get_text_width(&self, text: &str) -> f64 {
        self.current_font.text_width(text, self.current_font_size)
    }

    /// Insert text at a specific position
    ///
    /// # Arguments
    /// * `text` - Text to insert
    /// * `page` - Page number (1-indexed)
    /// * `x` - X coordinate in points, from the left edge of the page box
    /// * `y` - Baseline Y coordinate in points, from the top of the page box
    /// * `align` - Where `x` sits relative to the text
    pub fn insert_text(
        &mut self,
        text: &str,
        page: usize,
        x: f64,
        y: f64,
        align: Align,
    ) -> Result<()> {
        self.check_page(page)?;

        if text.is_empty() {
            return Ok(());
        }

        let page_box = self.page_box(page)?;
        let width = self.get_text_width(text);
        let start_x = match align {
            Align::Left => x,
            Align::Center => x - width / 2.0,
            Align::Right => x - width,
        };

        let font_name = self.font_resource(page, self.current_font);
        let ctx = TextRenderContext {
            font_name,
            font_size: self.current_font_size,
            color: self.current_text_color,
        };

        let operators = generate_text_operators(
            &win_ansi_hex(text),
            page_box.left + start_x,
            page_box.top - y,
            &ctx,
        );
        self.buffer_content(page, &operators);

        Ok(())
    }

    /// Insert an image stretched to a box
    ///
    /// # Arguments
    /// * `data` - Image file bytes (JPEG or PNG)
    /// * `page` - Page number (1-indexed)
    /// * `x` - X coordinate in points
    /// * `y` - Y coordinate of the top edge in points (from top)
    /// * `width` - Image width in points
    /// * `height` - Image height in points
    pub fn insert_image(
        &mut self,
        data: &[u8],
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<()> {
        self.insert_image_scaled(data, page, x, y, width, height, ImageScaleMode::Stretch)
    }

    /// Insert an image with scaling mode
    #[allow(clippy::too_many_arguments)]
    pub fn insert_image_scaled(
        &mut self,
        data: &[u8],
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        mode: ImageScaleMode,
    ) -> Result<()> {
        self.check_page(page)?;

        let image = self.embed_image(data)?;
        let resource_name = self.image_resource(page, image.id);

        let (actual_width, actual_height) =
            calculate_scaled_dimensions(image.width, image.height, width, height, mode);

        let page_box = self.page_box(page)?;
        let pdf_y = page_box.top - y - actual_height;

        let operators = generate_image_operators(
            &resource_name,
            page_box.left + x,
            pdf_y,
            actual_width,
            actual_height,
        );
        self.buffer_content(page, &operators);

        Ok(())
    }

    /// Save the document to a file
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.finalize()?;
        self.inner
            .save(path)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(())
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.finalize()?;
        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(buffer)
    }

    /// Decoded content of a page, including anything already written by save
    pub fn page_content(&self, page: usize) -> Result<Vec<u8>> {
        let page_id = self.page_id(page)?;
        Ok(self.inner.get_page_content(page_id)?)
    }

    /// Write buffered fonts, images and operators into the page tree
    fn finalize(&mut self) -> Result<()> {
        let page_fonts = std::mem::take(&mut self.page_fonts);
        for (page, fonts) in page_fonts {
            let mut entries = Vec::with_capacity(fonts.len());
            for (name, font) in fonts {
                entries.push((name, self.font_object(font)));
            }
            self.add_page_resources(page, b"Font", &entries)?;
        }

        let page_images = std::mem::take(&mut self.page_images);
        for (page, images) in page_images {
            let entries: Vec<(String, ObjectId)> = images.into_iter().collect();
            self.add_page_resources(page, b"XObject", &entries)?;
        }

        let buffers = std::mem::take(&mut self.page_content_buffer);
        for (page, content) in buffers {
            if !content.is_empty() {
                self.append_overlay(page, &content)?;
            }
        }

        Ok(())
    }

    fn check_page(&self, page: usize) -> Result<()> {
        let page_count = self.page_count();
        if page == 0 || page > page_count {
            return Err(PdfError::InvalidPage(page, page_count));
        }
        Ok(())
    }

    fn page_id(&self, page: usize) -> Result<ObjectId> {
        let pages = self.inner.get_pages();
        pages
            .get(&(page as u32))
            .copied()
            .ok_or(PdfError::InvalidPage(page, pages.len()))
    }

    /// Follow a reference to the object it points at
    fn resolve<'a>(&'a self, object: &'a Object) -> Result<&'a Object> {
        match object {
            Object::Reference(id) => Ok(self.inner.get_object(*id)?),
            other => Ok(other),
        }
    }

    /// Look up a page attribute, following the Parent chain for inheritable keys
    fn inherited_attribute(&self, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>> {
        let mut current_id = page_id;

        for _ in 0..MAX_INHERITANCE_DEPTH {
            let dict = self.inner.get_object(current_id)?.as_dict()?;

            if let Ok(value) = dict.get(key) {
                return Ok(Some(self.resolve(value)?.clone()));
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => current_id = *parent_id,
                _ => break,
            }
        }

        Ok(None)
    }

    fn page_box(&self, page: usize) -> Result<PageBox> {
        let page_id = self.page_id(page)?;

        let boxed = match self.inherited_attribute(page_id, b"CropBox")? {
            Some(crop) => Some(crop),
            None => self.inherited_attribute(page_id, b"MediaBox")?,
        };

        let Some(Object::Array(values)) = boxed else {
            // Missing box: assume A4 like most viewers do
            return Ok(PageBox {
                left: 0.0,
                bottom: 0.0,
                right: PageSize::A4.width,
                top: PageSize::A4.height,
            });
        };

        if values.len() < 4 {
            return Err(PdfError::ParseError("Invalid page box".to_string()));
        }

        let mut coords = [0.0f64; 4];
        for (slot, value) in coords.iter_mut().zip(values.iter()) {
            *slot = as_number(self.resolve(value)?)
                .ok_or_else(|| PdfError::ParseError("Invalid page box value".to_string()))?;
        }

        Ok(PageBox {
            left: coords[0].min(coords[2]),
            bottom: coords[1].min(coords[3]),
            right: coords[0].max(coords[2]),
            top: coords[1].max(coords[3]),
        })
    }

    fn buffer_content(&mut self, page: usize, content: &[u8]) {
        self.page_content_buffer
            .entry(page)
            .or_default()
            .extend_from_slice(content);
    }

    /// Resource name for a font on a page
    fn font_resource(&mut self, page: usize, font: StandardFont) -> String {
        let name = match font {
            StandardFont::Helvetica => "DfHelv",
            StandardFont::HelveticaBold => "DfHelvB",
        };
        self.page_fonts
            .entry(page)
            .or_default()
            .insert(name.to_string(), font);
        name.to_string()
    }

    fn font_object(&mut self, font: StandardFont) -> ObjectId {
        if let Some(id) = self.font_objects.get(&font) {
            return *id;
        }
        let id = self.inner.add_object(font.to_pdf_dictionary());
        self.font_objects.insert(font, id);
        id
    }

    /// Add image data to the document once, deduplicated by content hash
    fn embed_image(&mut self, data: &[u8]) -> Result<EmbeddedImage> {
        let mut hasher = DefaultHasher::new();
        data.hash(&mut hasher);
        let data_hash = hasher.finish();

        if let Some(image) = self.embedded_images.get(&data_hash) {
            return Ok(*image);
        }

        let xobject = ImageXObject::from_bytes(data)?;
        let smask = xobject.smask_stream().map(|s| self.inner.add_object(s));
        let id = self.inner.add_object(xobject.to_pdf_stream(smask));

        let image = EmbeddedImage {
            id,
            width: xobject.width,
            height: xobject.height,
        };
        self.embedded_images.insert(data_hash, image);
        Ok(image)
    }

    /// Resource name for an image on a page
    fn image_resource(&mut self, page: usize, object_id: ObjectId) -> String {
        let page_resources = self.page_images.entry(page).or_default();

        if let Some((name, _)) = page_resources.iter().find(|(_, id)| **id == object_id) {
            return name.clone();
        }

        let name = format!("DfIm{}", self.next_image_resource);
        self.next_image_resource += 1;
        page_resources.insert(name.clone(), object_id);
        name
    }

    /// Merge entries into one category (Font, XObject) of a page's resources
    ///
    /// Inherited or indirect resource dictionaries are copied onto the page so
    /// the original entries stay visible.
    fn add_page_resources(
        &mut self,
        page: usize,
        category: &[u8],
        entries: &[(String, ObjectId)],
    ) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let page_id = self.page_id(page)?;

        let mut resources = match self.inherited_attribute(page_id, b"Resources")? {
            Some(Object::Dictionary(dict)) => dict,
            _ => Dictionary::new(),
        };

        let mut category_dict = match resources.get(category) {
            Ok(object) => self
                .resolve(object)?
                .as_dict()
                .cloned()
                .unwrap_or_else(|_| Dictionary::new()),
            Err(_) => Dictionary::new(),
        };

        for (name, id) in entries {
            category_dict.set(name.as_bytes().to_vec(), Object::Reference(*id));
        }
        resources.set(category.to_vec(), Object::Dictionary(category_dict));

        self.inner
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Resources", Object::Dictionary(resources));

        Ok(())
    }

    /// Wrap the page's original content in q/Q and append the overlay
    fn append_overlay(&mut self, page: usize, overlay: &[u8]) -> Result<()> {
        let page_id = self.page_id(page)?;

        let (mut existing, inline_stream) = {
            let dict = self.inner.get_object(page_id)?.as_dict()?;
            match dict.get(b"Contents") {
                Ok(Object::Reference(id)) => match self.inner.get_object(*id) {
                    Ok(Object::Array(items)) => (items.clone(), None),
                    _ => (vec![Object::Reference(*id)], None),
                },
                Ok(Object::Array(items)) => (items.clone(), None),
                Ok(Object::Stream(stream)) => (Vec::new(), Some(stream.clone())),
                _ => (Vec::new(), None),
            }
        };

        if let Some(stream) = inline_stream {
            existing.push(Object::Reference(self.inner.add_object(stream)));
        }

        let mut contents = Vec::with_capacity(existing.len() + 2);
        if existing.is_empty() {
            let overlay_id = self
                .inner
                .add_object(Stream::new(Dictionary::new(), overlay.to_vec()));
            contents.push(Object::Reference(overlay_id));
        } else {
            let open_id = self
                .inner
                .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            let mut close = b"\nQ\n".to_vec();
            close.extend_from_slice(overlay);
            let close_id = self.inner.add_object(Stream::new(Dictionary::new(), close));

            contents.push(Object::Reference(open_id));
            contents.extend(existing);
            contents.push(Object::Reference(close_id));
        }

        self.inner
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Contents", Object::Array(contents));

        Ok(())
    }
}

/// Append an empty page of `size` to the Pages node `pages_id`
fn append_page(doc: &mut Document, pages_id: ObjectId, size: PageSize) -> Result<ObjectId> {
    let contents_id = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(size.width as _),
            Object::Real(size.height as _),
        ],
        "Resources" => Dictionary::new(),
        "Contents" => contents_id,
    });

    let pages = doc.get_object_mut(pages_id)?.as_dict_mut()?;
    let mut kids = match pages.get(b"Kids") {
        Ok(Object::Array(kids)) => kids.clone(),
        _ => Vec::new(),
    };
    kids.push(Object::Reference(page_id));
    let count = kids.len() as i64;
    pages.set("Kids", Object::Array(kids));
    pages.set("Count", count);

    Ok(page_id)
}

fn as_number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_blank_has_one_a4_page() {
        let doc = PdfDocument::new_blank(PageSize::A4).unwrap();
        assert_eq!(doc.page_count(), 1);
        let size = doc.page_size(1).unwrap();
        assert!((size.width - 595.28).abs() < 0.01);
        assert!((size.height - 841.89).abs() < 0.01);
    }

    #[test]
    fn test_add_blank_page() {
        let mut doc = PdfDocument::new_blank(PageSize::A4).unwrap();
        let landscape = PageSize::new(841.89, 595.28);
        assert_eq!(doc.add_blank_page(landscape).unwrap(), 2);
        assert_eq!(doc.page_count(), 2);
        assert!(doc.page_size(2).unwrap().is_landscape());
    }

    #[test]
    fn test_insert_text_invalid_page() {
        let mut doc = PdfDocument::new_blank(PageSize::A4).unwrap();
        let err = doc.insert_text("x", 2, 10.0, 10.0, Align::Left).unwrap_err();
        assert!(matches!(err, PdfError::InvalidPage(2, 1)));
        assert!(doc.insert_text("x", 0, 10.0, 10.0, Align::Left).is_err());
    }

    #[test]
    fn test_insert_text_converts_to_bottom_origin() {
        let mut doc = PdfDocument::new_blank(PageSize::new(200.0, 300.0)).unwrap();
        doc.set_font(StandardFont::Helvetica, 10.0);
        doc.insert_text("Hi", 1, 20.0, 50.0, Align::Left).unwrap();

        let bytes = doc.to_bytes().unwrap();
        let reloaded = PdfDocument::open_from_bytes(&bytes).unwrap();
        let content = String::from_utf8_lossy(&reloaded.page_content(1).unwrap()).to_string();

        assert!(content.contains("/DfHelv 10 Tf"));
        assert!(content.contains("20 250 Td"));
        assert!(content.contains("<4869> Tj"));
    }

    #[test]
    fn test_insert_text_alignment() {
        let mut doc = PdfDocument::new_blank(PageSize::new(200.0, 300.0)).unwrap();
        doc.set_font(StandardFont::Helvetica, 10.0);
        // "Hi" = (722 + 222) / 1000 * 10 = 9.44pt
        doc.insert_text("Hi", 1, 100.0, 0.0, Align::Right).unwrap();

        let bytes = doc.to_bytes().unwrap();
        let reloaded = PdfDocument::open_from_bytes(&bytes).unwrap();
        let content = String::from_utf8_lossy(&reloaded.page_content(1).unwrap()).to_string();
        assert!(content.contains("90.56 300 Td"));
    }

    #[test]
    fn test_empty_text_is_noop() {
        let mut doc = PdfDocument::new_blank(PageSize::A4).unwrap();
        doc.insert_text("", 1, 10.0, 10.0, Align::Left).unwrap();
        assert!(doc.page_content_buffer.is_empty());
    }

    #[test]
    fn test_open_garbage_fails() {
        let err = PdfDocument::open_from_bytes(b"not a pdf at all").unwrap_err();
        assert!(matches!(err, PdfError::OpenError(_)));
    }

    #[test]
    fn test_as_number() {
        assert_eq!(as_number(&Object::Integer(3)), Some(3.0));
        assert_eq!(as_number(&Object::Real(1.5)), Some(1.5));
        assert_eq!(as_number(&Object::Null), None);
    }
}
