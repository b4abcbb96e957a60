//! Field map and image overlay types

use crate::{Result, TemplateError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// RGB Color for text
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Color {
    /// Red component (0.0 - 1.0)
    pub r: f64,
    /// Green component (0.0 - 1.0)
    pub g: f64,
    /// Blue component (0.0 - 1.0)
    pub b: f64,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Create color from RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
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

impl From<Color> for pdf_core::Color {
    fn from(c: Color) -> Self {
        let channel = |v: f64| v.clamp(0.0, 1.0) as f32;
        pdf_core::Color::rgb(channel(c.r), channel(c.g), channel(c.b))
    }
}

/// Text alignment relative to the field anchor
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl From<TextAlign> for pdf_core::Align {
    fn from(align: TextAlign) -> Self {
        match align {
            TextAlign::Left => pdf_core::Align::Left,
            TextAlign::Center => pdf_core::Align::Center,
            TextAlign::Right => pdf_core::Align::Right,
        }
    }
}

fn default_page() -> usize {
    1
}

fn default_font_size() -> f64 {
    10.0
}

/// Where and how one record value is drawn
///
/// Coordinates are millimetres from the top-left corner of the page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldPlacement {
    pub x: f64,
    pub y: f64,

    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: usize,

    /// Font size in points
    #[serde(default = "default_font_size")]
    pub font_size: f64,

    /// Box width in mm; the text's own width when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,

    #[serde(default)]
    pub wrap: bool,

    #[serde(default)]
    pub align: TextAlign,

    #[serde(default)]
    pub bold: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl FieldPlacement {
    /// Left-aligned 10pt field on `page`
    pub fn at(x: f64, y: f64, page: usize) -> Self {
        Self {
            x,
            y,
            page,
            font_size: default_font_size(),
            width: None,
            wrap: false,
            align: TextAlign::Left,
            bold: false,
            color: None,
        }
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(TemplateError::ValidationError(format!(
                "field '{name}': position must be a finite number"
            )));
        }
        if self.page == 0 {
            return Err(TemplateError::ValidationError(format!(
                "field '{name}': page numbers start at 1"
            )));
        }
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(TemplateError::ValidationError(format!(
                "field '{name}': font_size must be positive"
            )));
        }
        if let Some(width) = self.width {
            if !(width.is_finite() && width >= 0.0) {
                return Err(TemplateError::ValidationError(format!(
                    "field '{name}': width must not be negative"
                )));
            }
        }
        Ok(())
    }
}

/// Field name to placement, kept in name order
pub type FieldMap = BTreeMap<String, FieldPlacement>;

/// Validate every placement in a field map
pub fn validate_field_map(fields: &FieldMap) -> Result<()> {
    for (name, placement) in fields {
        if name.trim().is_empty() {
            return Err(TemplateError::ValidationError(
                "field names must not be empty".to_string(),
            ));
        }
        placement.validate(name)?;
    }
    Ok(())
}

/// Records an overlay applies to (1-indexed, inclusive)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordRange {
    pub from: usize,
    pub to: usize,
}

impl RecordRange {
    pub fn contains(&self, record_number: usize) -> bool {
        (self.from..=self.to).contains(&record_number)
    }
}

/// A picture (logo, signature, stamp) drawn on top of the page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageOverlay {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,

    #[serde(default = "default_page")]
    pub page: usize,

    /// Base64 PNG or JPEG, raw or as a `data:` URL
    pub data: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_range: Option<RecordRange>,
}

impl ImageOverlay {
    /// Whether the overlay is drawn for the given record number
    pub fn applies_to(&self, record_number: usize) -> bool {
        self.record_range
            .map_or(true, |range| range.contains(record_number))
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| {
            Err(TemplateError::ValidationError(format!(
                "image '{}': {msg}",
                self.id
            )))
        };

        if self.id.trim().is_empty() {
            return Err(TemplateError::ValidationError(
                "image overlays need an id".to_string(),
            ));
        }
        if !self.x.is_finite() || !self.y.is_finite() {
            return invalid("position must be a finite number");
        }
        if !(self.width > 0.0 && self.height > 0.0) {
            return invalid("width and height must be positive");
        }
        if self.page == 0 {
            return invalid("page numbers start at 1");
        }
        if self.data.trim().is_empty() {
            return invalid("image data is empty");
        }
        if let Some(range) = self.record_range {
            if range.from == 0 || range.from > range.to {
                return invalid("record range must satisfy 1 <= from <= to");
            }
        }
        Ok(())
    }
}

/// Validate a list of image overlays, including id uniqueness
pub fn validate_images(images: &[ImageOverlay]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for image in images {
        image.validate()?;
        if !seen.insert(image.id.as_str()) {
            return Err(TemplateError::ValidationError(format!(
                "duplicate image id '{}'",
                image.id
            )));
        }
    }
    Ok(())
}

/// Everything drawn on top of a template PDF
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OverlaySpec {
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub images: Vec<ImageOverlay>,
}

impl OverlaySpec {
    pub fn new(fields: FieldMap, images: Vec<ImageOverlay>) -> Self {
        Self { fields, images }
    }

    pub fn validate(&self) -> Result<()> {
        validate_field_map(&self.fields)?;
        validate_images(&self.images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_field_defaults() {
        let placement: FieldPlacement = serde_json::from_value(json!({ "x": 12.5, "y": 40 })).unwrap();
        assert_eq!(placement, FieldPlacement::at(12.5, 40.0, 1));
        assert_eq!(placement.font_size, 10.0);
        assert_eq!(placement.align, TextAlign::Left);
    }

    #[test]
    fn test_field_full() {
        let placement: FieldPlacement = serde_json::from_value(json!({
            "x": 10, "y": 20, "page": 2, "font_size": 12,
            "width": 50, "wrap": true, "align": "center", "bold": true,
            "color": { "r": 1.0, "g": 0.0, "b": 0.0 }
        }))
        .unwrap();
        assert_eq!(placement.page, 2);
        assert_eq!(placement.width, Some(50.0));
        assert!(placement.wrap && placement.bold);
        assert_eq!(placement.align, TextAlign::Center);
        assert_eq!(placement.color, Some(Color::from_rgb(255, 0, 0)));
    }

    #[test]
    fn test_unknown_align_rejected() {
        let result: std::result::Result<FieldPlacement, _> =
            serde_json::from_value(json!({ "x": 1, "y": 1, "align": "justify" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_field_validation() {
        let mut placement = FieldPlacement::at(1.0, 1.0, 1);
        assert!(placement.validate("a").is_ok());

        placement.page = 0;
        assert!(placement.validate("a").is_err());

        placement.page = 1;
        placement.font_size = 0.0;
        assert!(placement.validate("a").is_err());

        placement.font_size = 10.0;
        placement.width = Some(-1.0);
        assert!(placement.validate("a").is_err());
    }

    #[test]
    fn test_empty_field_name_rejected() {
        let mut fields = FieldMap::new();
        fields.insert(" ".to_string(), FieldPlacement::at(1.0, 1.0, 1));
        assert!(validate_field_map(&fields).is_err());
    }

    #[test]
    fn test_record_range() {
        let range = RecordRange { from: 2, to: 4 };
        assert!(!range.contains(1));
        assert!(range.contains(2));
        assert!(range.contains(4));
        assert!(!range.contains(5));
    }

    fn image(id: &str) -> ImageOverlay {
        ImageOverlay {
            id: id.to_string(),
            x: 10.0,
            y: 10.0,
            width: 30.0,
            height: 15.0,
            page: 1,
            data: "iVBORw0KGgo=".to_string(),
            record_range: None,
        }
    }

    #[test]
    fn test_image_applies_to() {
        let mut overlay = image("sig");
        assert!(overlay.applies_to(1000));

        overlay.record_range = Some(RecordRange { from: 1, to: 1 });
        assert!(overlay.applies_to(1));
        assert!(!overlay.applies_to(2));
    }

    #[test]
    fn test_image_validation() {
        assert!(validate_images(&[image("a"), image("b")]).is_ok());
        assert!(validate_images(&[image("a"), image("a")]).is_err());

        let mut bad = image("c");
        bad.record_range = Some(RecordRange { from: 3, to: 2 });
        assert!(bad.validate().is_err());

        let mut flat = image("d");
        flat.height = 0.0;
        assert!(flat.validate().is_err());
    }

    #[test]
    fn test_color_conversion_clamps() {
        let color: pdf_core::Color = Color::rgb(1.5, -0.2, 0.5).into();
        assert_eq!(color, pdf_core::Color::rgb(1.0, 0.0, 0.5));
    }
}
