//! Unit conversion between editor pixels, millimetres and PDF points
//!
//! The editor renders each page at a fixed zoom (pixels per point) and
//! reports clicks in pixels. Field positions are stored in millimetres with a
//! top-left origin. Drawing happens in PDF points.

/// Millimetres per inch
pub const MM_PER_INCH: f64 = 25.4;

/// PDF points per inch
pub const POINTS_PER_INCH: f64 = 72.0;

/// Millimetres in one PDF point (25.4 / 72)
pub const MM_PER_POINT: f64 = MM_PER_INCH / POINTS_PER_INCH;

/// Default editor zoom: pixels rendered per PDF point
pub const DEFAULT_EDITOR_ZOOM: f64 = 1.5;

/// Convert PDF points to millimetres
pub fn pt_to_mm(pt: f64) -> f64 {
    pt * MM_PER_POINT
}

/// Convert millimetres to PDF points
pub fn mm_to_pt(mm: f64) -> f64 {
    mm / MM_PER_POINT
}

/// Convert editor pixels to millimetres at the given zoom
pub fn px_to_mm(px: f64, zoom: f64) -> f64 {
    pt_to_mm(px / sanitize_zoom(zoom))
}

/// Convert millimetres to editor pixels at the given zoom
pub fn mm_to_px(mm: f64, zoom: f64) -> f64 {
    mm_to_pt(mm) * sanitize_zoom(zoom)
}

/// Round to one decimal place, the precision field positions are stored at
pub fn round_mm(mm: f64) -> f64 {
    (mm * 10.0).round() / 10.0
}

fn sanitize_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() && zoom > 0.0 {
        zoom
    } else {
        DEFAULT_EDITOR_ZOOM
    }
}

/// Page size in PDF points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    /// Width in points
    pub width: f64,
    /// Height in points
    pub height: f64,
}

impl PageSize {
    /// A4 portrait (595.28 x 841.89 pt)
    pub const A4: PageSize = PageSize {
        width: 595.28,
        height: 841.89,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Width in millimetres
    pub fn width_mm(&self) -> f64 {
        pt_to_mm(self.width)
    }

    /// Height in millimetres
    pub fn height_mm(&self) -> f64 {
        pt_to_mm(self.height)
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }

    /// Clamp a top-left origin point (in points) into the page box
    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (clamp_to(x, self.width), clamp_to(y, self.height))
    }
}

fn clamp_to(value: f64, max: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.max(0.0).min(max.max(0.0))
}
