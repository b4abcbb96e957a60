//! Field layout: millimetre placements to drawn lines in points
//!
//! The editor reports the click point as the top of the capital letters. The
//! renderer draws from the baseline, so the first baseline sits one cap
//! height below the stored y.

use crate::schema::{FieldPlacement, TextAlign};
use pdf_core::units::{mm_to_pt, px_to_mm, round_mm};
use pdf_core::{calculate_x_offset, wrap_text, PageSize, StandardFont, CAP_HEIGHT};

/// Line height as a multiple of the font size
pub const LINE_HEIGHT_RATIO: f64 = 1.2;

/// One line of text ready to draw
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    /// Left edge in points from the page's left side
    pub x: f64,
    /// Baseline in points from the page's top
    pub baseline: f64,
}

/// Convert an editor click in pixels to a stored position in millimetres
pub fn editor_position_to_mm(px: f64, py: f64, zoom: f64) -> (f64, f64) {
    (round_mm(px_to_mm(px, zoom)), round_mm(px_to_mm(py, zoom)))
}

/// Anchor of a placement in points, clamped into the page box
pub fn anchor_point(placement: &FieldPlacement, page: PageSize) -> (f64, f64) {
    page.clamp(mm_to_pt(placement.x), mm_to_pt(placement.y))
}

/// Lay out `value` for `placement` on a page of `page` size
///
/// The box is the configured width or, without one, the text itself; it is
/// positioned left of, around or right of the anchor and kept inside the
/// page when it fits. The first baseline never falls below the page bottom.
/// Wrapped lines past the page bottom are dropped; the first line is always
/// kept.
pub fn layout_field(placement: &FieldPlacement, value: &str, page: PageSize) -> Vec<PlacedLine> {
    let font = StandardFont::from_bold(placement.bold);
    let size = placement.font_size;
    let (anchor_x, anchor_y) = anchor_point(placement, page);

    let box_width = placement
        .width
        .filter(|w| *w > 0.0)
        .map(mm_to_pt);

    let lines = match box_width {
        Some(width) if placement.wrap => wrap_text(value, font, size, width),
        _ => vec![value.replace(['\r', '\n'], " ")],
    };

    let cap_height = size * CAP_HEIGHT / 1000.0;
    let first_baseline = (anchor_y + cap_height).min(page.height);
    let line_height = size * LINE_HEIGHT_RATIO;

    let mut placed = Vec::with_capacity(lines.len());
    for (index, text) in lines.into_iter().enumerate() {
        let baseline = first_baseline + index as f64 * line_height;
        if index > 0 && baseline > page.height {
            break;
        }

        let text_width = font.text_width(&text, size);
        let container = box_width.unwrap_or(text_width);
        let box_start = match placement.align {
            TextAlign::Left => anchor_x,
            TextAlign::Center => anchor_x - container / 2.0,
            TextAlign::Right => anchor_x - container,
        }
        .min((page.width - container).max(0.0))
        .max(0.0);
        let x = box_start + calculate_x_offset(text_width, container, placement.align.into());

        placed.push(PlacedLine { text, x, baseline });
    }

    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_core::units::pt_to_mm;
    use pretty_assertions::assert_eq;

    const PAGE: PageSize = PageSize::A4;

    fn field(x: f64, y: f64) -> FieldPlacement {
        FieldPlacement::at(x, y, 1)
    }

    #[test]
    fn test_editor_round_trip_within_tenth_mm() {
        for (px, py) in [(0.0, 0.0), (150.0, 300.0), (333.3, 777.7), (892.9, 1262.8)] {
            let (x_mm, y_mm) = editor_position_to_mm(px, py, 1.5);
            let placement = field(x_mm, y_mm);
            let (x_pt, y_pt) = anchor_point(&placement, PAGE);

            assert!((pt_to_mm(x_pt) - pt_to_mm(px / 1.5)).abs() <= 0.1);
            assert!((pt_to_mm(y_pt) - pt_to_mm(py / 1.5)).abs() <= 0.1);
        }
    }

    #[test]
    fn test_left_aligned_single_line() {
        let lines = layout_field(&field(25.4, 25.4), "Hello", PAGE);
        assert_eq!(lines.len(), 1);
        assert!((lines[0].x - 72.0).abs() < 1e-9);
        // 72 + 10 * 0.718
        assert!((lines[0].baseline - 79.18).abs() < 1e-9);
    }

    #[test]
    fn test_center_without_width_centers_on_anchor() {
        let mut placement = field(25.4, 25.4);
        placement.align = TextAlign::Center;
        let lines = layout_field(&placement, "Hello", PAGE);
        // "Hello" is 22.78pt wide at 10pt
        assert!((lines[0].x - (72.0 - 11.39)).abs() < 1e-9);
    }

    #[test]
    fn test_right_with_width_ends_at_anchor() {
        let mut placement = field(50.8, 10.0);
        placement.align = TextAlign::Right;
        placement.width = Some(25.4);
        let lines = layout_field(&placement, "Hello", PAGE);
        // box 72pt wide ending at 144pt, text right-aligned inside it
        assert!((lines[0].x - (144.0 - 22.78)).abs() < 1e-9);
    }

    #[test]
    fn test_start_clamped_to_page_left() {
        let mut placement = field(0.0, 0.0);
        placement.align = TextAlign::Right;
        let lines = layout_field(&placement, "Hello", PAGE);
        assert_eq!(lines[0].x, 0.0);
        assert!(lines[0].baseline > 0.0);
    }

    #[test]
    fn test_far_corner_stays_on_page() {
        let font = StandardFont::Helvetica;
        for (x, y) in [(1000.0, 1000.0), (PAGE.width_mm(), PAGE.height_mm())] {
            let lines = layout_field(&field(x, y), "X", PAGE);
            assert_eq!(lines.len(), 1);

            let line = &lines[0];
            let pdf_y = PAGE.height - line.baseline;
            assert!(pdf_y >= 0.0, "baseline below the page: {pdf_y}");
            assert!(line.x >= 0.0);
            assert!(line.x + font.text_width("X", 10.0) <= PAGE.width + 1e-9);
        }
    }

    #[test]
    fn test_bottom_edge_wrap_keeps_only_first_line() {
        let mut placement = field(10.0, PAGE.height_mm());
        placement.wrap = true;
        placement.width = Some(10.0);
        let lines = layout_field(&placement, "a b c d", PAGE);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].baseline, PAGE.height);
    }

    #[test]
    fn test_wide_text_at_right_edge_shifts_left() {
        let mut placement = field(200.0, 20.0);
        placement.width = Some(40.0);
        let lines = layout_field(&placement, "Total", PAGE);
        assert!((lines[0].x - (PAGE.width - mm_to_pt(40.0))).abs() < 1e-9);
    }

    #[test]
    fn test_wrap_uses_line_height() {
        let mut placement = field(10.0, 10.0);
        placement.wrap = true;
        placement.width = Some(20.0);
        let lines = layout_field(&placement, "one two three four five six", PAGE);

        assert!(lines.len() > 1);
        for pair in lines.windows(2) {
            assert!((pair[1].baseline - pair[0].baseline - 12.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_wrap_drops_lines_below_page() {
        let mut placement = field(10.0, 290.0);
        placement.wrap = true;
        placement.width = Some(10.0);
        let lines = layout_field(&placement, "a b c d e f g h i j k l", PAGE);

        assert!(lines[0].baseline <= PAGE.height);
        for line in &lines[1..] {
            assert!(line.baseline <= PAGE.height);
        }
        assert!(lines.len() < 12);
    }

    #[test]
    fn test_no_wrap_flattens_newlines() {
        let lines = layout_field(&field(10.0, 10.0), "a\nb", PAGE);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "a b");
    }

    #[test]
    fn test_layout_is_deterministic() {
        let mut placement = field(33.3, 44.4);
        placement.wrap = true;
        placement.width = Some(30.0);
        placement.align = TextAlign::Center;
        let a = layout_field(&placement, "Same value every time", PAGE);
        let b = layout_field(&placement, "Same value every time", PAGE);
        assert_eq!(a, b);
    }
}
