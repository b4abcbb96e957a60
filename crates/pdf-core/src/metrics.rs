//! Standard Type1 font metrics and WinAnsi encoding
//!
//! Overlay text is drawn with the base-14 Helvetica family, which every PDF
//! viewer provides, so nothing has to be embedded. Widths come from the
//! Adobe AFM files, in 1/1000 of the font size.

use lopdf::{dictionary, Dictionary};

/// Helvetica advance widths for U+0020..=U+007E
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, // space ! " # $ % & '
    333, 333, 389, 584, 278, 333, 278, 278, // ( ) * + , - . /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // : ; < = > ? @
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    278, 278, 278, 469, 556, 333, // [ \ ] ^ _ `
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
    334, 260, 334, 584, // { | } ~
];

/// Helvetica-Bold advance widths for U+0020..=U+007E
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, // space ! " # $ % & '
    333, 333, 389, 584, 278, 333, 278, 278, // ( ) * + , - . /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    333, 333, 584, 584, 584, 611, 975, // : ; < = > ? @
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    333, 278, 333, 584, 556, 333, // [ \ ] ^ _ `
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // a-m
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // n-z
    389, 280, 389, 584, // { | } ~
];

/// Cap height of Helvetica in 1/1000 of the font size
pub const CAP_HEIGHT: f64 = 718.0;

/// Base-14 fonts used for overlay text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StandardFont {
    #[default]
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    /// Pick the regular or bold face
    pub fn from_bold(bold: bool) -> Self {
        if bold {
            StandardFont::HelveticaBold
        } else {
            StandardFont::Helvetica
        }
    }

    /// PostScript name used as /BaseFont
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    fn widths(&self) -> &'static [u16; 95] {
        match self {
            StandardFont::Helvetica => &HELVETICA_WIDTHS,
            StandardFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        }
    }

    fn default_width(&self) -> u16 {
        match self {
            StandardFont::Helvetica => 556,
            StandardFont::HelveticaBold => 611,
        }
    }

    /// Advance width of a character in 1/1000 units
    pub fn char_width(&self, ch: char) -> u16 {
        let code = ch as u32;
        if (0x20..=0x7E).contains(&code) {
            self.widths()[(code - 0x20) as usize]
        } else if ch == '\u{00A0}' {
            self.widths()[0]
        } else {
            self.default_width()
        }
    }

    /// Width of `text` in points at `font_size`
    pub fn text_width(&self, text: &str, font_size: f64) -> f64 {
        let units: u32 = text.chars().map(|c| self.char_width(c) as u32).sum();
        units as f64 * font_size / 1000.0
    }

    /// Font dictionary for a non-embedded standard font
    pub fn to_pdf_dictionary(&self) -> Dictionary {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => self.base_font(),
            "Encoding" => "WinAnsiEncoding",
        }
    }
}

/// Encode text as WinAnsi bytes
///
/// Latin-1 maps directly; the typographic characters WinAnsi places in
/// 0x80..=0x9F are translated; anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .filter(|c| !c.is_control())
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => win_ansi_special(c).unwrap_or(b'?'),
        })
        .collect()
}

fn win_ansi_special(c: char) -> Option<u8> {
    let byte = match c {
        '\u{20AC}' => 0x80, // €
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85, // …
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95, // •
        '\u{2013}' => 0x96, // –
        '\u{2014}' => 0x97, // —
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

/// Hex string operand for a WinAnsi-encoded text (e.g. `<48656C6C6F>`)
pub fn win_ansi_hex(text: &str) -> String {
    let mut hex = String::from("<");
    for byte in encode_win_ansi(text) {
        hex.push_str(&format!("{byte:02X}"));
    }
    hex.push('>');
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helvetica_widths() {
        let font = StandardFont::Helvetica;
        assert_eq!(font.char_width(' '), 278);
        assert_eq!(font.char_width('A'), 667);
        assert_eq!(font.char_width('i'), 222);
        assert_eq!(font.char_width('~'), 584);
        assert_eq!(font.char_width('é'), 556);
    }

    #[test]
    fn test_bold_is_wider() {
        let regular = StandardFont::Helvetica.text_width("Invoice number", 10.0);
        let bold = StandardFont::HelveticaBold.text_width("Invoice number", 10.0);
        assert!(bold > regular);
    }

    #[test]
    fn test_text_width_scales_with_size() {
        let font = StandardFont::Helvetica;
        // "Hello" = 722 + 556 + 222 + 222 + 556 = 2278 units
        assert!((font.text_width("Hello", 10.0) - 22.78).abs() < 1e-9);
        assert!((font.text_width("Hello", 20.0) - 45.56).abs() < 1e-9);
        assert_eq!(font.text_width("", 12.0), 0.0);
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Abc"), b"Abc".to_vec());
        assert_eq!(encode_win_ansi("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("€5 – ok"), vec![0x80, b'5', b' ', 0x96, b' ', b'o', b'k']);
        assert_eq!(encode_win_ansi("สวัสดี"), b"??????".to_vec());
        assert_eq!(encode_win_ansi("a\nb"), b"ab".to_vec());
    }

    #[test]
    fn test_win_ansi_hex() {
        assert_eq!(win_ansi_hex("Hi"), "<4869>");
        assert_eq!(win_ansi_hex(""), "<>");
    }

    #[test]
    fn test_font_dictionary() {
        let dict = StandardFont::HelveticaBold.to_pdf_dictionary();
        assert_eq!(dict.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica-Bold");
        assert_eq!(dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Type1");
    }
}
