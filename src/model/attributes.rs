//! Character and paragraph attributes carried by every attribute run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default font family for new documents.
pub const DEFAULT_FONT_FAMILY: &str = "Helvetica Neue";

/// Default font size in points.
pub const DEFAULT_FONT_SIZE: f32 = 11.0;

/// Font sizes are clamped to this range (points).
pub const FONT_SIZE_RANGE: (f32, f32) = (8.0, 72.0);

/// Line spacing multipliers are clamped to this range.
pub const LINE_SPACING_RANGE: (f32, f32) = (0.5, 3.0);

/// Paragraph spacing before/after is clamped to this range (points).
pub const PARAGRAPH_SPACING_RANGE: (f32, f32) = (0.0, 100.0);

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Opaque black.
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Mid gray used by the quote character style.
    pub const QUOTE_GRAY: Self = Self::new(0x55, 0x55, 0x55);

    /// Create a color from 8-bit components.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`, `rrggbb` or the short `#rgb` form.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        let digits: Vec<u8> = hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<Vec<_>>>()?;

        match digits.as_slice() {
            [r, g, b] => Some(Self::new(r * 17, g * 17, b * 17)),
            [r1, r0, g1, g0, b1, b0] => Some(Self::new(
                r1 * 16 + r0,
                g1 * 16 + g0,
                b1 * 16 + b0,
            )),
            _ => None,
        }
    }

    /// Format as lowercase `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Components scaled to `0.0..=1.0`, as PDF color operators expect.
    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        )
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Paragraph alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Left alignment (default)
    #[default]
    Left,
    /// Center alignment
    Center,
    /// Right alignment
    Right,
    /// Justified alignment
    Justify,
}

impl Alignment {
    /// All alignments in control order.
    pub const ALL: [Alignment; 4] = [
        Alignment::Left,
        Alignment::Center,
        Alignment::Right,
        Alignment::Justify,
    ];

    /// Lowercase name, also the CSS `text-align` keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }
}

impl FromStr for Alignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "leading" => Ok(Alignment::Left),
            "center" | "centre" => Ok(Alignment::Center),
            "right" | "trailing" => Ok(Alignment::Right),
            "justify" | "justified" => Ok(Alignment::Justify),
            other => Err(format!("unknown alignment: {}", other)),
        }
    }
}

/// The full attribute set of one attribute run.
///
/// Character-level fields (font, decorations, color) may change at any
/// character. Paragraph-level fields (alignment, spacing) are read by layout
/// from the first character of each paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAttributes {
    /// Font family name, resolved by the font collaborator
    pub font_family: String,

    /// Font size in points
    pub font_size: f32,

    /// Bold trait
    pub bold: bool,

    /// Italic trait
    pub italic: bool,

    /// Underlined text
    pub underline: bool,

    /// Strikethrough text
    pub strikethrough: bool,

    /// Foreground color
    pub text_color: Rgb,

    /// Paragraph alignment
    pub alignment: Alignment,

    /// Line spacing multiplier (1.0 = single, 2.0 = double)
    pub line_spacing: f32,

    /// Space before paragraph in points
    pub paragraph_spacing_before: f32,

    /// Space after paragraph in points
    pub paragraph_spacing_after: f32,
}

impl TextAttributes {
    /// Return a copy with every numeric field clamped to its valid range.
    pub fn clamped(mut self) -> Self {
        self.font_size = clamp_font_size(self.font_size);
        self.line_spacing = clamp_line_spacing(self.line_spacing);
        self.paragraph_spacing_before = clamp_paragraph_spacing(self.paragraph_spacing_before);
        self.paragraph_spacing_after = clamp_paragraph_spacing(self.paragraph_spacing_after);
        self
    }

    /// Whether two attribute sets lay out identically.
    ///
    /// Color and decorations never change line geometry.
    pub fn same_geometry(&self, other: &TextAttributes) -> bool {
        self.font_family == other.font_family
            && self.font_size == other.font_size
            && self.bold == other.bold
            && self.italic == other.italic
            && self.line_spacing == other.line_spacing
            && self.paragraph_spacing_before == other.paragraph_spacing_before
            && self.paragraph_spacing_after == other.paragraph_spacing_after
    }
}

impl Default for TextAttributes {
    fn default() -> Self {
        Self {
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            bold: false,
            italic: false,
            underline: false,
            strikethrough: false,
            text_color: Rgb::BLACK,
            alignment: Alignment::Left,
            line_spacing: 1.0,
            paragraph_spacing_before: 0.0,
            paragraph_spacing_after: 0.0,
        }
    }
}

fn clamp_to(value: f32, (min, max): (f32, f32)) -> f32 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}

/// Clamp a font size to `[8, 72]`.
pub fn clamp_font_size(size: f32) -> f32 {
    clamp_to(size, FONT_SIZE_RANGE)
}

/// Clamp a line spacing multiplier to `[0.5, 3.0]`.
pub fn clamp_line_spacing(spacing: f32) -> f32 {
    clamp_to(spacing, LINE_SPACING_RANGE)
}

/// Clamp paragraph spacing to `[0, 100]` points.
pub fn clamp_paragraph_spacing(spacing: f32) -> f32 {
    clamp_to(spacing, PARAGRAPH_SPACING_RANGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_hex() {
        assert_eq!(Rgb::from_hex("#ff0000"), Some(Rgb::new(255, 0, 0)));
        assert_eq!(Rgb::from_hex("00FF7f"), Some(Rgb::new(0, 255, 127)));
        assert_eq!(Rgb::from_hex("#fff"), Some(Rgb::WHITE));
        assert_eq!(Rgb::from_hex("#12345"), None);
        assert_eq!(Rgb::from_hex("#gg0000"), None);
        assert_eq!(Rgb::QUOTE_GRAY.to_hex(), "#555555");
    }

    #[test]
    fn test_clamping() {
        assert_eq!(clamp_font_size(0.0), 8.0);
        assert_eq!(clamp_font_size(1000.0), 72.0);
        assert_eq!(clamp_font_size(f32::NAN), 8.0);
        assert_eq!(clamp_line_spacing(0.1), 0.5);
        assert_eq!(clamp_line_spacing(f32::INFINITY), 3.0);
        assert_eq!(clamp_paragraph_spacing(-4.0), 0.0);
        assert_eq!(clamp_paragraph_spacing(250.0), 100.0);
    }

    #[test]
    fn test_alignment_parse() {
        assert_eq!("Leading".parse::<Alignment>(), Ok(Alignment::Left));
        assert_eq!("justified".parse::<Alignment>(), Ok(Alignment::Justify));
        assert!("diagonal".parse::<Alignment>().is_err());
    }

    #[test]
    fn test_same_geometry_ignores_color() {
        let a = TextAttributes::default();
        let b = TextAttributes {
            text_color: Rgb::new(200, 0, 0),
            underline: true,
            ..Default::default()
        };
        assert!(a.same_geometry(&b));
        assert_ne!(a, b);

        let c = TextAttributes {
            font_size: 24.0,
            ..Default::default()
        };
        assert!(!a.same_geometry(&c));
    }
}
