//! Font resolution.
//!
//! The resolver turns `(family, size, bold, italic)` into a concrete face with
//! metrics. Unknown families and missing trait variants never fail: they
//! resolve to the nearest available face and say so in the log.

use std::collections::HashSet;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Glyph metrics in em units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FontMetrics {
    /// Average advance of a non-space character
    pub avg_char_width: f32,
    /// Advance of U+0020
    pub space_width: f32,
    /// Distance from the top of the line box to the baseline
    pub ascent: f32,
    /// Natural line height (ascent + descent + leading)
    pub line_height: f32,
}

/// The PDF standard-14 family a face is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseFace {
    Helvetica,
    Times,
    Courier,
}

impl BaseFace {
    /// PostScript name of the standard-14 variant.
    pub fn postscript_name(self, bold: bool, italic: bool) -> &'static str {
        match (self, bold, italic) {
            (BaseFace::Helvetica, false, false) => "Helvetica",
            (BaseFace::Helvetica, true, false) => "Helvetica-Bold",
            (BaseFace::Helvetica, false, true) => "Helvetica-Oblique",
            (BaseFace::Helvetica, true, true) => "Helvetica-BoldOblique",
            (BaseFace::Times, false, false) => "Times-Roman",
            (BaseFace::Times, true, false) => "Times-Bold",
            (BaseFace::Times, false, true) => "Times-Italic",
            (BaseFace::Times, true, true) => "Times-BoldItalic",
            (BaseFace::Courier, false, false) => "Courier",
            (BaseFace::Courier, true, false) => "Courier-Bold",
            (BaseFace::Courier, false, true) => "Courier-Oblique",
            (BaseFace::Courier, true, true) => "Courier-BoldOblique",
        }
    }
}

/// One family known to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontEntry {
    /// Family name as shown in the font menu
    pub family: String,
    /// Standard-14 face used for PDF output
    pub base_face: BaseFace,
    /// Regular-weight metrics
    pub metrics: FontMetrics,
    /// Whether a bold variant exists
    pub has_bold: bool,
    /// Whether an italic variant exists
    pub has_italic: bool,
}

impl FontEntry {
    fn new(family: &str, base_face: BaseFace, avg_char_width: f32, space_width: f32) -> Self {
        Self {
            family: family.to_string(),
            base_face,
            metrics: FontMetrics {
                avg_char_width,
                space_width,
                ascent: 0.8,
                line_height: 1.2,
            },
            has_bold: true,
            has_italic: true,
        }
    }

    fn without_variants(mut self) -> Self {
        self.has_bold = false;
        self.has_italic = false;
        self
    }
}

/// A concrete, renderable font.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFont {
    /// Family actually used
    pub family: String,
    /// Standard-14 face for PDF output
    pub base_face: BaseFace,
    /// Size in points
    pub size: f32,
    /// Bold variant in use
    pub bold: bool,
    /// Italic variant in use
    pub italic: bool,
    /// Metrics in em units
    pub metrics: FontMetrics,
    /// The requested family or trait was not available
    pub substituted: bool,
}

impl ResolvedFont {
    /// PostScript name of the face, e.g. `Times-BoldItalic`.
    pub fn postscript_name(&self) -> &'static str {
        self.base_face.postscript_name(self.bold, self.italic)
    }

    /// Horizontal advance of `ch` in points.
    pub fn advance(&self, ch: char) -> f32 {
        let em = match ch {
            '\n' | '\r' => 0.0,
            ' ' | '\u{a0}' => self.metrics.space_width,
            '\t' => self.metrics.space_width * 4.0,
            c if (c as u32) >= 0x2e80 => 1.0,
            _ => self.metrics.avg_char_width * if self.bold { 1.05 } else { 1.0 },
        };
        em * self.size
    }

    /// Natural line height in points.
    pub fn line_height(&self) -> f32 {
        self.metrics.line_height * self.size
    }

    /// Baseline offset from the top of the line, in points.
    pub fn ascent(&self) -> f32 {
        self.metrics.ascent * self.size
    }
}

/// Maps a requested face to a concrete font. Must be pure: the same request
/// always yields the same font, on screen and in export.
pub trait FontResolver: Send + Sync {
    /// Resolve a family, size and trait combination.
    fn resolve(&self, family: &str, size: f32, bold: bool, italic: bool) -> ResolvedFont;

    /// Families offered to the user.
    fn families(&self) -> Vec<String>;
}

/// The built-in font catalog.
#[derive(Debug)]
pub struct FontCatalog {
    entries: Vec<FontEntry>,
    warned: Mutex<HashSet<String>>,
}

impl FontCatalog {
    /// Create a catalog; the first entry is the fallback.
    pub fn new(mut entries: Vec<FontEntry>) -> Self {
        if entries.is_empty() {
            entries.push(FontEntry::new("Helvetica Neue", BaseFace::Helvetica, 0.5, 0.278));
        }
        Self {
            entries,
            warned: Mutex::new(HashSet::new()),
        }
    }

    /// The families offered by the editor's font menu.
    pub fn standard() -> Self {
        Self::new(vec![
            FontEntry::new("Helvetica Neue", BaseFace::Helvetica, 0.5, 0.278),
            FontEntry::new("Times New Roman", BaseFace::Times, 0.45, 0.25),
            FontEntry::new("Arial", BaseFace::Helvetica, 0.5, 0.278),
            FontEntry::new("Courier New", BaseFace::Courier, 0.6, 0.6),
            FontEntry::new("Georgia", BaseFace::Times, 0.52, 0.25),
            FontEntry::new("Verdana", BaseFace::Helvetica, 0.58, 0.35),
            FontEntry::new("Trebuchet MS", BaseFace::Helvetica, 0.48, 0.3),
            FontEntry::new("Impact", BaseFace::Helvetica, 0.47, 0.18).without_variants(),
        ])
    }

    /// Look up a family, ignoring case.
    pub fn get(&self, family: &str) -> Option<&FontEntry> {
        self.entries
            .iter()
            .find(|entry| entry.family.eq_ignore_ascii_case(family.trim()))
    }

    fn warn_once(&self, message: String) {
        if let Ok(mut warned) = self.warned.lock() {
            if warned.insert(message.clone()) {
                log::warn!("{}", message);
            }
        }
    }
}

impl Default for FontCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl FontResolver for FontCatalog {
    fn resolve(&self, family: &str, size: f32, bold: bool, italic: bool) -> ResolvedFont {
        let (entry, mut substituted) = match self.get(family) {
            Some(entry) => (entry, false),
            None => {
                let fallback = &self.entries[0];
                self.warn_once(format!(
                    "Font '{}' is not available, using '{}'",
                    family, fallback.family
                ));
                (fallback, true)
            }
        };

        let use_bold = bold && entry.has_bold;
        let use_italic = italic && entry.has_italic;
        if use_bold != bold || use_italic != italic {
            substituted = true;
            self.warn_once(format!(
                "Font '{}' has no {} variant, using nearest",
                entry.family,
                if use_bold != bold { "bold" } else { "italic" }
            ));
        }

        ResolvedFont {
            family: entry.family.clone(),
            base_face: entry.base_face,
            size,
            bold: use_bold,
            italic: use_italic,
            metrics: entry.metrics,
            substituted,
        }
    }

    fn families(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.family.clone()).collect()
    }
}
