//! Style snapshot exposed to the presentation layer, and the preset macros.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Rgb, TextAttributes, DEFAULT_FONT_FAMILY};

/// Monospace family used by the `code` character style.
pub const CODE_FONT_FAMILY: &str = "Courier New";

/// Character-level preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterStyle {
    /// Plain text
    #[default]
    None,
    /// Italic
    Emphasis,
    /// Bold
    Strong,
    /// Monospace
    Code,
    /// Italic gray
    Quote,
}

impl CharacterStyle {
    pub const ALL: [CharacterStyle; 5] = [
        CharacterStyle::None,
        CharacterStyle::Emphasis,
        CharacterStyle::Strong,
        CharacterStyle::Code,
        CharacterStyle::Quote,
    ];

    /// Apply this preset on top of `base`.
    ///
    /// Bold, italic, font family and color are reset to defaults first, so
    /// the result never depends on earlier manual formatting of those fields.
    pub fn apply(self, base: &TextAttributes) -> TextAttributes {
        let mut attrs = TextAttributes {
            bold: false,
            italic: false,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            text_color: Rgb::BLACK,
            ..base.clone()
        };
        match self {
            CharacterStyle::None => {}
            CharacterStyle::Emphasis => attrs.italic = true,
            CharacterStyle::Strong => attrs.bold = true,
            CharacterStyle::Code => attrs.font_family = CODE_FONT_FAMILY.to_string(),
            CharacterStyle::Quote => {
                attrs.italic = true;
                attrs.text_color = Rgb::QUOTE_GRAY;
            }
        }
        attrs
    }

    /// Best preset describing `attrs`.
    pub fn infer(attrs: &TextAttributes) -> Self {
        if attrs.font_family == CODE_FONT_FAMILY {
            CharacterStyle::Code
        } else if attrs.italic && attrs.text_color == Rgb::QUOTE_GRAY {
            CharacterStyle::Quote
        } else if attrs.italic {
            CharacterStyle::Emphasis
        } else if attrs.bold && !ParagraphStyle::infer(attrs).is_bold() {
            CharacterStyle::Strong
        } else {
            CharacterStyle::None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CharacterStyle::None => "none",
            CharacterStyle::Emphasis => "emphasis",
            CharacterStyle::Strong => "strong",
            CharacterStyle::Code => "code",
            CharacterStyle::Quote => "quote",
        }
    }
}

/// Paragraph-level preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParagraphStyle {
    #[default]
    Body,
    Title,
    Heading,
    Subheading,
    Caption,
}

impl ParagraphStyle {
    pub const ALL: [ParagraphStyle; 5] = [
        ParagraphStyle::Body,
        ParagraphStyle::Title,
        ParagraphStyle::Heading,
        ParagraphStyle::Subheading,
        ParagraphStyle::Caption,
    ];

    /// Font size this preset sets.
    pub fn font_size(self) -> f32 {
        match self {
            ParagraphStyle::Body => 11.0,
            ParagraphStyle::Title => 24.0,
            ParagraphStyle::Heading => 18.0,
            ParagraphStyle::Subheading => 14.0,
            ParagraphStyle::Caption => 10.0,
        }
    }

    /// Whether this preset sets bold.
    pub fn is_bold(self) -> bool {
        matches!(
            self,
            ParagraphStyle::Title | ParagraphStyle::Heading | ParagraphStyle::Subheading
        )
    }

    /// Apply this preset on top of `base`, resetting bold, italic, family and
    /// color before setting the preset's size and weight.
    pub fn apply(self, base: &TextAttributes) -> TextAttributes {
        TextAttributes {
            bold: self.is_bold(),
            italic: false,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            text_color: Rgb::BLACK,
            font_size: self.font_size(),
            ..base.clone()
        }
    }

    /// Preset whose size and weight match `attrs`, else body.
    pub fn infer(attrs: &TextAttributes) -> Self {
        Self::ALL
            .into_iter()
            .find(|style| style.font_size() == attrs.font_size && style.is_bold() == attrs.bold)
            .unwrap_or(ParagraphStyle::Body)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParagraphStyle::Body => "body",
            ParagraphStyle::Title => "title",
            ParagraphStyle::Heading => "heading",
            ParagraphStyle::Subheading => "subheading",
            ParagraphStyle::Caption => "caption",
        }
    }
}

impl fmt::Display for CharacterStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ParagraphStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CharacterStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|style| style.as_str() == s)
            .ok_or_else(|| format!("unknown character style: {}", s))
    }
}

impl FromStr for ParagraphStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|style| style.as_str() == s)
            .ok_or_else(|| format!("unknown paragraph style: {}", s))
    }
}

/// The "current" style shown by the controls.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StyleState {
    /// Attributes at the caret or at the first selected character
    pub attributes: TextAttributes,

    /// Character preset that best describes `attributes`
    pub character_style: CharacterStyle,

    /// Paragraph preset that best describes `attributes`
    pub paragraph_style: ParagraphStyle,
}

impl StyleState {
    /// Build a style state from attributes, inferring the presets.
    pub fn from_attributes(attributes: TextAttributes) -> Self {
        let attributes = attributes.clamped();
        Self {
            character_style: CharacterStyle::infer(&attributes),
            paragraph_style: ParagraphStyle::infer(&attributes),
            attributes,
        }
    }

    /// The attribute run this state writes into the document.
    pub fn to_attributes(&self) -> TextAttributes {
        self.attributes.clone().clamped()
    }
}
