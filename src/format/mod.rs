//! The formatting engine.
//!
//! Translates style controls into attribute runs written to a range, and
//! reads attribute runs back into a [`StyleState`] for a selection.
//!
//! Numeric fields are clamped on write and never rejected. A mixed-format
//! selection is represented by its first character.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    clamp_font_size, clamp_line_spacing, clamp_paragraph_spacing, Alignment, AttributedDocument,
    CharacterStyle, ParagraphStyle, Rgb, StyleState, TextAttributes,
};

/// A single style control edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum StyleChange {
    FontFamily(String),
    FontSize(f32),
    Bold(bool),
    Italic(bool),
    Underline(bool),
    Strikethrough(bool),
    TextColor(Rgb),
    Alignment(Alignment),
    LineSpacing(f32),
    SpacingBefore(f32),
    SpacingAfter(f32),
    CharacterStyle(CharacterStyle),
    ParagraphStyle(ParagraphStyle),
}

impl StyleChange {
    /// Control field names accepted by [`StyleChange::parse`].
    pub const FIELDS: [&'static str; 13] = [
        "font_family",
        "font_size",
        "bold",
        "italic",
        "underline",
        "strikethrough",
        "text_color",
        "alignment",
        "line_spacing",
        "spacing_before",
        "spacing_after",
        "character_style",
        "paragraph_style",
    ];

    /// Parse a `(field, value)` pair as sent by a style control.
    pub fn parse(field: &str, value: &str) -> std::result::Result<Self, String> {
        let value = value.trim();
        let number = || {
            value
                .parse::<f32>()
                .map_err(|_| format!("{} expects a number, got '{}'", field, value))
        };
        let flag = || match value.to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Ok(true),
            "false" | "off" | "no" | "0" => Ok(false),
            _ => Err(format!("{} expects true or false, got '{}'", field, value)),
        };

        match field.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "font_family" | "font" | "family" => Ok(StyleChange::FontFamily(value.to_string())),
            "font_size" | "size" => number().map(StyleChange::FontSize),
            "bold" => flag().map(StyleChange::Bold),
            "italic" => flag().map(StyleChange::Italic),
            "underline" => flag().map(StyleChange::Underline),
            "strikethrough" => flag().map(StyleChange::Strikethrough),
            "text_color" | "color" => Rgb::from_hex(value)
                .map(StyleChange::TextColor)
                .ok_or_else(|| format!("invalid color: {}", value)),
            "alignment" | "align" => value.parse().map(StyleChange::Alignment),
            "line_spacing" => number().map(StyleChange::LineSpacing),
            "spacing_before" => number().map(StyleChange::SpacingBefore),
            "spacing_after" => number().map(StyleChange::SpacingAfter),
            "character_style" => value.parse().map(StyleChange::CharacterStyle),
            "paragraph_style" => value.parse().map(StyleChange::ParagraphStyle),
            other => Err(format!(
                "unknown style field '{}' (expected one of: {})",
                other,
                Self::FIELDS.join(", ")
            )),
        }
    }

    /// Apply this change on top of `attrs`, clamping numeric values.
    pub fn apply(&self, attrs: &TextAttributes) -> TextAttributes {
        let mut out = attrs.clone();
        match self {
            StyleChange::FontFamily(family) => out.font_family = family.clone(),
            StyleChange::FontSize(size) => out.font_size = clamp_font_size(*size),
            StyleChange::Bold(on) => out.bold = *on,
            StyleChange::Italic(on) => out.italic = *on,
            StyleChange::Underline(on) => out.underline = *on,
            StyleChange::Strikethrough(on) => out.strikethrough = *on,
            StyleChange::TextColor(color) => out.text_color = *color,
            StyleChange::Alignment(alignment) => out.alignment = *alignment,
            StyleChange::LineSpacing(spacing) => out.line_spacing = clamp_line_spacing(*spacing),
            StyleChange::SpacingBefore(points) => {
                out.paragraph_spacing_before = clamp_paragraph_spacing(*points)
            }
            StyleChange::SpacingAfter(points) => {
                out.paragraph_spacing_after = clamp_paragraph_spacing(*points)
            }
            StyleChange::CharacterStyle(style) => return style.apply(attrs).clamped(),
            StyleChange::ParagraphStyle(style) => return style.apply(attrs).clamped(),
        }
        out.clamped()
    }

    /// Whether the change can move line breaks or line heights.
    pub fn affects_layout(&self) -> bool {
        !matches!(
            self,
            StyleChange::Underline(_)
                | StyleChange::Strikethrough(_)
                | StyleChange::TextColor(_)
                | StyleChange::Alignment(_)
        )
    }

    /// Whether the change applies to whole paragraphs.
    pub fn is_paragraph_scoped(&self) -> bool {
        matches!(
            self,
            StyleChange::Alignment(_)
                | StyleChange::LineSpacing(_)
                | StyleChange::SpacingBefore(_)
                | StyleChange::SpacingAfter(_)
                | StyleChange::ParagraphStyle(_)
        )
    }

    /// Control field name.
    pub fn field(&self) -> &'static str {
        match self {
            StyleChange::FontFamily(_) => "font_family",
            StyleChange::FontSize(_) => "font_size",
            StyleChange::Bold(_) => "bold",
            StyleChange::Italic(_) => "italic",
            StyleChange::Underline(_) => "underline",
            StyleChange::Strikethrough(_) => "strikethrough",
            StyleChange::TextColor(_) => "text_color",
            StyleChange::Alignment(_) => "alignment",
            StyleChange::LineSpacing(_) => "line_spacing",
            StyleChange::SpacingBefore(_) => "spacing_before",
            StyleChange::SpacingAfter(_) => "spacing_after",
            StyleChange::CharacterStyle(_) => "character_style",
            StyleChange::ParagraphStyle(_) => "paragraph_style",
        }
    }
}

impl fmt::Display for StyleChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleChange::FontFamily(family) => write!(f, "font_family={}", family),
            StyleChange::FontSize(size) => write!(f, "font_size={}", size),
            StyleChange::Bold(on)
            | StyleChange::Italic(on)
            | StyleChange::Underline(on)
            | StyleChange::Strikethrough(on) => write!(f, "{}={}", self.field(), on),
            StyleChange::TextColor(color) => write!(f, "text_color={}", color),
            StyleChange::Alignment(alignment) => write!(f, "alignment={}", alignment.as_str()),
            StyleChange::LineSpacing(value)
            | StyleChange::SpacingBefore(value)
            | StyleChange::SpacingAfter(value) => write!(f, "{}={}", self.field(), value),
            StyleChange::CharacterStyle(style) => write!(f, "character_style={}", style),
            StyleChange::ParagraphStyle(style) => write!(f, "paragraph_style={}", style),
        }
    }
}

/// What a formatting call changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Only the typing attributes changed; the document is untouched
    TypingAttributes,
    /// The attributes of this document range were rewritten
    Range(Range<usize>),
}

impl Applied {
    /// Whether document content was rewritten.
    pub fn touched_document(&self) -> bool {
        matches!(self, Applied::Range(range) if !range.is_empty())
    }
}

/// Writes style controls into the document and reads them back.
#[derive(Debug, Clone, Default)]
pub struct FormattingEngine {
    typing_attributes: Option<TextAttributes>,
}

impl FormattingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes pinned for the next typed characters, if any.
    pub fn typing_attributes(&self) -> Option<&TextAttributes> {
        self.typing_attributes.as_ref()
    }

    /// Pin attributes for the next typed characters.
    pub fn set_typing_attributes(&mut self, attributes: TextAttributes) {
        self.typing_attributes = Some(attributes.clamped());
    }

    /// Forget pinned typing attributes (the caret moved).
    pub fn clear_typing_attributes(&mut self) {
        self.typing_attributes = None;
    }

    /// Write a full style state to a selection.
    ///
    /// An empty range only sets the typing attributes.
    pub fn apply_to_selection(
        &mut self,
        doc: &mut AttributedDocument,
        range: Range<usize>,
        state: &StyleState,
    ) -> Result<Applied> {
        check_selection(doc, &range)?;
        if range.is_empty() {
            self.set_typing_attributes(state.to_attributes());
            return Ok(Applied::TypingAttributes);
        }
        doc.apply_attributes(range.clone(), state.to_attributes())?;
        Ok(Applied::Range(range))
    }

    /// Apply one control edit to a selection.
    ///
    /// Each run in the range is updated independently, so a mixed selection
    /// keeps every field the change does not name. Paragraph-scoped changes
    /// widen a non-empty range to whole paragraphs. An empty range only
    /// updates the typing attributes.
    pub fn apply_change(
        &mut self,
        doc: &mut AttributedDocument,
        range: Range<usize>,
        change: &StyleChange,
    ) -> Result<Applied> {
        check_selection(doc, &range)?;
        if range.is_empty() {
            let current = self.read_from_selection(doc, range)?.attributes;
            self.typing_attributes = Some(change.apply(&current));
            return Ok(Applied::TypingAttributes);
        }

        let range = if change.is_paragraph_scoped() {
            doc.paragraph_bounds(range)?
        } else {
            range
        };
        doc.update_attributes(range.clone(), |attrs| change.apply(attrs))?;
        log::debug!("Applied {} to {:?}", change, range);
        Ok(Applied::Range(range))
    }

    /// Read the style state for a selection.
    ///
    /// A caret reports the pinned typing attributes, else the character
    /// before it (the first character at offset 0). A non-empty selection
    /// reports its first character.
    ///
    /// Reading before the caret matches [`Self::insertion_attributes`], so
    /// the controls show the style new text will get ("Caret reads" in
    /// DESIGN.md).
    pub fn read_from_selection(
        &self,
        doc: &AttributedDocument,
        range: Range<usize>,
    ) -> Result<StyleState> {
        check_selection(doc, &range)?;
        if range.is_empty() {
            if let Some(typing) = &self.typing_attributes {
                return Ok(StyleState::from_attributes(typing.clone()));
            }
            return Ok(StyleState::from_attributes(self.caret_attributes(doc, range.start)));
        }
        let run = doc.attributes_at(range.start)?;
        Ok(StyleState::from_attributes(run.attributes))
    }

    /// Attributes given to text inserted at `offset`.
    pub fn insertion_attributes(&self, doc: &AttributedDocument, offset: usize) -> TextAttributes {
        match &self.typing_attributes {
            Some(typing) => typing.clone(),
            None => self.caret_attributes(doc, offset),
        }
    }

    fn caret_attributes(&self, doc: &AttributedDocument, offset: usize) -> TextAttributes {
        let len = doc.len();
        if len == 0 {
            return doc.default_attributes().clone();
        }
        let offset = offset.min(len).saturating_sub(1);
        doc.attributes_at(offset)
            .map(|run| run.attributes)
            .unwrap_or_else(|_| doc.default_attributes().clone())
    }
}

fn check_selection(doc: &AttributedDocument, range: &Range<usize>) -> Result<()> {
    let length = doc.len();
    if range.start > length || range.start > range.end {
        return Err(Error::out_of_bounds(range.start, length));
    }
    if range.end > length {
        return Err(Error::out_of_bounds(range.end, length));
    }
    Ok(())
}
