//! Document model types.
//!
//! The attributed document store, the attribute vocabulary it stores, the
//! style snapshot shown to controls, and the page containers pagination
//! binds to document ranges.

mod attributes;
mod document;
mod page;
mod style;

pub use attributes::{
    clamp_font_size, clamp_line_spacing, clamp_paragraph_spacing, Alignment, Rgb, TextAttributes,
    DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, FONT_SIZE_RANGE, LINE_SPACING_RANGE,
    PARAGRAPH_SPACING_RANGE,
};
pub use document::{AttributeRun, AttributedDocument};
pub use page::{Margins, Page, PageSetup, PaginationState, Size};
pub use style::{CharacterStyle, ParagraphStyle, StyleState, CODE_FONT_FAMILY};
