//! Metric-based line breaking.

use std::sync::Arc;

use super::{FontCatalog, FontResolver, LayoutMeasurer, LineBox, ResolvedFont};
use crate::model::{AttributedDocument, TextAttributes};

/// Greedy word-wrapping measurer driven by per-font average metrics.
///
/// Lines break at a newline, else after the last space that fits, else at
/// the last character that fits. A line always holds at least one character.
#[derive(Clone)]
pub struct MetricsMeasurer {
    fonts: Arc<dyn FontResolver>,
}

impl MetricsMeasurer {
    /// Create a measurer over a custom font resolver.
    pub fn new(fonts: Arc<dyn FontResolver>) -> Self {
        Self { fonts }
    }

    /// The font resolver in use.
    pub fn fonts(&self) -> &Arc<dyn FontResolver> {
        &self.fonts
    }

    /// Find where the line starting at `start` ends. `limit` is the end of
    /// the paragraph.
    fn break_point(
        &self,
        doc: &AttributedDocument,
        start: usize,
        limit: usize,
        width: f32,
    ) -> usize {
        let runs = match doc.iter_runs(start..limit) {
            Ok(runs) => runs,
            Err(_) => return limit,
        };

        let mut chars = doc.chars_from(start);
        let mut used = 0.0f32;
        let mut last_space_break = None;
        let mut offset = start;

        for run in runs {
            let font = self.resolve_font(&run.attributes);
            for ch in chars.by_ref().take(run.len()) {
                if ch == '\n' {
                    return offset + 1;
                }
                if ch == ' ' || ch == '\t' {
                    // Whitespace may hang past the right edge
                    used += font.advance(ch);
                    offset += 1;
                    last_space_break = Some(offset);
                    continue;
                }

                let advance = font.advance(ch);
                if offset > start && used + advance > width {
                    return last_space_break.unwrap_or(offset);
                }
                used += advance;
                offset += 1;
            }
        }
        limit
    }
}

impl Default for MetricsMeasurer {
    fn default() -> Self {
        Self::new(Arc::new(FontCatalog::standard()))
    }
}

impl std::fmt::Debug for MetricsMeasurer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsMeasurer")
            .field("families", &self.fonts.families())
            .finish()
    }
}

impl LayoutMeasurer for MetricsMeasurer {
    fn next_line(&self, doc: &AttributedDocument, start: usize, width: f32) -> Option<LineBox> {
        if start >= doc.len() {
            return None;
        }

        let paragraph = doc.paragraph_range(start);
        let paragraph_attrs = doc.attributes_at(paragraph.start).ok()?.attributes;
        let end = self.break_point(doc, start, paragraph.end, width);

        let mut height = 0.0f32;
        let mut ascent = 0.0f32;
        let mut visible_width = 0.0f32;
        let mut pending_whitespace = 0.0f32;
        let mut pending_spaces = 0;
        let mut spaces = 0;

        let mut chars = doc.chars_from(start);
        for run in doc.iter_runs(start..end).ok()? {
            let font = self.resolve_font(&run.attributes);
            height = height.max(font.line_height());
            ascent = ascent.max(font.ascent());
            for ch in chars.by_ref().take(run.len()) {
                match ch {
                    '\n' | '\r' => {}
                    ' ' | '\t' => {
                        pending_whitespace += font.advance(ch);
                        if ch == ' ' {
                            pending_spaces += 1;
                        }
                    }
                    _ => {
                        visible_width += pending_whitespace + font.advance(ch);
                        spaces += pending_spaces;
                        pending_whitespace = 0.0;
                        pending_spaces = 0;
                    }
                }
            }
        }

        let ends_paragraph = end >= paragraph.end;
        Some(LineBox {
            range: start..end,
            width: visible_width,
            height: height * paragraph_attrs.line_spacing,
            ascent,
            space_before: if start == paragraph.start {
                paragraph_attrs.paragraph_spacing_before
            } else {
                0.0
            },
            space_after: if ends_paragraph {
                paragraph_attrs.paragraph_spacing_after
            } else {
                0.0
            },
            alignment: paragraph_attrs.alignment,
            ends_paragraph,
            spaces,
        })
    }

    fn advance(&self, ch: char, attributes: &TextAttributes) -> f32 {
        self.resolve_font(attributes).advance(ch)
    }

    fn resolve_font(&self, attributes: &TextAttributes) -> ResolvedFont {
        self.fonts.resolve(
            &attributes.font_family,
            attributes.font_size,
            attributes.bold,
            attributes.italic,
        )
    }
}
