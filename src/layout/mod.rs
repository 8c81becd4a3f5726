//! Layout and measurement.
//!
//! Line breaking belongs to a [`LayoutMeasurer`]. The pagination engine and
//! the PDF exporter both drive the same measurer through [`LinePlacer`], so a
//! page laid out on screen and the same page written to PDF always break at
//! the same character.

mod font;
mod metrics;

pub use font::{BaseFace, FontCatalog, FontEntry, FontMetrics, FontResolver, ResolvedFont};
pub use metrics::MetricsMeasurer;

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::model::{Alignment, AttributedDocument, Size, TextAttributes};

/// One laid-out line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineBox {
    /// Characters on the line, including a trailing newline if any
    pub range: Range<usize>,

    /// Width of the visible content (trailing whitespace excluded)
    pub width: f32,

    /// Line height after line spacing is applied
    pub height: f32,

    /// Baseline offset from the top of the line
    pub ascent: f32,

    /// Paragraph spacing above this line (first line of a paragraph only)
    pub space_before: f32,

    /// Paragraph spacing below this line (last line of a paragraph only)
    pub space_after: f32,

    /// Alignment of the owning paragraph
    pub alignment: Alignment,

    /// Whether this is the last line of its paragraph
    pub ends_paragraph: bool,

    /// Number of U+0020 spaces inside the visible content
    pub spaces: usize,
}

/// How much of the document fits into one container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fit {
    /// Overflow point: the first character that did not fit
    pub end: usize,

    /// Height consumed by the lines that fit
    pub consumed_height: f32,

    /// Number of lines that fit
    pub lines: usize,
}

/// The layout collaborator.
///
/// Implementations must be deterministic: the same document, start offset
/// and width always produce the same line.
pub trait LayoutMeasurer: Send + Sync {
    /// Lay out the single line starting at `start`, or `None` at the end of
    /// the document.
    fn next_line(&self, doc: &AttributedDocument, start: usize, width: f32) -> Option<LineBox>;

    /// Horizontal advance of `ch` drawn with `attributes`, in points.
    fn advance(&self, ch: char, attributes: &TextAttributes) -> f32;

    /// Resolve the concrete font for `attributes`.
    fn resolve_font(&self, attributes: &TextAttributes) -> ResolvedFont;

    /// Measure how many characters from `start` fit into `area`.
    fn fit(&self, doc: &AttributedDocument, start: usize, area: Size) -> Fit {
        let mut placer = LinePlacer::new(self, doc, start, area);
        let lines = placer.by_ref().count();
        Fit {
            end: placer.offset(),
            consumed_height: placer.consumed_height(),
            lines,
        }
    }
}

/// A line positioned inside a container.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    /// The line
    pub line: LineBox,

    /// Distance from the top of the content area to the top of the line box
    pub top: f32,
}

impl PlacedLine {
    /// Distance from the top of the content area to the baseline.
    pub fn baseline(&self) -> f32 {
        self.top + self.line.ascent
    }
}

/// Places lines top-to-bottom into one container until it overflows.
///
/// Paragraph spacing before is dropped for the first line of a container.
/// A container always accepts at least one line, so layout makes progress
/// even when a single line is taller than the container.
pub struct LinePlacer<'a, M: LayoutMeasurer + ?Sized> {
    measurer: &'a M,
    doc: &'a AttributedDocument,
    area: Size,
    offset: usize,
    limit: usize,
    consumed: f32,
    placed: usize,
}

impl<'a, M: LayoutMeasurer + ?Sized> LinePlacer<'a, M> {
    /// Start placing at `start`.
    pub fn new(measurer: &'a M, doc: &'a AttributedDocument, start: usize, area: Size) -> Self {
        Self {
            measurer,
            doc,
            area,
            offset: start,
            limit: doc.len(),
            consumed: 0.0,
            placed: 0,
        }
    }

    /// Stop before any line that would start at or past `limit`.
    pub fn until(mut self, limit: usize) -> Self {
        self.limit = limit.min(self.doc.len());
        self
    }

    /// Offset of the next unplaced character.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Height used so far.
    pub fn consumed_height(&self) -> f32 {
        self.consumed
    }
}

impl<M: LayoutMeasurer + ?Sized> Iterator for LinePlacer<'_, M> {
    type Item = PlacedLine;

    fn next(&mut self) -> Option<PlacedLine> {
        if self.offset >= self.limit {
            return None;
        }
        let mut line = self
            .measurer
            .next_line(self.doc, self.offset, self.area.width)?;
        if line.range.end <= self.offset {
            log::warn!("Measurer made no progress at offset {}", self.offset);
            return None;
        }

        if self.placed == 0 {
            line.space_before = 0.0;
        }
        let total = line.space_before + line.height + line.space_after;
        if self.placed > 0 && self.consumed + line.space_before + line.height > self.area.height {
            return None;
        }

        let top = self.consumed + line.space_before;
        self.consumed = (self.consumed + total).min(self.area.height.max(top + line.height));
        self.offset = line.range.end;
        self.placed += 1;
        Some(PlacedLine { line, top })
    }
}
