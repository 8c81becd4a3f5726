//! Page-level types.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Page margins in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    /// The same margin on every side.
    pub fn uniform(points: f32) -> Self {
        Self {
            top: points,
            right: points,
            bottom: points,
            left: points,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(72.0)
    }
}

/// Width and height in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Geometry shared by every page of a document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSetup {
    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Margins around the content area
    pub margins: Margins,
}

impl PageSetup {
    /// Create a page setup with the given dimensions and margins.
    pub fn new(width: f32, height: f32, margins: Margins) -> Self {
        Self {
            width,
            height,
            margins,
        }
    }

    /// US Letter (8.5 x 11 inches) with one-inch margins.
    pub fn letter() -> Self {
        Self::new(612.0, 792.0, Margins::default()) // 8.5 * 72, 11 * 72
    }

    /// A4 (210 x 297 mm) with one-inch margins.
    pub fn a4() -> Self {
        Self::new(595.0, 842.0, Margins::default()) // 210mm * 2.834, 297mm * 2.834
    }

    /// Replace the margins.
    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    /// Size of the area text is laid out in (page minus margins).
    ///
    /// Never negative, even for margins larger than the page.
    pub fn content_size(&self) -> Size {
        Size::new(
            (self.width - self.margins.left - self.margins.right).max(0.0),
            (self.height - self.margins.top - self.margins.bottom).max(0.0),
        )
    }

    /// Check if the page is in landscape orientation.
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

impl Default for PageSetup {
    fn default() -> Self {
        Self::letter()
    }
}

/// One fixed-size page container bound to a character range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page index (0-based)
    pub index: usize,

    /// Characters laid out on this page
    pub range: Range<usize>,

    /// Page geometry
    pub setup: PageSetup,

    /// Height consumed by laid-out lines, in points
    pub used_height: f32,
}

impl Page {
    /// Create an empty page at `offset`.
    pub fn empty(index: usize, offset: usize, setup: PageSetup) -> Self {
        Self {
            index,
            range: offset..offset,
            setup,
            used_height: 0.0,
        }
    }

    /// Check if the page covers no characters.
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Number of characters on the page.
    pub fn char_count(&self) -> usize {
        self.range.len()
    }

    /// Check if `offset` is laid out on this page.
    pub fn contains(&self, offset: usize) -> bool {
        self.range.contains(&offset)
    }
}

/// The page list plus the floor on its length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationState {
    /// Pages in order, index = page number
    pub pages: Vec<Page>,

    /// The page list never gets shorter than this (at least 1)
    pub minimum_page_count: usize,
}

impl PaginationState {
    /// Initial state: `minimum_page_count` empty pages.
    pub fn new(minimum_page_count: usize, setup: PageSetup) -> Self {
        let minimum_page_count = minimum_page_count.max(1);
        Self {
            pages: (0..minimum_page_count)
                .map(|index| Page::empty(index, 0, setup))
                .collect(),
            minimum_page_count,
        }
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Page by index (0-based).
    pub fn get_page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    /// Page that lays out the character at `offset`.
    pub fn page_for_offset(&self, offset: usize) -> Option<&Page> {
        self.pages.iter().find(|page| page.contains(offset))
    }

    /// Check that the pages partition `0..length` in order with no gaps.
    pub fn covers(&self, length: usize) -> bool {
        let mut expected = 0;
        for (index, page) in self.pages.iter().enumerate() {
            if page.index != index || page.range.start != expected {
                return false;
            }
            expected = page.range.end;
        }
        expected == length && self.pages.len() >= self.minimum_page_count
    }
}
