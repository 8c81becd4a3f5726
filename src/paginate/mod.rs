//! The pagination engine.
//!
//! Pagination is a pure recomputation: given the document, the page setup
//! and a minimum page count it produces the ordered page list. Pages
//! partition the document by layout overflow, in order, with no gaps and no
//! overlaps.

use std::sync::Arc;

use crate::layout::LayoutMeasurer;
use crate::model::{AttributedDocument, Page, PageSetup, PaginationState};

/// Lays a document out into fixed-size pages.
#[derive(Clone)]
pub struct Paginator {
    setup: PageSetup,
    measurer: Arc<dyn LayoutMeasurer>,
}

impl Paginator {
    /// Create a paginator for one page geometry.
    pub fn new(setup: PageSetup, measurer: Arc<dyn LayoutMeasurer>) -> Self {
        Self { setup, measurer }
    }

    /// Page geometry.
    pub fn setup(&self) -> PageSetup {
        self.setup
    }

    /// The layout collaborator used for overflow.
    pub fn measurer(&self) -> &Arc<dyn LayoutMeasurer> {
        &self.measurer
    }

    /// Recompute the page list.
    ///
    /// Pages are filled in order until every character is covered, then
    /// padded with empty pages up to `minimum_page_count`. Empty pages past
    /// the last non-empty page and beyond the minimum are never produced.
    pub fn recompute(&self, doc: &AttributedDocument, minimum_page_count: usize) -> Vec<Page> {
        let minimum = minimum_page_count.max(1);
        let length = doc.len();
        let area = self.setup.content_size();

        let mut pages = Vec::new();
        let mut start = 0;
        while start < length {
            let fit = self.measurer.fit(doc, start, area);
            let end = if fit.end > start {
                fit.end.min(length)
            } else {
                log::warn!(
                    "Layout made no progress at offset {} on page {}, forcing one character",
                    start,
                    pages.len()
                );
                start + 1
            };
            pages.push(Page {
                index: pages.len(),
                range: start..end,
                setup: self.setup,
                used_height: fit.consumed_height,
            });
            start = end;
        }

        while pages.len() < minimum {
            pages.push(Page::empty(pages.len(), length, self.setup));
        }

        log::debug!(
            "Paginated {} characters into {} pages (minimum {})",
            length,
            pages.len(),
            minimum
        );
        pages
    }

    /// Recompute into `state`, returning whether the page list changed.
    pub fn refresh(&self, doc: &AttributedDocument, state: &mut PaginationState) -> bool {
        let pages = self.recompute(doc, state.minimum_page_count);
        if pages == state.pages {
            return false;
        }
        state.pages = pages;
        true
    }
}

impl std::fmt::Debug for Paginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("setup", &self.setup)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{MetricsMeasurer, ResolvedFont, LineBox};
    use crate::model::{Alignment, TextAttributes};

    fn paginator() -> Paginator {
        Paginator::new(PageSetup::letter(), Arc::new(MetricsMeasurer::default()))
    }

    fn assert_partition(pages: &[Page], length: usize) {
        let mut expected = 0;
        for (index, page) in pages.iter().enumerate() {
            assert_eq!(page.index, index);
            assert_eq!(page.range.start, expected);
            expected = page.range.end;
        }
        assert_eq!(expected, length);
    }

    #[test]
    fn test_empty_document_yields_minimum_pages() {
        let doc = AttributedDocument::new();
        assert_eq!(paginator().recompute(&doc, 0).len(), 1);
        assert_eq!(paginator().recompute(&doc, 1).len(), 1);

        let pages = paginator().recompute(&doc, 4);
        assert_eq!(pages.len(), 4);
        assert!(pages.iter().all(Page::is_empty));
        assert_partition(&pages, 0);
    }

    #[test]
    fn test_ten_thousand_characters_need_three_pages() {
        let doc = AttributedDocument::from_text(&"x".repeat(10_000), TextAttributes::default());
        let pages = paginator().recompute(&doc, 1);

        // 85 characters per line, 49 lines per page: ceil(118 / 49) = 3
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].range, 0..4165);
        assert_eq!(pages[1].range, 4165..8330);
        assert_partition(&pages, 10_000);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let doc = AttributedDocument::from_text(
            &"A paragraph of body text.\n".repeat(300),
            TextAttributes::default(),
        );
        let paginator = paginator();
        let first = paginator.recompute(&doc, 2);
        let second = paginator.recompute(&doc, 2);
        assert_eq!(first, second);
        assert_partition(&first, doc.len());
    }

    #[test]
    fn test_bigger_font_adds_pages() {
        let mut doc = AttributedDocument::from_text(&"word ".repeat(2_000), TextAttributes::default());
        let paginator = paginator();
        let before = paginator.recompute(&doc, 1).len();

        doc.update_attributes(0..doc.len(), |attrs| TextAttributes {
            font_size: 24.0,
            ..attrs.clone()
        })
        .unwrap();
        let after = paginator.recompute(&doc, 1);
        assert!(after.len() > before);
        assert_partition(&after, doc.len());
    }

    #[test]
    fn test_refresh_reports_changes() {
        let mut doc = AttributedDocument::from_text("short", TextAttributes::default());
        let paginator = paginator();
        let mut state = PaginationState::new(1, PageSetup::letter());

        assert!(paginator.refresh(&doc, &mut state));
        assert!(!paginator.refresh(&doc, &mut state));
        assert!(state.covers(5));

        doc.insert(5, " and more", TextAttributes::default()).unwrap();
        assert!(paginator.refresh(&doc, &mut state));
        assert!(state.covers(14));
    }

    struct StuckMeasurer;

    impl LayoutMeasurer for StuckMeasurer {
        fn next_line(&self, _: &AttributedDocument, start: usize, _: f32) -> Option<LineBox> {
            Some(LineBox {
                range: start..start,
                width: 0.0,
                height: 10.0,
                ascent: 8.0,
                space_before: 0.0,
                space_after: 0.0,
                alignment: Alignment::Left,
                ends_paragraph: false,
                spaces: 0,
            })
        }

        fn advance(&self, _: char, _: &TextAttributes) -> f32 {
            0.0
        }

        fn resolve_font(&self, attrs: &TextAttributes) -> ResolvedFont {
            MetricsMeasurer::default().resolve_font(attrs)
        }
    }

    #[test]
    fn test_stuck_layout_still_progresses() {
        let doc = AttributedDocument::from_text("abc", TextAttributes::default());
        let paginator = Paginator::new(PageSetup::letter(), Arc::new(StuckMeasurer));
        let pages = paginator.recompute(&doc, 1);
        assert_eq!(pages.len(), 3);
        assert_partition(&pages, 3);
    }
}
