//! Integration tests for pagination under editing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use quire::{
    AttributedDocument, EditingSession, MetricsMeasurer, PageSetup, Paginator, SessionOptions,
    TextAttributes,
};

fn paginator() -> Paginator {
    Paginator::new(PageSetup::letter(), Arc::new(MetricsMeasurer::default()))
}

/// Check the session's pages against a from-scratch recompute.
fn assert_consistent(session: &mut EditingSession) {
    let minimum = session.pagination().minimum_page_count;
    let pages = session.pages().to_vec();
    let length = session.document().len();

    assert!(session.pagination().covers(length), "gap or overlap in {:?}", pages);
    assert_eq!(pages, paginator().recompute(session.document(), minimum));
}

#[test]
fn test_ten_thousand_characters_then_delete() {
    let mut session = EditingSession::default();
    session.on_content_edited(&"x".repeat(10_000)).unwrap();

    let pages = session.pages().to_vec();
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0].range, 0..4165);
    assert_eq!(pages[1].range, 4165..8330);
    assert_eq!(pages[2].range, 8330..10_000);

    session.delete_range(1..10_000).unwrap();
    let pages = session.pages().to_vec();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].range, 0..1);
}

#[test]
fn test_partition_survives_edit_sequence() {
    let mut session = EditingSession::with_text(
        &"Lorem ipsum dolor sit amet, consectetur adipiscing elit.\n".repeat(150),
        SessionOptions::default(),
    );
    assert_consistent(&mut session);

    session.insert_text(0, &"word ".repeat(900)).unwrap();
    assert_consistent(&mut session);

    session.delete_range(100..3000).unwrap();
    assert_consistent(&mut session);

    let len = session.document().len();
    session.insert_text(len, "\n\n\n\n").unwrap();
    assert_consistent(&mut session);

    session.on_selection_changed(0..500).unwrap();
    session.update_font_size(30.0).unwrap();
    assert_consistent(&mut session);

    session.update_line_spacing(2.5).unwrap();
    assert_consistent(&mut session);

    session.replace_content("").unwrap();
    assert_consistent(&mut session);
    assert_eq!(session.pages().len(), 1);
}

#[test]
fn test_minimum_page_count_is_a_floor() {
    let options = SessionOptions::default().with_minimum_pages(5);
    let mut session = EditingSession::with_text("short", options);
    let pages = session.pages().to_vec();
    assert_eq!(pages.len(), 5);
    assert_eq!(pages[0].range, 0..5);
    assert!(pages[1..].iter().all(|page| page.range == (5..5)));

    session.on_content_edited(&"x".repeat(30_000)).unwrap();
    assert_eq!(session.pages().len(), 8);

    session.set_minimum_page_count(2).unwrap();
    session.replace_content("").unwrap();
    assert_eq!(session.pages().len(), 2);
}

#[test]
fn test_recompute_is_idempotent() {
    let doc = AttributedDocument::from_text(
        &"Paragraph text that wraps across several lines of the page.\n".repeat(400),
        TextAttributes::default(),
    );
    let paginator = paginator();
    let first = paginator.recompute(&doc, 1);
    let second = paginator.recompute(&doc, 1);
    assert_eq!(first, second);
    assert!(first.len() > 1);
}

#[test]
fn test_edits_batch_into_one_recompute() {
    let mut session = EditingSession::default();
    for i in 0..200 {
        session.insert_text(i, "a").unwrap();
    }
    assert!(session.is_dirty());
    assert_eq!(session.recompute_count(), 0);

    session.flush();
    assert_eq!(session.recompute_count(), 1);
    assert!(!session.flush());
    assert_eq!(session.recompute_count(), 1);
}

#[test]
fn test_a4_fits_more_lines_than_letter() {
    let text = "x".repeat(50_000);
    let letter = EditingSession::with_text(&text, SessionOptions::default())
        .pages()
        .len();
    let a4 = EditingSession::with_text(
        &text,
        SessionOptions::default().with_page_setup(PageSetup::a4()),
    )
    .pages()
    .len();
    assert_eq!(letter, 13);
    assert!(a4 < letter);
}

/// `words` copies of `word` followed by `separator`, alternating plain and bold.
fn alternating_runs(words: usize, separator: char) -> AttributedDocument {
    let bold = TextAttributes {
        bold: true,
        ..Default::default()
    };
    let pieces = (0..words).map(|i| {
        let attributes = if i % 2 == 0 {
            TextAttributes::default()
        } else {
            bold.clone()
        };
        (format!("word{}", separator), attributes)
    });
    AttributedDocument::from_runs(pieces, TextAttributes::default())
}

/// Fastest of three recomputes.
fn time_recompute(doc: &AttributedDocument) -> Duration {
    let paginator = paginator();
    (0..3)
        .map(|_| {
            let started = Instant::now();
            let pages = paginator.recompute(doc, 1);
            let elapsed = started.elapsed();
            assert_eq!(pages.last().map(|page| page.range.end), Some(doc.len()));
            elapsed
        })
        .min()
        .unwrap_or_default()
}

#[test]
fn test_recompute_scales_linearly_with_runs_and_paragraph_length() {
    for separator in ['\n', ' '] {
        let small = alternating_runs(4_000, separator);
        let large = alternating_runs(16_000, separator);
        assert_eq!(large.run_count(), 16_000);

        let small_time = time_recompute(&small);
        let large_time = time_recompute(&large);
        // Four times the input: about 4x when linear, 16x when quadratic
        assert!(
            large_time.as_secs_f64() < small_time.as_secs_f64() * 10.0 + 0.05,
            "separator {:?}: {:?} for {} chars vs {:?} for {} chars",
            separator,
            large_time,
            large.len(),
            small_time,
            small.len()
        );
    }
}
