//! # quire
//!
//! Paginated rich-text document core for word-processor style editors.
//!
//! This library owns a single attributed text buffer, keeps its style runs
//! consistent under edits and formatting, partitions it into fixed-size pages
//! by layout overflow, and exports it to PDF, RTF, HTML and plain text.
//!
//! ## Quick Start
//!
//! ```no_run
//! use quire::{EditingSession, ExportRequest, ParagraphStyle, SessionOptions};
//!
//! fn main() -> quire::Result<()> {
//!     let mut session = EditingSession::new(SessionOptions::default());
//!     session.on_content_edited("Quarterly report\nRevenue grew.")?;
//!
//!     // Style the first paragraph as a title
//!     session.on_selection_changed(0..16)?;
//!     session.apply_paragraph_style(ParagraphStyle::Title)?;
//!
//!     println!("{} pages", session.pages().len());
//!
//!     let outcome = session.export(&ExportRequest::from_path("report.pdf")?);
//!     println!("{}", outcome);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Attributed document store**: run-length encoded styles over a rope
//! - **Formatting**: clamped style controls, toggles, character and paragraph presets
//! - **Pagination**: idempotent overflow-driven page partition, batched per tick
//! - **Export**: paginated PDF matching on-screen breaks, RTF, HTML, plain text
//! - **Atomic writes**: exports never leave partial files behind
//! - **Background export**: a worker thread over immutable snapshots

pub mod error;
pub mod export;
pub mod format;
pub mod layout;
pub mod model;
pub mod paginate;
pub mod session;

// Re-export commonly used types
pub use error::{Error, Result};
pub use export::{
    DocumentStats, ExportFormat, ExportHandle, ExportOptions, ExportOutcome, ExportRequest,
    ExportWorker, Exporter, ExporterRegistry, JsonFormat,
};
pub use format::{Applied, FormattingEngine, StyleChange};
pub use layout::{
    FontCatalog, FontResolver, Fit, LayoutMeasurer, LineBox, MetricsMeasurer, ResolvedFont,
};
pub use model::{
    Alignment, AttributeRun, AttributedDocument, CharacterStyle, Margins, Page, PageSetup,
    PaginationState, ParagraphStyle, Rgb, Size, StyleState, TextAttributes,
};
pub use paginate::Paginator;
pub use session::{
    ChannelObserver, EditingSession, SessionEvent, SessionObserver, SessionOptions, Snapshot,
};

use std::path::Path;

/// Paginate plain text with default settings.
///
/// # Example
///
/// ```
/// let pages = quire::paginate_text(&"x".repeat(10_000));
/// assert_eq!(pages.len(), 3);
/// ```
pub fn paginate_text(text: &str) -> Vec<Page> {
    let mut session = EditingSession::with_text(text, SessionOptions::default());
    session.pages().to_vec()
}

/// Export plain text to `path`, choosing the format from its extension.
///
/// # Example
///
/// ```no_run
/// let outcome = quire::export_text("Hello", "hello.pdf").unwrap();
/// assert!(outcome.is_success());
/// ```
pub fn export_text<P: AsRef<Path>>(text: &str, path: P) -> Result<ExportOutcome> {
    let request = ExportRequest::from_path(path.as_ref())?;
    let mut session = EditingSession::with_text(text, SessionOptions::default());
    Ok(session.export(&request))
}

/// Builder for configuring and starting an editing session.
///
/// # Example
///
/// ```
/// use quire::{Quire, PageSetup};
///
/// let mut session = Quire::new()
///     .page_setup(PageSetup::a4())
///     .minimum_pages(2)
///     .text("Hello")
///     .build();
/// assert_eq!(session.pages().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct Quire {
    options: SessionOptions,
    text: Option<String>,
}

impl Quire {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page geometry.
    pub fn page_setup(mut self, setup: PageSetup) -> Self {
        self.options = self.options.with_page_setup(setup);
        self
    }

    /// Set the minimum page count.
    pub fn minimum_pages(mut self, pages: usize) -> Self {
        self.options = self.options.with_minimum_pages(pages);
        self
    }

    /// Set the default attributes.
    pub fn default_attributes(mut self, attributes: TextAttributes) -> Self {
        self.options = self.options.with_default_attributes(attributes);
        self
    }

    /// Use a custom layout collaborator.
    pub fn measurer(mut self, measurer: std::sync::Arc<dyn LayoutMeasurer>) -> Self {
        self.options = self.options.with_measurer(measurer);
        self
    }

    /// Initial document text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Start the session.
    pub fn build(self) -> EditingSession {
        match self.text {
            Some(text) => EditingSession::with_text(&text, self.options),
            None => EditingSession::new(self.options),
        }
    }
}
