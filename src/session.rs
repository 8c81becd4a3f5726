//! The editing session.
//!
//! An [`EditingSession`] is the single owner of all editor state: the
//! document, the formatting engine, the page list, the selection and the
//! style state. The presentation layer holds the session and calls into it;
//! the session reports back through [`SessionObserver`]s.
//!
//! Pagination is batched. Edits only mark the page list dirty, and
//! [`EditingSession::flush`] recomputes it once against the final state.
//! Call `flush` once per scheduling tick (or rely on [`EditingSession::pages`]
//! and [`EditingSession::snapshot`], which flush first).

use std::ops::Range;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::error::{Error, Result};
use crate::export::{ExportHandle, ExportOutcome, ExportRequest, ExportWorker};
use crate::format::{FormattingEngine, StyleChange};
use crate::layout::{LayoutMeasurer, MetricsMeasurer};
use crate::model::{
    Alignment, AttributedDocument, CharacterStyle, Page, PageSetup, PaginationState,
    ParagraphStyle, Rgb, StyleState, TextAttributes,
};
use crate::paginate::Paginator;

/// Options for a new editing session.
#[derive(Clone)]
pub struct SessionOptions {
    /// Geometry of every page
    pub page_setup: PageSetup,

    /// Floor on the page count (at least 1)
    pub minimum_pages: usize,

    /// Attributes of an empty document and of text typed into it
    pub default_attributes: TextAttributes,

    /// Layout collaborator; `None` uses [`MetricsMeasurer`]
    pub measurer: Option<Arc<dyn LayoutMeasurer>>,
}

impl SessionOptions {
    /// Create session options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page geometry.
    pub fn with_page_setup(mut self, setup: PageSetup) -> Self {
        self.page_setup = setup;
        self
    }

    /// Set the minimum page count (clamped to at least 1).
    pub fn with_minimum_pages(mut self, pages: usize) -> Self {
        self.minimum_pages = pages.max(1);
        self
    }

    /// Set the default attributes.
    pub fn with_default_attributes(mut self, attributes: TextAttributes) -> Self {
        self.default_attributes = attributes.clamped();
        self
    }

    /// Use a custom layout collaborator.
    pub fn with_measurer(mut self, measurer: Arc<dyn LayoutMeasurer>) -> Self {
        self.measurer = Some(measurer);
        self
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            page_setup: PageSetup::letter(),
            minimum_pages: 1,
            default_attributes: TextAttributes::default(),
            measurer: None,
        }
    }
}

impl std::fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOptions")
            .field("page_setup", &self.page_setup)
            .field("minimum_pages", &self.minimum_pages)
            .field("default_attributes", &self.default_attributes)
            .field("custom_measurer", &self.measurer.is_some())
            .finish()
    }
}

/// Notification sent to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The page list was recomputed and differs from the previous one
    PageListChanged(Vec<Page>),
    /// The style state shown by the controls changed
    StyleStateChanged(StyleState),
}

/// Receives session notifications.
///
/// Both methods default to doing nothing, so observers implement only what
/// they render.
pub trait SessionObserver: Send {
    /// The page list changed.
    fn page_list_changed(&mut self, _pages: &[Page]) {}

    /// The style state changed.
    fn style_state_changed(&mut self, _state: &StyleState) {}
}

/// Forwards notifications over a channel, for presentation layers running
/// their own event loop.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: Sender<SessionEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its channel.
    pub fn new() -> (Self, Receiver<SessionEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }

    fn send(&self, event: SessionEvent) {
        if self.sender.send(event).is_err() {
            log::debug!("Session event receiver dropped");
        }
    }
}

impl SessionObserver for ChannelObserver {
    fn page_list_changed(&mut self, pages: &[Page]) {
        self.send(SessionEvent::PageListChanged(pages.to_vec()));
    }

    fn style_state_changed(&mut self, state: &StyleState) {
        self.send(SessionEvent::StyleStateChanged(state.clone()));
    }
}

/// Immutable view of the document and its page list at one instant.
///
/// Exports read a snapshot, so later edits never tear an in-flight export.
#[derive(Clone)]
pub struct Snapshot {
    /// Document content and attributes
    pub document: Arc<AttributedDocument>,

    /// Page list computed for `document`
    pub pagination: Arc<PaginationState>,

    /// Page geometry
    pub setup: PageSetup,

    /// The layout collaborator that produced `pagination`
    pub measurer: Arc<dyn LayoutMeasurer>,
}

impl Snapshot {
    /// Paginate `document` and freeze the result.
    pub fn new(
        document: AttributedDocument,
        setup: PageSetup,
        minimum_pages: usize,
        measurer: Arc<dyn LayoutMeasurer>,
    ) -> Self {
        let paginator = Paginator::new(setup, Arc::clone(&measurer));
        let mut pagination = PaginationState::new(minimum_pages, setup);
        paginator.refresh(&document, &mut pagination);
        Self {
            document: Arc::new(document),
            pagination: Arc::new(pagination),
            setup,
            measurer,
        }
    }

    /// Pages in order.
    pub fn pages(&self) -> &[Page] {
        &self.pagination.pages
    }

    /// Text laid out on page `index`.
    pub fn page_text(&self, index: usize) -> Option<String> {
        let page = self.pagination.get_page(index)?;
        self.document.slice(page.range.clone()).ok()
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("characters", &self.document.len())
            .field("revision", &self.document.revision())
            .field("pages", &self.pagination.page_count())
            .field("setup", &self.setup)
            .finish()
    }
}

/// Owner of one document and everything derived from it.
pub struct EditingSession {
    document: AttributedDocument,
    formatting: FormattingEngine,
    paginator: Paginator,
    pagination: PaginationState,
    selection: Range<usize>,
    style: StyleState,
    observers: Vec<Box<dyn SessionObserver>>,
    dirty: bool,
    recompute_count: usize,
    closed: bool,
}

impl EditingSession {
    /// Start a session on an empty document.
    pub fn new(options: SessionOptions) -> Self {
        let measurer = options
            .measurer
            .unwrap_or_else(|| Arc::new(MetricsMeasurer::default()));
        let document = AttributedDocument::with_default_attributes(options.default_attributes);
        let style = StyleState::from_attributes(document.default_attributes().clone());
        Self {
            pagination: PaginationState::new(options.minimum_pages, options.page_setup),
            paginator: Paginator::new(options.page_setup, measurer),
            document,
            formatting: FormattingEngine::new(),
            selection: 0..0,
            style,
            observers: Vec::new(),
            dirty: false,
            recompute_count: 0,
            closed: false,
        }
    }

    /// Start a session holding `text` in the default attributes.
    pub fn with_text(text: &str, options: SessionOptions) -> Self {
        let mut session = Self::new(options);
        let attributes = session.document.default_attributes().clone();
        session.document.replace_content(text, attributes);
        session.dirty = true;
        session
    }

    /// Register an observer.
    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    /// The document.
    pub fn document(&self) -> &AttributedDocument {
        &self.document
    }

    /// The page list as of the last flush; see [`EditingSession::pages`].
    pub fn pagination(&self) -> &PaginationState {
        &self.pagination
    }

    /// Page geometry.
    pub fn page_setup(&self) -> PageSetup {
        self.paginator.setup()
    }

    /// Current selection (empty = caret).
    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    /// The style state shown by the controls.
    pub fn style_state(&self) -> &StyleState {
        &self.style
    }

    /// The formatting engine.
    pub fn formatting(&self) -> &FormattingEngine {
        &self.formatting
    }

    /// Whether a recompute is pending.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of pagination recomputes run so far.
    pub fn recompute_count(&self) -> usize {
        self.recompute_count
    }

    /// Whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whole-content edit from the text control.
    ///
    /// Reduced to the minimal changed span, so untouched characters keep
    /// their attributes. The caret moves to the end of the inserted text.
    pub fn on_content_edited(&mut self, new_text: &str) -> Result<()> {
        self.ensure_open()?;
        let old: Vec<char> = self.document.chars_from(0).collect();
        let new: Vec<char> = new_text.chars().collect();

        let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
        let max_suffix = old.len().min(new.len()) - prefix;
        let suffix = old
            .iter()
            .rev()
            .zip(new.iter().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();

        let removed = prefix..old.len() - suffix;
        let inserted: String = new[prefix..new.len() - suffix].iter().collect();
        if removed.is_empty() && inserted.is_empty() {
            return Ok(());
        }
        self.replace(removed, &inserted)
    }

    /// Insert `text` at `offset`.
    pub fn insert_text(&mut self, offset: usize, text: &str) -> Result<()> {
        self.ensure_open()?;
        self.replace(offset..offset, text)
    }

    /// Delete the characters in `range`.
    pub fn delete_range(&mut self, range: Range<usize>) -> Result<()> {
        self.ensure_open()?;
        self.replace(range, "")
    }

    /// Replace everything with `text` in the default attributes.
    pub fn replace_content(&mut self, text: &str) -> Result<()> {
        self.ensure_open()?;
        let attributes = self.document.default_attributes().clone();
        self.document.replace_content(text, attributes);
        self.formatting.clear_typing_attributes();
        self.dirty = true;
        self.selection = 0..0;
        self.refresh_style();
        Ok(())
    }

    /// The selection moved.
    pub fn on_selection_changed(&mut self, range: Range<usize>) -> Result<&StyleState> {
        self.ensure_open()?;
        let length = self.document.len();
        if range.start > range.end || range.start > length {
            return Err(Error::out_of_bounds(range.start, length));
        }
        if range.end > length {
            return Err(Error::out_of_bounds(range.end, length));
        }
        if range != self.selection {
            self.formatting.clear_typing_attributes();
            self.selection = range;
        }
        self.refresh_style();
        Ok(&self.style)
    }

    /// A style control changed one field.
    pub fn on_style_control_changed(&mut self, change: StyleChange) -> Result<&StyleState> {
        self.ensure_open()?;
        let applied =
            self.formatting
                .apply_change(&mut self.document, self.selection.clone(), &change)?;
        if applied.touched_document() && change.affects_layout() {
            self.dirty = true;
        }
        self.refresh_style();
        Ok(&self.style)
    }

    /// Write a full style state to the selection.
    pub fn apply_style_state(&mut self, state: &StyleState) -> Result<&StyleState> {
        self.ensure_open()?;
        let relayout = match self.document.runs_in(self.selection.clone()) {
            Ok(runs) => runs
                .iter()
                .any(|run| !run.attributes.same_geometry(&state.attributes)),
            Err(_) => false,
        };
        let applied =
            self.formatting
                .apply_to_selection(&mut self.document, self.selection.clone(), state)?;
        if applied.touched_document() && relayout {
            self.dirty = true;
        }
        self.refresh_style();
        Ok(&self.style)
    }

    pub fn update_font_family(&mut self, family: &str) -> Result<&StyleState> {
        self.on_style_control_changed(StyleChange::FontFamily(family.to_string()))
    }

    pub fn update_font_size(&mut self, size: f32) -> Result<&StyleState> {
        self.on_style_control_changed(StyleChange::FontSize(size))
    }

    pub fn toggle_bold(&mut self) -> Result<&StyleState> {
        let on = !self.style.attributes.bold;
        self.on_style_control_changed(StyleChange::Bold(on))
    }

    pub fn toggle_italic(&mut self) -> Result<&StyleState> {
        let on = !self.style.attributes.italic;
        self.on_style_control_changed(StyleChange::Italic(on))
    }

    pub fn toggle_underline(&mut self) -> Result<&StyleState> {
        let on = !self.style.attributes.underline;
        self.on_style_control_changed(StyleChange::Underline(on))
    }

    pub fn toggle_strikethrough(&mut self) -> Result<&StyleState> {
        let on = !self.style.attributes.strikethrough;
        self.on_style_control_changed(StyleChange::Strikethrough(on))
    }

    pub fn update_text_color(&mut self, color: Rgb) -> Result<&StyleState> {
        self.on_style_control_changed(StyleChange::TextColor(color))
    }

    pub fn update_alignment(&mut self, alignment: Alignment) -> Result<&StyleState> {
        self.on_style_control_changed(StyleChange::Alignment(alignment))
    }

    pub fn update_line_spacing(&mut self, spacing: f32) -> Result<&StyleState> {
        self.on_style_control_changed(StyleChange::LineSpacing(spacing))
    }

    pub fn update_paragraph_spacing_before(&mut self, points: f32) -> Result<&StyleState> {
        self.on_style_control_changed(StyleChange::SpacingBefore(points))
    }

    pub fn update_paragraph_spacing_after(&mut self, points: f32) -> Result<&StyleState> {
        self.on_style_control_changed(StyleChange::SpacingAfter(points))
    }

    pub fn apply_character_style(&mut self, style: CharacterStyle) -> Result<&StyleState> {
        self.on_style_control_changed(StyleChange::CharacterStyle(style))
    }

    pub fn apply_paragraph_style(&mut self, style: ParagraphStyle) -> Result<&StyleState> {
        self.on_style_control_changed(StyleChange::ParagraphStyle(style))
    }

    /// Change the floor on the page count (clamped to at least 1).
    pub fn set_minimum_page_count(&mut self, pages: usize) -> Result<()> {
        self.ensure_open()?;
        let pages = pages.max(1);
        if pages != self.pagination.minimum_page_count {
            self.pagination.minimum_page_count = pages;
            self.dirty = true;
        }
        Ok(())
    }

    /// Run the pending pagination recompute, if any.
    ///
    /// Returns whether the page list changed. Observers hear about the new
    /// list only when it differs from the old one.
    pub fn flush(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;
        self.recompute_count += 1;
        let changed = self.paginator.refresh(&self.document, &mut self.pagination);
        if changed {
            for observer in &mut self.observers {
                observer.page_list_changed(&self.pagination.pages);
            }
        }
        changed
    }

    /// The up-to-date page list.
    pub fn pages(&mut self) -> &[Page] {
        self.flush();
        &self.pagination.pages
    }

    /// Freeze the document and page list for export.
    pub fn snapshot(&mut self) -> Result<Snapshot> {
        self.ensure_open()?;
        self.flush();
        Ok(Snapshot {
            document: Arc::new(self.document.clone()),
            pagination: Arc::new(self.pagination.clone()),
            setup: self.paginator.setup(),
            measurer: Arc::clone(self.paginator.measurer()),
        })
    }

    /// Export the current state, blocking until the file is written.
    ///
    /// A closed session fails before any I/O.
    pub fn export(&mut self, request: &ExportRequest) -> ExportOutcome {
        match self.snapshot() {
            Ok(snapshot) => crate::export::export_snapshot(&snapshot, request),
            Err(err) => {
                log::error!("Export to {} refused: {}", request.path.display(), err);
                ExportOutcome::failed(&err)
            }
        }
    }

    /// Queue an export of the current state on `worker`.
    pub fn export_in_background(
        &mut self,
        worker: &ExportWorker,
        request: ExportRequest,
    ) -> Result<ExportHandle> {
        let snapshot = self.snapshot()?;
        Ok(worker.submit(snapshot, request))
    }

    /// End the session. Later edits and exports fail with
    /// [`Error::ResourceUnavailable`].
    pub fn close(&mut self) {
        if !self.closed {
            log::debug!("Closing session at revision {}", self.document.revision());
        }
        self.closed = true;
        self.observers.clear();
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::ResourceUnavailable(
                "the editing session is closed".to_string(),
            ));
        }
        Ok(())
    }

    fn replace(&mut self, range: Range<usize>, text: &str) -> Result<()> {
        let attributes = self.formatting.insertion_attributes(&self.document, range.start);
        self.document.replace_range(range.clone(), text, attributes)?;
        self.dirty = true;
        self.selection = {
            let caret = range.start + text.chars().count();
            caret..caret
        };
        self.refresh_style();
        Ok(())
    }

    fn refresh_style(&mut self) {
        let state = match self
            .formatting
            .read_from_selection(&self.document, self.selection.clone())
        {
            Ok(state) => state,
            Err(err) => {
                log::warn!("Selection {:?} no longer valid: {}", self.selection, err);
                self.selection = self.document.len()..self.document.len();
                StyleState::from_attributes(
                    self.formatting
                        .insertion_attributes(&self.document, self.selection.start),
                )
            }
        };
        if state != self.style {
            self.style = state;
            for observer in &mut self.observers {
                observer.style_state_changed(&self.style);
            }
        }
    }
}

impl Default for EditingSession {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl std::fmt::Debug for EditingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditingSession")
            .field("characters", &self.document.len())
            .field("selection", &self.selection)
            .field("pages", &self.pagination.page_count())
            .field("dirty", &self.dirty)
            .field("closed", &self.closed)
            .finish()
    }
}
