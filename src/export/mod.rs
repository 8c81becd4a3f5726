//! Export pipeline.
//!
//! Exporters serialize a [`Snapshot`] of the session into PDF, RTF, HTML or
//! plain text. Each export reports exactly one [`ExportOutcome`] and writes
//! its destination atomically: on failure or cancellation nothing is left
//! on disk.
//!
//! # Example
//!
//! ```no_run
//! use quire::export::{ExportRequest, ExporterRegistry};
//! use quire::{EditingSession, SessionOptions};
//!
//! fn main() -> quire::Result<()> {
//!     let mut session = EditingSession::with_text("Hello", SessionOptions::default());
//!     let snapshot = session.snapshot()?;
//!
//!     let registry = ExporterRegistry::with_defaults();
//!     let request = ExportRequest::from_path("hello.pdf")?;
//!     let outcome = registry.export(&snapshot, &request, None);
//!     println!("{}", outcome);
//!     Ok(())
//! }
//! ```

mod atomic;
mod html;
mod json;
mod pdf;
mod rtf;
mod text;
mod worker;

pub use atomic::write_atomic;
pub use html::HtmlExporter;
pub use json::{to_json, JsonFormat};
pub use pdf::PdfExporter;
pub use rtf::RtfExporter;
pub use text::PlainTextExporter;
pub use worker::{ExportHandle, ExportWorker};

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::session::Snapshot;

/// Output format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Paginated PDF
    Pdf,
    /// Rich Text Format
    Rtf,
    /// HTML (UTF-8)
    Html,
    /// Plain text (UTF-8)
    PlainText,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Pdf,
        ExportFormat::Rtf,
        ExportFormat::Html,
        ExportFormat::PlainText,
    ];

    /// Preferred file extension.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Rtf => "rtf",
            ExportFormat::Html => "html",
            ExportFormat::PlainText => "txt",
        }
    }

    /// MIME type of the output.
    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Rtf => "application/rtf",
            ExportFormat::Html => "text/html; charset=utf-8",
            ExportFormat::PlainText => "text/plain; charset=utf-8",
        }
    }

    /// Format for a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Some(ExportFormat::Pdf),
            "rtf" => Some(ExportFormat::Rtf),
            "html" | "htm" => Some(ExportFormat::Html),
            "txt" | "text" => Some(ExportFormat::PlainText),
            _ => None,
        }
    }

    /// Format implied by a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Pdf => "PDF",
            ExportFormat::Rtf => "RTF",
            ExportFormat::Html => "HTML",
            ExportFormat::PlainText => "plain text",
        };
        f.write_str(name)
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "plaintext" | "plain-text" => Ok(ExportFormat::PlainText),
            other => Self::from_extension(other).ok_or_else(|| Error::UnknownFormat(other.into())),
        }
    }
}

/// Options shared by every exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Document title written to metadata
    pub title: Option<String>,

    /// Document author written to metadata
    pub author: Option<String>,

    /// Flate-compress PDF content streams
    pub compress: bool,
}

impl ExportOptions {
    /// Create export options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Enable or disable PDF stream compression.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            title: None,
            author: None,
            compress: true,
        }
    }
}

/// A destination plus a format selector.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    /// Destination file
    pub path: PathBuf,

    /// Output format
    pub format: ExportFormat,

    /// Exporter options
    pub options: ExportOptions,
}

impl ExportRequest {
    /// Create a request with default options.
    pub fn new(path: impl Into<PathBuf>, format: ExportFormat) -> Self {
        Self {
            path: path.into(),
            format,
            options: ExportOptions::default(),
        }
    }

    /// Create a request whose format follows the path's extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = ExportFormat::from_path(&path).ok_or_else(|| {
            Error::UnknownFormat(
                path.extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "(no extension)".to_string()),
            )
        })?;
        Ok(Self::new(path, format))
    }

    /// Replace the options.
    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }
}

/// Counts describing an exported document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub characters: usize,
    pub words: usize,
    pub paragraphs: usize,
    pub runs: usize,
    pub pages: usize,
}

impl DocumentStats {
    /// Count a snapshot.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let doc = &snapshot.document;
        Self {
            characters: doc.len(),
            words: doc.text().split_whitespace().count(),
            paragraphs: doc.paragraph_count(),
            runs: doc.run_count(),
            pages: snapshot.pagination.page_count(),
        }
    }
}

/// Terminal result of one export.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    /// The destination was written
    Succeeded {
        destination: PathBuf,
        format: ExportFormat,
        bytes: u64,
        stats: DocumentStats,
        /// Attributes the format could not carry and dropped
        warnings: Vec<String>,
    },
    /// Nothing was written
    Failed {
        /// Human-readable cause
        cause: String,
    },
}

impl ExportOutcome {
    /// Failure carrying the error's message.
    pub fn failed(err: &Error) -> Self {
        ExportOutcome::Failed {
            cause: err.to_string(),
        }
    }

    /// Whether the export succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, ExportOutcome::Succeeded { .. })
    }

    /// Failure cause, if failed.
    pub fn cause(&self) -> Option<&str> {
        match self {
            ExportOutcome::Failed { cause } => Some(cause),
            ExportOutcome::Succeeded { .. } => None,
        }
    }
}

impl fmt::Display for ExportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportOutcome::Succeeded {
                destination,
                format,
                bytes,
                stats,
                ..
            } => write!(
                f,
                "Exported {} ({} pages, {} bytes) to {}",
                format,
                stats.pages,
                bytes,
                destination.display()
            ),
            ExportOutcome::Failed { cause } => write!(f, "Export failed: {}", cause),
        }
    }
}

/// Encoded output of one exporter.
#[derive(Debug, Clone, Default)]
pub struct Encoded {
    /// File contents
    pub bytes: Vec<u8>,

    /// Attributes the format could not carry
    pub warnings: Vec<String>,
}

/// Collects dropped attributes, logging each distinct one once.
#[derive(Debug, Default)]
pub(crate) struct Degradations {
    format: &'static str,
    seen: HashSet<String>,
    messages: Vec<String>,
}

impl Degradations {
    pub(crate) fn new(format: &'static str) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    pub(crate) fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.seen.insert(message.clone()) {
            log::warn!("{} export: {}", self.format, message);
            self.messages.push(message);
        }
    }

    pub(crate) fn merge(&mut self, other: Degradations) {
        for message in other.messages {
            if self.seen.insert(message.clone()) {
                self.messages.push(message);
            }
        }
    }

    pub(crate) fn finish(self, bytes: Vec<u8>) -> Encoded {
        Encoded {
            bytes,
            warnings: self.messages,
        }
    }
}

/// Serializes a snapshot into one output format.
///
/// Implement this trait to add an output format.
pub trait Exporter: Send + Sync {
    /// The format produced.
    fn format(&self) -> ExportFormat;

    /// Name of this exporter.
    fn name(&self) -> &str;

    /// File extensions handled, lowercase without the dot.
    fn supported_extensions(&self) -> &[&str];

    /// Encode the snapshot.
    fn encode(&self, snapshot: &Snapshot, options: &ExportOptions) -> Result<Encoded>;

    /// Check if this exporter handles the given extension.
    fn supports_extension(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.supported_extensions().iter().any(|e| *e == ext_lower)
    }
}

/// Registry mapping formats and file extensions to exporters.
pub struct ExporterRegistry {
    by_extension: HashMap<String, Arc<dyn Exporter>>,
    by_format: HashMap<ExportFormat, Arc<dyn Exporter>>,
    by_name: HashMap<String, Arc<dyn Exporter>>,
}

impl ExporterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            by_extension: HashMap::new(),
            by_format: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Create a registry with the four built-in exporters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PdfExporter::new()));
        registry.register(Arc::new(RtfExporter::new()));
        registry.register(Arc::new(HtmlExporter::new()));
        registry.register(Arc::new(PlainTextExporter::new()));
        registry
    }

    /// Register an exporter for its format and all its extensions.
    pub fn register(&mut self, exporter: Arc<dyn Exporter>) {
        for ext in exporter.supported_extensions() {
            self.by_extension.insert(ext.to_lowercase(), exporter.clone());
        }
        self.by_format.insert(exporter.format(), exporter.clone());
        self.by_name.insert(exporter.name().to_lowercase(), exporter);
    }

    /// Get an exporter by file extension.
    pub fn get_by_extension(&self, ext: &str) -> Option<Arc<dyn Exporter>> {
        self.by_extension.get(&ext.to_lowercase()).cloned()
    }

    /// Get an exporter by format.
    pub fn get_by_format(&self, format: ExportFormat) -> Option<Arc<dyn Exporter>> {
        self.by_format.get(&format).cloned()
    }

    /// Get an exporter by name.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn Exporter>> {
        self.by_name.get(&name.to_lowercase()).cloned()
    }

    /// Check if an extension is supported.
    pub fn supports(&self, ext: &str) -> bool {
        self.by_extension.contains_key(&ext.to_lowercase())
    }

    /// All supported extensions, sorted.
    pub fn supported_extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.by_extension.keys().map(|s| s.as_str()).collect();
        extensions.sort_unstable();
        extensions
    }

    /// Encode and write one export, reporting exactly one outcome.
    ///
    /// When `cancel` is set before the destination is replaced, the
    /// temporary file is discarded and the export fails.
    pub fn export(
        &self,
        snapshot: &Snapshot,
        request: &ExportRequest,
        cancel: Option<&AtomicBool>,
    ) -> ExportOutcome {
        match self.try_export(snapshot, request, cancel) {
            Ok(outcome) => {
                log::info!("{}", outcome);
                outcome
            }
            Err(err) => {
                log::error!(
                    "{} export to {} failed: {}",
                    request.format,
                    request.path.display(),
                    err
                );
                ExportOutcome::failed(&err)
            }
        }
    }

    fn try_export(
        &self,
        snapshot: &Snapshot,
        request: &ExportRequest,
        cancel: Option<&AtomicBool>,
    ) -> Result<ExportOutcome> {
        let is_cancelled = || cancel.map_or(false, |flag| flag.load(Ordering::SeqCst));

        let exporter = self
            .get_by_format(request.format)
            .ok_or_else(|| Error::UnknownFormat(request.format.to_string()))?;
        if is_cancelled() {
            return Err(Error::Cancelled);
        }

        let encoded = exporter.encode(snapshot, &request.options)?;
        let bytes = write_atomic(&request.path, &encoded.bytes, is_cancelled)?;

        Ok(ExportOutcome::Succeeded {
            destination: request.path.clone(),
            format: request.format,
            bytes,
            stats: DocumentStats::from_snapshot(snapshot),
            warnings: encoded.warnings,
        })
    }
}

impl Default for ExporterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Export a snapshot with the built-in exporters, blocking the caller.
pub fn export_snapshot(snapshot: &Snapshot, request: &ExportRequest) -> ExportOutcome {
    ExporterRegistry::with_defaults().export(snapshot, request, None)
}

/// Export on the blocking thread pool without blocking the async caller.
#[cfg(feature = "async")]
pub async fn export_async(snapshot: Snapshot, request: ExportRequest) -> ExportOutcome {
    let destination = request.path.clone();
    match tokio::task::spawn_blocking(move || export_snapshot(&snapshot, &request)).await {
        Ok(outcome) => outcome,
        Err(err) => {
            log::error!("Export task for {} panicked: {}", destination.display(), err);
            ExportOutcome::Failed {
                cause: format!("export task failed: {}", err),
            }
        }
    }
}
