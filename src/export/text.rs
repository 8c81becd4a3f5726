//! Plain text export.

use super::{Encoded, ExportFormat, ExportOptions, Exporter};
use crate::error::Result;
use crate::session::Snapshot;

/// Writes the raw character sequence as UTF-8; formatting is discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExporter;

impl PlainTextExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for PlainTextExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::PlainText
    }

    fn name(&self) -> &str {
        "text"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt", "text"]
    }

    fn encode(&self, snapshot: &Snapshot, _options: &ExportOptions) -> Result<Encoded> {
        Ok(Encoded {
            bytes: snapshot.document.text().into_bytes(),
            warnings: Vec::new(),
        })
    }
}
