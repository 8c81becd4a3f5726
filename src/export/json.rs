//! JSON page map of a snapshot.

use serde::Serialize;

use super::DocumentStats;
use crate::error::Result;
use crate::model::{AttributeRun, Page, PageSetup};
use crate::session::Snapshot;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

#[derive(Serialize)]
struct PageMap<'a> {
    revision: u64,
    setup: PageSetup,
    stats: DocumentStats,
    pages: &'a [Page],
    runs: Vec<AttributeRun>,
}

/// Serialize the page list and attribute runs of a snapshot.
pub fn to_json(snapshot: &Snapshot, format: JsonFormat) -> Result<String> {
    let map = PageMap {
        revision: snapshot.document.revision(),
        setup: snapshot.setup,
        stats: DocumentStats::from_snapshot(snapshot),
        pages: snapshot.pages(),
        runs: snapshot.document.runs(),
    };
    let json = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(&map)?,
        JsonFormat::Compact => serde_json::to_string(&map)?,
    };
    Ok(json)
}
