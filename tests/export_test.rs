//! Integration tests for the export pipeline.

use std::fs;
use std::sync::Arc;

use lopdf::content::Content;
use lopdf::{Document, Object};

use quire::export::Encoded;
use quire::{
    EditingSession, ExportFormat, ExportOptions, ExportOutcome, ExportRequest, Exporter,
    ExporterRegistry, ParagraphStyle, Rgb, SessionOptions, Snapshot,
};

/// Exporter that writes one line per page.
struct PageListExporter;

impl Exporter for PageListExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::PlainText
    }

    fn name(&self) -> &str {
        "pages"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pages"]
    }

    fn encode(&self, snapshot: &Snapshot, _options: &ExportOptions) -> quire::Result<Encoded> {
        let lines: Vec<String> = snapshot
            .pages()
            .iter()
            .map(|page| format!("{} {}..{}", page.index, page.range.start, page.range.end))
            .collect();
        Ok(Encoded {
            bytes: lines.join("\n").into_bytes(),
            warnings: Vec::new(),
        })
    }
}

fn sample_session() -> EditingSession {
    let mut session = EditingSession::with_text(
        "Annual Report\nSales rose sharply this year.\nCosts held steady.",
        SessionOptions::default(),
    );
    session.on_selection_changed(0..3).unwrap();
    session.apply_paragraph_style(ParagraphStyle::Title).unwrap();
    session.on_selection_changed(20..24).unwrap();
    session.update_text_color(Rgb::new(0xcc, 0, 0)).unwrap();
    session
}

#[test]
fn test_pdf_file_matches_page_list() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long.pdf");
    let mut session = EditingSession::with_text(
        &"Pack my box with five dozen liquor jugs.\n".repeat(300),
        SessionOptions::default(),
    );
    let page_count = session.pages().len();
    assert!(page_count > 1);

    let request = ExportRequest::from_path(&path)
        .unwrap()
        .with_options(ExportOptions::new().with_title("Jugs").with_compression(false));
    let outcome = session.export(&request);
    assert!(outcome.is_success(), "{}", outcome);

    let pdf = Document::load(&path).unwrap();
    let pages = pdf.get_pages();
    assert_eq!(pages.len(), page_count);

    let first = *pages.values().next().unwrap();
    let content = Content::decode(&pdf.get_page_content(first).unwrap()).unwrap();
    let shown: Vec<u8> = content
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| match op.operands.first() {
            Some(Object::String(bytes, _)) => Some(bytes.clone()),
            _ => None,
        })
        .flatten()
        .collect();
    assert!(String::from_utf8_lossy(&shown).starts_with("Pack my box"));
}

#[test]
fn test_every_format_writes_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = sample_session();

    for format in ExportFormat::ALL {
        let path = dir.path().join(format!("report.{}", format.extension()));
        let outcome = session.export(&ExportRequest::new(&path, format));
        match outcome {
            ExportOutcome::Succeeded {
                destination,
                bytes,
                stats,
                ..
            } => {
                assert_eq!(destination, path);
                assert_eq!(bytes, fs::metadata(&path).unwrap().len());
                assert_eq!(stats.paragraphs, 3);
                assert_eq!(stats.pages, 1);
            }
            ExportOutcome::Failed { cause } => panic!("{} export failed: {}", format, cause),
        }
    }

    let text = fs::read_to_string(dir.path().join("report.txt")).unwrap();
    assert_eq!(text, session.document().text());

    let rtf = fs::read_to_string(dir.path().join("report.rtf")).unwrap();
    assert!(rtf.starts_with("{\\rtf1\\ansi"));
    assert!(rtf.contains("\\fs48"));
    assert!(rtf.contains("\\red204\\green0\\blue0;"));

    let html = fs::read_to_string(dir.path().join("report.html")).unwrap();
    assert!(html.contains("font-size: 24pt;"));
    assert!(html.contains("color: #cc0000;"));
    assert_eq!(html.matches("<p ").count(), 3);
}

#[test]
fn test_unknown_extension_is_rejected() {
    assert!(ExportRequest::from_path("notes.docx").is_err());
    assert!(ExportRequest::from_path("notes").is_err());
    assert_eq!(
        ExportRequest::from_path("NOTES.HTM").unwrap().format,
        ExportFormat::Html
    );
}

#[test]
fn test_missing_directory_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("out.pdf");
    let mut session = sample_session();

    let outcome = session.export(&ExportRequest::new(&path, ExportFormat::Pdf));
    assert!(!outcome.is_success());
    assert!(outcome.cause().is_some());
    assert!(!path.exists());
}

#[test]
fn test_failed_export_keeps_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keep.txt");
    fs::write(&path, "original").unwrap();

    let mut session = EditingSession::with_text("replacement", SessionOptions::default());
    session.close();
    let outcome = session.export(&ExportRequest::new(&path, ExportFormat::PlainText));
    assert!(!outcome.is_success());
    assert_eq!(fs::read_to_string(&path).unwrap(), "original");
}

#[test]
fn test_custom_exporter_registration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("list.pages");

    let mut registry = ExporterRegistry::new();
    registry.register(Arc::new(PageListExporter));
    assert!(registry.supports("PAGES"));
    assert!(registry.get_by_name("pages").is_some());
    assert_eq!(registry.supported_extensions(), vec!["pages"]);

    let mut session = EditingSession::with_text(
        &"x".repeat(5000),
        SessionOptions::default().with_minimum_pages(3),
    );
    let snapshot = session.snapshot().unwrap();
    let outcome = registry.export(
        &snapshot,
        &ExportRequest::new(&path, ExportFormat::PlainText),
        None,
    );
    assert!(outcome.is_success(), "{}", outcome);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "0 0..4165\n1 4165..5000\n2 5000..5000"
    );
}

#[test]
fn test_default_registry_lookup() {
    let registry = ExporterRegistry::with_defaults();
    assert_eq!(
        registry.supported_extensions(),
        vec!["htm", "html", "pdf", "rtf", "text", "txt"]
    );
    assert_eq!(
        registry.get_by_extension("PDF").unwrap().format(),
        ExportFormat::Pdf
    );
    assert!(registry.get_by_format(ExportFormat::Rtf).is_some());
    assert!(!registry.supports("docx"));
}
