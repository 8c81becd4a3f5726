//! Integration tests for background export.

use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};

use quire::export::Encoded;
use quire::{
    EditingSession, ExportFormat, ExportOptions, ExportRequest, ExportWorker, Exporter,
    ExporterRegistry, SessionOptions, Snapshot,
};

/// Plain-text exporter that holds each job until released.
struct GatedExporter {
    started: Sender<()>,
    release: Mutex<Receiver<()>>,
}

impl Exporter for GatedExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::PlainText
    }

    fn name(&self) -> &str {
        "gated"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt"]
    }

    fn encode(&self, snapshot: &Snapshot, _options: &ExportOptions) -> quire::Result<Encoded> {
        let _ = self.started.send(());
        if let Ok(release) = self.release.lock() {
            let _ = release.recv_timeout(Duration::from_secs(10));
        }
        Ok(Encoded {
            bytes: snapshot.document.text().into_bytes(),
            warnings: Vec::new(),
        })
    }
}

/// A worker whose exports block until a message is sent on the returned sender.
fn gated_worker() -> (ExportWorker, Receiver<()>, Sender<()>) {
    let (started_tx, started_rx) = bounded(8);
    let (release_tx, release_rx) = bounded(8);
    let mut registry = ExporterRegistry::new();
    registry.register(Arc::new(GatedExporter {
        started: started_tx,
        release: Mutex::new(release_rx),
    }));
    let worker = ExportWorker::with_registry(Arc::new(registry)).unwrap();
    (worker, started_rx, release_tx)
}

#[test]
fn test_cancel_during_encode_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cancelled.txt");
    let (worker, started, release) = gated_worker();

    let mut session = EditingSession::with_text("draft", SessionOptions::default());
    let handle = session
        .export_in_background(&worker, ExportRequest::new(&path, ExportFormat::PlainText))
        .unwrap();

    started.recv_timeout(Duration::from_secs(10)).unwrap();
    handle.cancel();
    assert!(handle.is_cancelled());
    release.send(()).unwrap();

    let outcome = handle.wait();
    assert!(!outcome.is_success());
    assert_eq!(outcome.cause(), Some("Operation cancelled"));
    assert!(!path.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_edits_after_submit_do_not_reach_export() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.txt");
    let (worker, started, release) = gated_worker();

    let mut session = EditingSession::with_text("before", SessionOptions::default());
    let handle = session
        .export_in_background(&worker, ExportRequest::new(&path, ExportFormat::PlainText))
        .unwrap();
    started.recv_timeout(Duration::from_secs(10)).unwrap();

    session.on_content_edited("after the export started").unwrap();
    assert!(handle.try_outcome().is_none());
    release.send(()).unwrap();

    let outcome = handle.wait();
    assert!(outcome.is_success(), "{}", outcome);
    assert_eq!(fs::read_to_string(&path).unwrap(), "before");
}

#[test]
fn test_wait_timeout_while_blocked() {
    let dir = tempfile::tempdir().unwrap();
    let (worker, started, release) = gated_worker();

    let mut session = EditingSession::with_text("slow", SessionOptions::default());
    let handle = session
        .export_in_background(
            &worker,
            ExportRequest::new(dir.path().join("slow.txt"), ExportFormat::PlainText),
        )
        .unwrap();
    started.recv_timeout(Duration::from_secs(10)).unwrap();

    assert!(handle.wait_timeout(Duration::from_millis(20)).is_none());
    release.send(()).unwrap();
    let outcome = handle.wait_timeout(Duration::from_secs(10)).unwrap();
    assert!(outcome.is_success());
}

#[test]
fn test_jobs_run_in_submission_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ordered.html");
    let worker = ExportWorker::new().unwrap();
    let mut session = EditingSession::with_text("first", SessionOptions::default());

    let first = session
        .export_in_background(&worker, ExportRequest::from_path(&path).unwrap())
        .unwrap();
    session.on_content_edited("second").unwrap();
    let second = session
        .export_in_background(&worker, ExportRequest::from_path(&path).unwrap())
        .unwrap();

    assert!(first.wait().is_success());
    assert!(second.wait().is_success());
    let html = fs::read_to_string(&path).unwrap();
    assert!(html.contains("second"));
    assert!(!html.contains("first"));
    worker.shutdown();
}

#[test]
fn test_closed_session_refuses_background_export() {
    let worker = ExportWorker::new().unwrap();
    let mut session = EditingSession::default();
    session.close();
    let result = session.export_in_background(
        &worker,
        ExportRequest::new("never.txt", ExportFormat::PlainText),
    );
    assert!(matches!(result, Err(quire::Error::ResourceUnavailable(_))));
}
