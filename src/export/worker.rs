//! Background export worker.
//!
//! Exports run on a dedicated thread fed through a channel, so the editing
//! session never blocks on encoding or disk I/O. Each job owns its snapshot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use super::{ExportOutcome, ExportRequest, ExporterRegistry};
use crate::error::{Error, Result};
use crate::session::Snapshot;

struct Job {
    snapshot: Snapshot,
    request: ExportRequest,
    cancel: Arc<AtomicBool>,
    reply: Sender<ExportOutcome>,
}

/// A thread that runs exports one at a time.
pub struct ExportWorker {
    jobs: Option<Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl ExportWorker {
    /// Start a worker with the built-in exporters.
    pub fn new() -> Result<Self> {
        Self::with_registry(Arc::new(ExporterRegistry::with_defaults()))
    }

    /// Start a worker with a custom registry.
    pub fn with_registry(registry: Arc<ExporterRegistry>) -> Result<Self> {
        let (jobs, queue) = crossbeam_channel::unbounded::<Job>();
        let thread = std::thread::Builder::new()
            .name("quire-export".to_string())
            .spawn(move || {
                for job in queue {
                    let outcome = registry.export(&job.snapshot, &job.request, Some(&job.cancel));
                    if job.reply.send(outcome).is_err() {
                        log::debug!(
                            "Export result for {} dropped by caller",
                            job.request.path.display()
                        );
                    }
                }
            })?;
        Ok(Self {
            jobs: Some(jobs),
            thread: Some(thread),
        })
    }

    /// Queue an export of `snapshot`.
    pub fn submit(&self, snapshot: Snapshot, request: ExportRequest) -> ExportHandle {
        let (reply, outcome) = crossbeam_channel::bounded(1);
        let cancel = Arc::new(AtomicBool::new(false));
        let job = Job {
            snapshot,
            request,
            cancel: Arc::clone(&cancel),
            reply,
        };

        let queued = match &self.jobs {
            Some(jobs) => jobs.send(job).is_ok(),
            None => false,
        };
        if !queued {
            log::error!("Export worker is not running");
        }
        ExportHandle { outcome, cancel }
    }

    /// Finish queued exports and stop the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.jobs.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Export worker panicked");
            }
        }
    }
}

impl Drop for ExportWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pending result of a submitted export.
#[derive(Debug)]
pub struct ExportHandle {
    outcome: Receiver<ExportOutcome>,
    cancel: Arc<AtomicBool>,
}

impl ExportHandle {
    /// Ask for the export to be abandoned.
    ///
    /// An export that has not yet replaced its destination fails with
    /// "cancelled" and leaves no file behind.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Block until the outcome is known.
    pub fn wait(self) -> ExportOutcome {
        self.outcome.recv().unwrap_or_else(|_| stopped())
    }

    /// Wait at most `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ExportOutcome> {
        match self.outcome.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(stopped()),
        }
    }

    /// The outcome, if already known.
    pub fn try_outcome(&self) -> Option<ExportOutcome> {
        match self.outcome.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(stopped()),
        }
    }
}

fn stopped() -> ExportOutcome {
    ExportOutcome::failed(&Error::ResourceUnavailable(
        "the export worker stopped".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportFormat;
    use crate::{EditingSession, SessionOptions};

    #[test]
    fn test_worker_exports_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        let mut session = EditingSession::with_text("worker text", SessionOptions::default());

        let worker = ExportWorker::new().unwrap();
        let handle = worker.submit(
            session.snapshot().unwrap(),
            ExportRequest::new(&path, ExportFormat::PlainText),
        );
        let outcome = handle.wait();
        assert!(outcome.is_success(), "{}", outcome);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "worker text");
        worker.shutdown();
    }

    #[test]
    fn test_cancelled_before_start_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        let mut session = EditingSession::with_text("never written", SessionOptions::default());
        let snapshot = session.snapshot().unwrap();

        let registry = ExporterRegistry::with_defaults();
        let cancel = AtomicBool::new(true);
        let outcome = registry.export(
            &snapshot,
            &ExportRequest::new(&path, ExportFormat::Pdf),
            Some(&cancel),
        );
        assert!(!outcome.is_success());
        assert_eq!(outcome.cause(), Some("Operation cancelled"));
        assert!(!path.exists());
    }
}
