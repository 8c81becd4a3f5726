//! Error types for the quire library.

use std::io;
use thiserror::Error;

/// Result type alias for quire operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while editing, paginating or exporting.
#[derive(Error, Debug)]
pub enum Error {
    /// A character offset or range lies outside the document.
    ///
    /// Raised by the document store. Callers driving the store from user
    /// input are expected to never hit this.
    #[error("Offset {offset} is out of bounds (document has {length} characters)")]
    OutOfBounds {
        /// The first offending offset
        offset: usize,
        /// Document length in characters at the time of the call
        length: usize,
    },

    /// An export encoder could not produce output.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error when writing an export destination.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No live session or worker is available to service the request.
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Error building the PDF object graph.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// The operation was cancelled before it committed any output.
    #[error("Operation cancelled")]
    Cancelled,

    /// No exporter is registered for the requested format or extension.
    #[error("Unknown export format: {0}")]
    UnknownFormat(String),
}

impl Error {
    /// Shorthand for an out-of-bounds error.
    pub fn out_of_bounds(offset: usize, length: usize) -> Self {
        Error::OutOfBounds { offset, length }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::Pdf(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON serialization error: {}", err))
    }
}
