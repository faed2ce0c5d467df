//! Error types for the acquisition pipeline.
//!
//! Every variant is caught at the nearest unit boundary (image, post,
//! fragment, batch) and turned into a boolean or optional outcome plus a log
//! line. None of them escape [`crate::pipeline::Pipeline::get_entry`].

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure of one unit of pipeline work.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The operation did not settle before its deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with something other than 200.
    #[error("request to {url} failed with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Network-level failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Filesystem failure on a specific path.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Extraction accepted zero threads.
    #[error("no usable threads in markup")]
    NoData,

    /// The markup response was empty or not text.
    #[error("no readable text from {url}")]
    NotText { url: String },

    /// A detached task panicked before settling.
    #[error("background task failed: {0}")]
    Task(String),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this failure is a deadline expiry.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Why a single thread fragment was rejected by the extractor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FragmentError {
    #[error("fragment has no title link")]
    MissingTitleOrLink,
    #[error("fragment title is empty")]
    EmptyTitle,
}
