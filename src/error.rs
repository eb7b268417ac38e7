//! Error types surfaced by the lint pipeline.
//!
//! Most validation problems are only logged; the variants here are the ones
//! that travel as values, either to be caught by the pipeline driver or to
//! abort a run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LintError {
    /// The input document (or extraction dump) cannot be read.
    #[error("cannot read {path}: {source}")]
    MissingResource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed extraction dump: {0}")]
    MalformedDump(#[from] serde_json::Error),

    /// A single pipeline step gave up on a table.
    #[error("{step} failed: {reason}")]
    TransformStep { step: &'static str, reason: String },

    #[error("{title}: bits sum up to {found}, expected {expected}")]
    ReconstructionMismatch {
        title: String,
        expected: u32,
        found: u64,
    },

    #[error("page {page}: {reason}")]
    InvalidPage { page: u32, reason: String },

    #[error("invalid figure number {line:?} in {path}")]
    InvalidFigureList { path: PathBuf, line: String },
}

pub type LintResult<T> = Result<T, LintError>;

impl LintError {
    pub fn step(step: &'static str, reason: impl Into<String>) -> Self {
        LintError::TransformStep {
            step,
            reason: reason.into(),
        }
    }
}
