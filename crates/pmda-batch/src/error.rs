//! Error types for batch runs

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors that abort a whole run
///
/// Faults confined to one document never take this path; they become
/// [`DocumentError`] entries of the run report.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker pool failure (join or runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),

    /// Extractor could not be built
    #[error("Extractor error: {0}")]
    Extractor(#[from] pmda_extractor::ExtractorError),
}

/// Pipeline stage at which a document failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStage {
    /// File could not be read
    Read,
    /// Bytes are not a well-formed document
    Parse,
    /// Extraction panicked
    Panic,
}

impl fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorStage::Read => "read",
            ErrorStage::Parse => "parse",
            ErrorStage::Panic => "panic",
        };
        write!(f, "{}", s)
    }
}

/// A document that produced no records
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentError {
    /// File name of the offending document
    pub filename: String,
    /// Stage that failed
    pub stage: ErrorStage,
    /// Human-readable cause
    pub message: String,
}

impl DocumentError {
    /// Create a new document error
    pub fn new(filename: impl Into<String>, stage: ErrorStage, message: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.filename, self.stage, self.message)
    }
}
