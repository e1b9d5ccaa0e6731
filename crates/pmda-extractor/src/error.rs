//! Error types for the Extractor

use thiserror::Error;

/// Errors that can occur while extracting one document
///
/// Missing sections are never errors: a category without its subtree simply
/// yields an empty list.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Document bytes are not valid UTF-8
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Document is not well-formed markup
    #[error("Markup parse error: {0}")]
    Parse(String),

    /// Pattern set failed to compile
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<roxmltree::Error> for ExtractorError {
    fn from(e: roxmltree::Error) -> Self {
        ExtractorError::Parse(e.to_string())
    }
}

impl From<std::str::Utf8Error> for ExtractorError {
    fn from(e: std::str::Utf8Error) -> Self {
        ExtractorError::Encoding(e.to_string())
    }
}

impl From<regex::Error> for ExtractorError {
    fn from(e: regex::Error) -> Self {
        ExtractorError::Pattern(e.to_string())
    }
}
