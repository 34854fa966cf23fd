//! Error types for extraction and conversion

use thiserror::Error;

/// Errors that can occur while extracting content from a document
///
/// Only [`ExtractError::MalformedInput`] ever escapes the pipeline. The other
/// variants are raised by individual stages and absorbed by a fallback.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Input cannot be decoded or parsed as a document
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    /// The primary conversion strategy could not run
    #[error("Conversion engine unavailable: {0}")]
    ConversionEngineUnavailable(String),
    /// A CSS selector could not be parsed
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

impl ExtractError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::MalformedInput(_) => "malformed_input",
            ExtractError::ConversionEngineUnavailable(_) => "engine_unavailable",
            ExtractError::InvalidSelector { .. } => "invalid_selector",
        }
    }
}

pub type Result<T, E = ExtractError> = std::result::Result<T, E>;
