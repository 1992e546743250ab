//! # Error Types
//!
//! This module defines error types used throughout the midiator library.

use thiserror::Error;

/// Main error type for midiator operations
#[derive(Debug, Error)]
pub enum MidiatorError {
    /// Preconditions not met before a batch starts (no background, no
    /// records, no visible fields). Nothing has been rendered.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Image decoding or encoding error
    #[error("Image error: {0}")]
    Image(String),

    /// Font loading error
    #[error("Font error: {0}")]
    Font(String),

    /// Invalid configuration or layout file
    #[error("Config error: {0}")]
    Config(String),

    /// A blocking worker task failed to complete
    #[error("Task error: {0}")]
    Task(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MidiatorError {
    /// True for errors raised before any rendering work started.
    pub fn is_validation(&self) -> bool {
        matches!(self, MidiatorError::Validation(_))
    }
}
