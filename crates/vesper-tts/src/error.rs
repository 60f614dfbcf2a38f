//! Error types for speech synthesis

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TtsError {
    /// Request to the synthesis service failed in transit
    #[error("Synthesis request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("Synthesis service error {status}: {body}")]
    Status { status: u16, body: String },

    /// Invalid text input
    #[error("Invalid text input: {0}")]
    InvalidInput(String),

    /// Audio output failed
    #[error("Playback failed: {0}")]
    Playback(String),
}

/// Result type for synthesis operations
pub type TtsResult<T> = Result<T, TtsError>;
