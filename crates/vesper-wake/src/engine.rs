use thiserror::Error;

use vesper_audio::AudioFrame;

/// Outcome of scanning one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeDecision {
    /// The configured trigger phrase was heard.
    Detected { keyword: String },
    NotDetected,
}

#[derive(Error, Debug)]
pub enum WakeError {
    #[error("Wake model error: {0}")]
    Model(String),
}

/// On-device wake-word scanning. Implementations must keep pace with
/// real-time frame arrival; a model failure degrades to
/// [`WakeDecision::NotDetected`] at the caller, never crashes the loop.
pub trait WakeWordEngine: Send {
    /// Classify one pipeline frame against the trigger phrase.
    fn process(&mut self, frame: &AudioFrame) -> Result<WakeDecision, WakeError>;

    /// Clear internal state, e.g. when the loop returns to listening.
    fn reset(&mut self);

    /// The phrase this engine is configured with.
    fn keyword(&self) -> &str;
}
