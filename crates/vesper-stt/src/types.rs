/// Result of a transcription attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionOutcome {
    Transcript(String),
    NoMatch(NoMatchCause),
}

/// Why no transcript came back. The orchestrator picks the spoken
/// fallback from this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoMatchCause {
    /// The service was reached but heard no usable speech. Benign.
    NoSpeech,
    /// Transport or service failure after the retry was exhausted.
    ServiceFailure,
}

impl TranscriptionOutcome {
    /// Normalize a raw transcript: empty or whitespace-only text is
    /// treated identically to the service reporting no match.
    pub fn from_text(text: String) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            TranscriptionOutcome::NoMatch(NoMatchCause::NoSpeech)
        } else {
            TranscriptionOutcome::Transcript(trimmed.to_string())
        }
    }
}
