//! Remote speech-to-text.
//!
//! The service is a black box behind [`TranscriptionClient`]; the
//! bundled implementation talks to an Azure-style short-audio REST
//! endpoint. Transport failures are retried once, then folded into a
//! tagged no-match outcome, so errors never cross the trait boundary
//! into the orchestrator.

pub mod client;
pub mod types;
pub mod wav;

pub use client::{HttpSttClient, SttError};
pub use types::{NoMatchCause, TranscriptionOutcome};

use async_trait::async_trait;
use vesper_audio::Utterance;

#[async_trait]
pub trait TranscriptionClient: Send + Sync {
    /// Transcribe one captured utterance. Infallible by design: every
    /// failure mode is expressed as [`TranscriptionOutcome::NoMatch`]
    /// with its cause.
    async fn transcribe(&self, utterance: &Utterance) -> TranscriptionOutcome;
}
