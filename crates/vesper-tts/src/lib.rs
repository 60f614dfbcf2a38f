//! Remote speech synthesis and local playback.
//!
//! Synthesis returns raw 16 kHz 16-bit mono PCM so playback can reuse
//! the shared audio output path without any decode step.

pub mod client;
pub mod error;

pub use client::HttpTtsClient;
pub use error::{TtsError, TtsResult};

use async_trait::async_trait;

/// Pulse-code audio produced by a synthesizer.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl SynthesizedAudio {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }
}

/// Turns text into speech audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> TtsResult<SynthesizedAudio>;
}

/// Synthesize and play, blocking the current task until playback ends.
///
/// Playback holds the output device on a blocking thread so the async
/// runtime stays responsive while audio drains.
pub async fn speak(synth: &dyn SpeechSynthesizer, text: &str) -> TtsResult<()> {
    if text.trim().is_empty() {
        return Err(TtsError::InvalidInput("empty text".into()));
    }

    let audio = synth.synthesize(text).await?;
    tracing::debug!(
        duration_ms = audio.duration_ms(),
        sample_rate = audio.sample_rate,
        "Playing synthesized audio"
    );

    tokio::task::spawn_blocking(move || {
        vesper_audio::playback::play_pcm(&audio.samples, audio.sample_rate)
    })
    .await
    .map_err(|e| TtsError::Playback(e.to_string()))?
    .map_err(|e| TtsError::Playback(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_ms_from_sample_count() {
        let audio = SynthesizedAudio {
            samples: vec![0i16; 16_000],
            sample_rate: 16_000,
        };
        assert_eq!(audio.duration_ms(), 1000);
    }

    #[tokio::test]
    async fn speak_rejects_empty_text() {
        struct Silent;

        #[async_trait]
        impl SpeechSynthesizer for Silent {
            async fn synthesize(&self, _text: &str) -> TtsResult<SynthesizedAudio> {
                unreachable!("should not be called for empty text");
            }
        }

        let err = speak(&Silent, "   ").await.unwrap_err();
        assert!(matches!(err, TtsError::InvalidInput(_)));
    }
}
