use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::types::{NoMatchCause, TranscriptionOutcome};
use crate::wav;
use crate::TranscriptionClient;
use vesper_audio::Utterance;

#[derive(Error, Debug)]
pub enum SttError {
    #[error("Transcription request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transcription service error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Audio encoding failed: {0}")]
    Encode(#[from] hound::Error),
}

/// Short-audio recognition response.
#[derive(Debug, Deserialize)]
struct RecognitionResponse {
    #[serde(rename = "RecognitionStatus")]
    status: String,
    #[serde(rename = "DisplayText", default)]
    display_text: Option<String>,
}

/// Speech-to-text over the Azure-style short-audio REST API. One
/// utterance per request, synchronous from the pipeline's perspective.
pub struct HttpSttClient {
    http: reqwest::Client,
    endpoint: String,
    subscription_key: String,
    language: String,
}

impl HttpSttClient {
    pub fn new(subscription_key: String, region: &str) -> Self {
        Self::with_endpoint(
            subscription_key,
            format!(
                "https://{}.stt.speech.microsoft.com/speech/recognition/conversation/cognitiveservices/v1",
                region
            ),
        )
    }

    /// Point the client at a specific endpoint URL; used by the tests
    /// and by self-hosted gateways.
    pub fn with_endpoint(subscription_key: String, endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            subscription_key,
            language: "en-US".to_string(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    async fn request_once(&self, audio: Vec<u8>) -> Result<TranscriptionOutcome, SttError> {
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("language", self.language.as_str()), ("format", "simple")])
            .header("Ocp-Apim-Subscription-Key", &self.subscription_key)
            .header(
                "Content-Type",
                "audio/wav; codecs=audio/pcm; samplerate=16000",
            )
            .body(audio)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SttError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RecognitionResponse = response.json().await?;
        Ok(fold_recognition(parsed))
    }
}

/// Map the service's recognition status onto the outcome type. Anything
/// unrecognized is conservatively treated as no speech rather than an
/// error, matching the service's own no-match semantics.
fn fold_recognition(response: RecognitionResponse) -> TranscriptionOutcome {
    match response.status.as_str() {
        "Success" => TranscriptionOutcome::from_text(response.display_text.unwrap_or_default()),
        "NoMatch" | "InitialSilenceTimeout" => {
            TranscriptionOutcome::NoMatch(NoMatchCause::NoSpeech)
        }
        other => {
            tracing::warn!(status = other, "Unexpected recognition status");
            TranscriptionOutcome::NoMatch(NoMatchCause::NoSpeech)
        }
    }
}

#[async_trait]
impl TranscriptionClient for HttpSttClient {
    async fn transcribe(&self, utterance: &Utterance) -> TranscriptionOutcome {
        let audio = match wav::encode(utterance) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Failed to encode utterance: {}", e);
                return TranscriptionOutcome::NoMatch(NoMatchCause::ServiceFailure);
            }
        };

        tracing::debug!(
            bytes = audio.len(),
            duration_ms = utterance.duration_ms(),
            "Sending utterance for transcription"
        );

        // One retry with the identical payload, then give up with a
        // tagged cause so the caller can speak a fallback.
        for attempt in 0..2 {
            match self.request_once(audio.clone()).await {
                Ok(outcome) => {
                    if let TranscriptionOutcome::Transcript(text) = &outcome {
                        tracing::info!(transcript = %text, "Transcription complete");
                    }
                    return outcome;
                }
                Err(e) => {
                    tracing::warn!(attempt, "Transcription attempt failed: {}", e);
                }
            }
        }
        TranscriptionOutcome::NoMatch(NoMatchCause::ServiceFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_with_text_is_a_transcript() {
        let outcome = fold_recognition(RecognitionResponse {
            status: "Success".to_string(),
            display_text: Some("turn on the lights".to_string()),
        });
        assert_eq!(
            outcome,
            TranscriptionOutcome::Transcript("turn on the lights".to_string())
        );
    }

    #[test]
    fn success_without_text_is_no_speech() {
        let outcome = fold_recognition(RecognitionResponse {
            status: "Success".to_string(),
            display_text: None,
        });
        assert_eq!(
            outcome,
            TranscriptionOutcome::NoMatch(NoMatchCause::NoSpeech)
        );
    }

    #[test]
    fn no_match_status_is_no_speech() {
        for status in ["NoMatch", "InitialSilenceTimeout", "Canceled"] {
            let outcome = fold_recognition(RecognitionResponse {
                status: status.to_string(),
                display_text: None,
            });
            assert_eq!(
                outcome,
                TranscriptionOutcome::NoMatch(NoMatchCause::NoSpeech),
                "status {status}"
            );
        }
    }
}
