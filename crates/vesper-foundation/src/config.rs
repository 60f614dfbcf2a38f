//! Immutable process configuration.
//!
//! Loaded exactly once at startup from environment variables (prefix
//! `VESPER`) with an optional `vesper.toml` alongside the binary, then
//! passed by reference to every component constructor. Nothing mutates
//! it afterwards.

use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Subscription key for the remote speech services (STT + TTS).
    pub speech_key: String,

    /// Region of the speech services endpoint.
    #[serde(default = "defaults::speech_region")]
    pub speech_region: String,

    /// API key for the remote reasoning service.
    pub reasoning_api_key: String,

    /// Name the assistant identifies itself by in the persona prompt.
    #[serde(default = "defaults::assistant_name")]
    pub assistant_name: String,

    /// Trigger phrase the wake-word engine is configured with.
    #[serde(default = "defaults::wake_word")]
    pub wake_word: String,

    /// Wake-word sensitivity, 0.0 to 1.0. Higher values favor fewer
    /// missed activations at the cost of more false triggers.
    #[serde(default = "defaults::wake_sensitivity")]
    pub wake_sensitivity: f32,

    /// Synthesis voice identity.
    #[serde(default = "defaults::voice_name")]
    pub voice_name: String,

    /// Reasoning model identifier.
    #[serde(default = "defaults::model")]
    pub model: String,

    /// Continuous silence that finalizes an utterance.
    #[serde(default = "defaults::silence_timeout_ms")]
    pub silence_timeout_ms: u32,

    /// Hard cap on a single utterance, regardless of silence.
    #[serde(default = "defaults::max_utterance_ms")]
    pub max_utterance_ms: u32,

    /// Maximum user/assistant turn pairs kept in conversation memory.
    #[serde(default = "defaults::history_limit")]
    pub history_limit: usize,

    /// RMS level (dBFS) below which a frame counts as silence.
    #[serde(default = "defaults::energy_threshold_dbfs")]
    pub energy_threshold_dbfs: f32,

    /// Speak a short acknowledgement after the wake word, as the
    /// hardware prototype did. Off by default: capture starts on the
    /// triggering frame, so the prompt only adds latency.
    #[serde(default)]
    pub ack_on_wake: bool,

    /// Preferred input device name; `None` uses the host default.
    #[serde(default)]
    pub input_device: Option<String>,

    #[serde(default = "defaults::log_level")]
    pub log_level: String,
}

mod defaults {
    pub fn speech_region() -> String {
        "eastus".to_string()
    }
    pub fn assistant_name() -> String {
        "Vesper".to_string()
    }
    pub fn wake_word() -> String {
        "vesper".to_string()
    }
    pub fn wake_sensitivity() -> f32 {
        0.6
    }
    pub fn voice_name() -> String {
        "en-US-GuyNeural".to_string()
    }
    pub fn model() -> String {
        "claude-sonnet-4-20250514".to_string()
    }
    pub fn silence_timeout_ms() -> u32 {
        1500
    }
    pub fn max_utterance_ms() -> u32 {
        15_000
    }
    pub fn history_limit() -> usize {
        20
    }
    pub fn energy_threshold_dbfs() -> f32 {
        -45.0
    }
    pub fn log_level() -> String {
        "info".to_string()
    }
}

impl Settings {
    /// Load the settings snapshot. Fails fast on missing credentials.
    pub fn load() -> Result<Self, AppError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name("vesper").required(false))
            .add_source(config::Environment::with_prefix("VESPER"))
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&mut self) -> Result<(), AppError> {
        if self.speech_key.trim().is_empty() {
            return Err(AppError::Config("speech_key must not be empty".into()));
        }
        if self.reasoning_api_key.trim().is_empty() {
            return Err(AppError::Config(
                "reasoning_api_key must not be empty".into(),
            ));
        }
        if self.history_limit == 0 {
            return Err(AppError::Config("history_limit must be at least 1".into()));
        }
        if self.max_utterance_ms <= self.silence_timeout_ms {
            return Err(AppError::Config(
                "max_utterance_ms must exceed silence_timeout_ms".into(),
            ));
        }
        self.wake_sensitivity = self.wake_sensitivity.clamp(0.0, 1.0);
        Ok(())
    }
}
