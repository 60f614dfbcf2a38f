//! Wake-word detection and utterance capture.
//!
//! The acoustic model itself is a black box behind [`WakeWordEngine`];
//! this crate ships an energy-burst reference engine and the
//! Idle/Recording state machine that turns frames after an activation
//! into a bounded [`vesper_audio::Utterance`].

pub mod capture;
pub mod detector;
pub mod energy;
pub mod engine;

pub use capture::{CaptureConfig, CaptureState, UtteranceCapturer};
pub use detector::EnergyBurstDetector;
pub use engine::{WakeDecision, WakeError, WakeWordEngine};
