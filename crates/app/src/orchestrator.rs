//! The coordination loop.
//!
//! One task drives the whole assistant: frames arrive over the
//! broadcast channel, the wake engine and capturer run inline, and the
//! remote calls are awaited serially so only one utterance is ever in
//! flight. Every stage failure is contained here and degrades to that
//! stage's fallback; only fatal audio faults escape `run`.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use vesper_audio::AudioFrame;
use vesper_brain::{AssistantDirective, ConversationEngine};
use vesper_foundation::{AppError, AudioError, ShutdownGuard};
use vesper_stt::{NoMatchCause, TranscriptionClient, TranscriptionOutcome};
use vesper_tts::TtsError;
use vesper_wake::{CaptureConfig, UtteranceCapturer, WakeDecision, WakeWordEngine};

/// Where the loop currently is in the wake-to-reply cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Listening,
    Capturing,
    Transcribing,
    Reasoning,
    Speaking,
    ShuttingDown,
}

/// Handle for releasing the audio input on shutdown.
///
/// The capture thread implements this; tests substitute a recorder to
/// observe that the device is released before `run` returns.
pub trait AudioSourceControl: Send {
    fn release(&mut self);
}

impl AudioSourceControl for vesper_audio::CaptureThread {
    fn release(&mut self) {
        self.stop();
    }
}

/// Speaks a finished reply, resolving only after playback completes.
#[async_trait]
pub trait Speaker: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), TtsError>;
}

pub struct Orchestrator {
    frames: broadcast::Receiver<AudioFrame>,
    wake: Box<dyn WakeWordEngine>,
    capturer: UtteranceCapturer,
    stt: Box<dyn TranscriptionClient>,
    brain: ConversationEngine,
    speaker: Box<dyn Speaker>,
    source: Box<dyn AudioSourceControl>,
    shutdown: ShutdownGuard,
    ack_on_wake: bool,
    phase: Phase,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        frames: broadcast::Receiver<AudioFrame>,
        wake: Box<dyn WakeWordEngine>,
        capture_config: CaptureConfig,
        stt: Box<dyn TranscriptionClient>,
        brain: ConversationEngine,
        speaker: Box<dyn Speaker>,
        source: Box<dyn AudioSourceControl>,
        shutdown: ShutdownGuard,
        ack_on_wake: bool,
    ) -> Self {
        Self {
            frames,
            wake,
            capturer: UtteranceCapturer::new(capture_config),
            stt,
            brain,
            speaker,
            source,
            shutdown,
            ack_on_wake,
            phase: Phase::Listening,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run until a shutdown request or a "goodbye" directive.
    ///
    /// The audio source is released before this returns, on every exit
    /// path.
    pub async fn run(&mut self) -> Result<(), AppError> {
        tracing::info!(keyword = self.wake.keyword(), "Assistant listening");

        let result = self.run_inner().await;

        self.phase = Phase::ShuttingDown;
        self.source.release();
        tracing::info!("Audio source released");
        result
    }

    async fn run_inner(&mut self) -> Result<(), AppError> {
        loop {
            tokio::select! {
                _ = self.shutdown.wait() => {
                    tracing::info!("Shutdown signal received");
                    return Ok(());
                }
                frame = self.frames.recv() => match frame {
                    Ok(frame) => {
                        if self.on_frame(frame).await {
                            return Ok(());
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Frame queue lagged, oldest frames dropped");
                        self.capturer.reset();
                        self.wake.reset();
                        self.phase = Phase::Listening;
                    }
                    Err(RecvError::Closed) => {
                        tracing::error!("Audio pipeline closed unexpectedly");
                        return Err(AppError::Audio(AudioError::DeviceDisconnected));
                    }
                },
            }
        }
    }

    /// Returns true when the loop should stop.
    async fn on_frame(&mut self, frame: AudioFrame) -> bool {
        match self.phase {
            Phase::Listening => {
                match self.wake.process(&frame) {
                    Ok(WakeDecision::Detected { keyword }) => {
                        tracing::info!(keyword = %keyword, seq = frame.seq, "Wake word detected");
                        if self.ack_on_wake {
                            self.say("Yes?").await;
                            self.drain_frames();
                        }
                        self.capturer.begin(&frame);
                        self.phase = Phase::Capturing;
                    }
                    Ok(WakeDecision::NotDetected) => {}
                    Err(e) => {
                        // Detector faults degrade to a miss.
                        tracing::warn!("Wake engine error: {}", e);
                    }
                }
                false
            }
            Phase::Capturing => {
                if let Some(utterance) = self.capturer.push(&frame) {
                    tracing::info!(
                        duration_ms = utterance.duration_ms(),
                        speech_frames = utterance.speech_frames,
                        "Utterance captured"
                    );
                    return self.handle_utterance(utterance).await;
                }
                false
            }
            // Frames arriving in any other phase are stale pipeline
            // backlog and ignored.
            _ => false,
        }
    }

    async fn handle_utterance(&mut self, utterance: vesper_audio::Utterance) -> bool {
        self.phase = Phase::Transcribing;
        // All-silence captures skip the remote round trip entirely.
        let outcome = if utterance.has_speech() {
            self.stt.transcribe(&utterance).await
        } else {
            TranscriptionOutcome::NoMatch(NoMatchCause::NoSpeech)
        };

        // Shutdown is re-checked between stages, so a request raised
        // during a slow remote call stops the exchange at the next
        // stage boundary instead of riding it out.
        if self.shutdown.is_requested() {
            return true;
        }

        let stop = match outcome {
            TranscriptionOutcome::Transcript(text) => {
                tracing::info!(transcript = %text, "Heard");
                self.phase = Phase::Reasoning;
                let exchange = self.brain.respond(&text).await;
                if self.shutdown.is_requested() {
                    return true;
                }

                self.phase = Phase::Speaking;
                self.say(&exchange.reply).await;

                matches!(exchange.directive, AssistantDirective::Shutdown)
            }
            TranscriptionOutcome::NoMatch(cause) => {
                self.phase = Phase::Speaking;
                match cause {
                    NoMatchCause::NoSpeech => {
                        tracing::info!("No speech recognized");
                        self.say("Sorry, I didn't catch that.").await;
                    }
                    NoMatchCause::ServiceFailure => {
                        tracing::warn!("Transcription service unavailable");
                        self.say("I'm having trouble hearing you right now.").await;
                    }
                }
                false
            }
        };

        if stop {
            return true;
        }

        // Discard anything buffered while we were speaking so the
        // assistant cannot wake on its own voice.
        self.drain_frames();
        self.wake.reset();
        self.capturer.reset();
        self.phase = Phase::Listening;
        false
    }

    async fn say(&mut self, text: &str) {
        if let Err(e) = self.speaker.speak(text).await {
            tracing::warn!("Speech synthesis failed, skipping playback: {}", e);
        }
    }

    fn drain_frames(&mut self) {
        let mut drained = 0u64;
        loop {
            match self.frames.try_recv() {
                Ok(_) => drained += 1,
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        if drained > 0 {
            tracing::debug!(drained, "Discarded frames buffered during playback");
        }
    }
}
