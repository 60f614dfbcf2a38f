use crate::energy;
use vesper_audio::{AudioFrame, Utterance};

#[derive(Debug, Clone, Copy)]
pub struct CaptureConfig {
    /// Continuous silence that finalizes the utterance.
    pub silence_timeout_ms: u32,
    /// Hard cap regardless of silence; prevents unbounded capture from
    /// a stuck or noisy input.
    pub max_utterance_ms: u32,
    /// Frames below this level count as silence.
    pub energy_threshold_dbfs: f32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            silence_timeout_ms: 1500,
            max_utterance_ms: 15_000,
            energy_threshold_dbfs: -45.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
}

/// Records the span of audio following a wake activation.
///
/// `begin` ingests the frame that triggered the activation, so nothing
/// is lost across the Detected-to-Recording transition. `push` then
/// accumulates frames until either the silence timeout or the duration
/// cap finalizes the utterance. A frame that would carry the total past
/// the cap is trimmed so the emitted duration never exceeds
/// `max_utterance_ms`; the cap wins over the silence timeout when one
/// frame crosses both.
pub struct UtteranceCapturer {
    cfg: CaptureConfig,
    state: CaptureState,
    samples: Vec<i16>,
    sample_rate: u32,
    total_ms: u64,
    silence_ms: u64,
    speech_frames: u32,
}

impl UtteranceCapturer {
    pub fn new(cfg: CaptureConfig) -> Self {
        Self {
            cfg,
            state: CaptureState::Idle,
            samples: Vec::new(),
            sample_rate: 0,
            total_ms: 0,
            silence_ms: 0,
            speech_frames: 0,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Enter Recording, starting with the frame that fired the wake
    /// detection.
    pub fn begin(&mut self, frame: &AudioFrame) {
        self.reset();
        self.state = CaptureState::Recording;
        self.sample_rate = frame.sample_rate;
        self.ingest(frame);
        tracing::debug!(seq = frame.seq, "Utterance capture started");
    }

    /// Append a frame; returns the finalized utterance once a stop
    /// condition is met. Frames arriving while Idle are ignored.
    pub fn push(&mut self, frame: &AudioFrame) -> Option<Utterance> {
        if self.state != CaptureState::Recording {
            return None;
        }

        let remaining_ms = (self.cfg.max_utterance_ms as u64).saturating_sub(self.total_ms);
        if frame.duration_ms() >= remaining_ms {
            // Keep only the samples that fit under the cap.
            let keep = (remaining_ms * frame.sample_rate as u64 / 1000) as usize;
            let keep = keep.min(frame.samples.len());
            if keep > 0 {
                self.ingest(&AudioFrame {
                    samples: frame.samples[..keep].to_vec(),
                    seq: frame.seq,
                    sample_rate: frame.sample_rate,
                });
            }
            tracing::debug!(total_ms = self.total_ms, "Utterance hit duration cap");
            return Some(self.finalize());
        }

        self.ingest(frame);
        if self.silence_ms >= self.cfg.silence_timeout_ms as u64 {
            tracing::debug!(
                total_ms = self.total_ms,
                silence_ms = self.silence_ms,
                "Utterance finalized on silence"
            );
            return Some(self.finalize());
        }
        None
    }

    pub fn reset(&mut self) {
        self.state = CaptureState::Idle;
        self.samples.clear();
        self.total_ms = 0;
        self.silence_ms = 0;
        self.speech_frames = 0;
    }

    fn ingest(&mut self, frame: &AudioFrame) {
        let frame_ms = frame.duration_ms();
        self.samples.extend_from_slice(&frame.samples);
        self.total_ms += frame_ms;

        if energy::dbfs(&frame.samples) >= self.cfg.energy_threshold_dbfs {
            self.speech_frames += 1;
            self.silence_ms = 0;
        } else {
            self.silence_ms += frame_ms;
        }
    }

    fn finalize(&mut self) -> Utterance {
        let utterance = Utterance {
            samples: std::mem::take(&mut self.samples),
            sample_rate: self.sample_rate,
            speech_frames: self.speech_frames,
        };
        self.reset();
        utterance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_audio::{FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ};

    fn frame(seq: u64, amplitude: i16) -> AudioFrame {
        AudioFrame {
            samples: vec![amplitude; FRAME_SIZE_SAMPLES],
            seq,
            sample_rate: SAMPLE_RATE_HZ,
        }
    }

    fn capturer(silence_ms: u32, max_ms: u32) -> UtteranceCapturer {
        UtteranceCapturer::new(CaptureConfig {
            silence_timeout_ms: silence_ms,
            max_utterance_ms: max_ms,
            energy_threshold_dbfs: -45.0,
        })
    }

    #[test]
    fn continuous_speech_is_capped_at_max_duration() {
        // 160 ms cap = 5 frames of 32 ms.
        let mut cap = capturer(96, 160);
        cap.begin(&frame(0, 8000));

        let mut result = None;
        let mut frames_pushed = 0;
        for seq in 1..100 {
            frames_pushed += 1;
            if let Some(utt) = cap.push(&frame(seq, 8000)) {
                result = Some(utt);
                break;
            }
        }
        let utt = result.expect("cap must finalize despite no silence");
        assert!(frames_pushed < 100);
        assert!(utt.duration_ms() <= 160);
        assert!(utt.has_speech());
        assert_eq!(cap.state(), CaptureState::Idle);
    }

    #[test]
    fn cap_between_frame_boundaries_trims_the_crossing_frame() {
        // 100 ms is not a multiple of the 32 ms frame; the fourth frame
        // crosses the cap and must be cut to it.
        let mut cap = capturer(1000, 100);
        cap.begin(&frame(0, 8000));
        assert!(cap.push(&frame(1, 8000)).is_none());
        assert!(cap.push(&frame(2, 8000)).is_none());
        let utt = cap.push(&frame(3, 8000)).expect("cap fires on the crossing frame");
        assert_eq!(utt.duration_ms(), 100);
        assert_eq!(utt.samples.len(), 100 * SAMPLE_RATE_HZ as usize / 1000);
    }

    #[test]
    fn silence_gap_finalizes_capture() {
        let mut cap = capturer(96, 10_000);
        cap.begin(&frame(0, 8000));
        assert!(cap.push(&frame(1, 8000)).is_none());

        // 96 ms of silence = 3 quiet frames.
        assert!(cap.push(&frame(2, 0)).is_none());
        assert!(cap.push(&frame(3, 0)).is_none());
        let utt = cap.push(&frame(4, 0)).expect("silence timeout");
        assert_eq!(utt.samples.len(), FRAME_SIZE_SAMPLES * 5);
        assert_eq!(utt.speech_frames, 2);
    }

    #[test]
    fn speech_resets_the_silence_clock() {
        let mut cap = capturer(96, 10_000);
        cap.begin(&frame(0, 8000));
        assert!(cap.push(&frame(1, 0)).is_none());
        assert!(cap.push(&frame(2, 0)).is_none());
        // Speech again before the third quiet frame.
        assert!(cap.push(&frame(3, 8000)).is_none());
        assert!(cap.push(&frame(4, 0)).is_none());
        assert!(cap.push(&frame(5, 0)).is_none());
        assert!(cap.push(&frame(6, 0)).is_some());
    }

    #[test]
    fn all_silence_yields_empty_result() {
        let mut cap = capturer(96, 10_000);
        cap.begin(&frame(0, 0));
        let mut result = None;
        for seq in 1..10 {
            if let Some(utt) = cap.push(&frame(seq, 0)) {
                result = Some(utt);
                break;
            }
        }
        let utt = result.expect("silence timeout fires");
        assert!(!utt.has_speech());
    }

    #[test]
    fn triggering_frame_is_recorded() {
        let mut cap = capturer(96, 10_000);
        let first = frame(7, 8000);
        cap.begin(&first);
        assert!(cap.push(&frame(8, 0)).is_none());
        assert!(cap.push(&frame(9, 0)).is_none());
        let utt = cap.push(&frame(10, 0)).unwrap();
        // begin() frame plus three pushed frames.
        assert_eq!(utt.samples.len(), FRAME_SIZE_SAMPLES * 4);
    }

    #[test]
    fn idle_capturer_ignores_frames() {
        let mut cap = capturer(96, 10_000);
        assert_eq!(cap.state(), CaptureState::Idle);
        assert!(cap.push(&frame(0, 8000)).is_none());
    }
}
