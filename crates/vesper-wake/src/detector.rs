use crate::energy;
use crate::engine::{WakeDecision, WakeError, WakeWordEngine};
use vesper_audio::AudioFrame;

/// Frames of sustained energy before an activation fires (~128 ms).
const ONSET_DEBOUNCE_FRAMES: u32 = 4;

/// Frames suppressed after an activation (~1 s) so one burst cannot
/// trigger twice.
const REFRACTORY_FRAMES: u32 = 31;

/// Reference wake engine: fires when frame energy stays above a
/// sensitivity-derived threshold for the debounce window. It stands in
/// for a real keyword-spotting model behind the same trait and is good
/// enough for loop development and the single-shot CLI paths.
pub struct EnergyBurstDetector {
    keyword: String,
    threshold_dbfs: f32,
    streak: u32,
    refractory: u32,
}

impl EnergyBurstDetector {
    /// `sensitivity` is 0.0..=1.0; higher values lower the energy bar
    /// (fewer missed activations, more false ones).
    pub fn new(keyword: impl Into<String>, sensitivity: f32) -> Self {
        let sensitivity = sensitivity.clamp(0.0, 1.0);
        Self {
            keyword: keyword.into(),
            threshold_dbfs: -25.0 - sensitivity * 25.0,
            streak: 0,
            refractory: 0,
        }
    }

    pub fn threshold_dbfs(&self) -> f32 {
        self.threshold_dbfs
    }
}

impl WakeWordEngine for EnergyBurstDetector {
    fn process(&mut self, frame: &AudioFrame) -> Result<WakeDecision, WakeError> {
        if self.refractory > 0 {
            self.refractory -= 1;
            return Ok(WakeDecision::NotDetected);
        }

        let level = energy::dbfs(&frame.samples);
        if level >= self.threshold_dbfs {
            self.streak += 1;
            if self.streak >= ONSET_DEBOUNCE_FRAMES {
                self.streak = 0;
                self.refractory = REFRACTORY_FRAMES;
                tracing::debug!(keyword = %self.keyword, level, "Wake activation");
                return Ok(WakeDecision::Detected {
                    keyword: self.keyword.clone(),
                });
            }
        } else {
            self.streak = 0;
        }
        Ok(WakeDecision::NotDetected)
    }

    fn reset(&mut self) {
        self.streak = 0;
        self.refractory = 0;
    }

    fn keyword(&self) -> &str {
        &self.keyword
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

    #[test]
    fn sustained_energy_fires_once() {
        let mut det = EnergyBurstDetector::new("vesper", 0.6);
        let mut detections = 0;
        for seq in 0..10 {
            if let WakeDecision::Detected { keyword } = det.process(&frame(seq, 8000)).unwrap() {
                assert_eq!(keyword, "vesper");
                detections += 1;
            }
        }
        // Debounce delays the first hit; refractory suppresses repeats.
        assert_eq!(detections, 1);
    }

    #[test]
    fn silence_never_fires() {
        let mut det = EnergyBurstDetector::new("vesper", 1.0);
        for seq in 0..50 {
            assert_eq!(
                det.process(&frame(seq, 0)).unwrap(),
                WakeDecision::NotDetected
            );
        }
    }

    #[test]
    fn brief_blips_are_debounced() {
        let mut det = EnergyBurstDetector::new("vesper", 0.6);
        for seq in 0..8 {
            let amplitude = if seq % 2 == 0 { 8000 } else { 0 };
            assert_eq!(
                det.process(&frame(seq, amplitude)).unwrap(),
                WakeDecision::NotDetected
            );
        }
    }

    #[test]
    fn higher_sensitivity_lowers_threshold() {
        let eager = EnergyBurstDetector::new("vesper", 1.0);
        let strict = EnergyBurstDetector::new("vesper", 0.0);
        assert!(eager.threshold_dbfs() < strict.threshold_dbfs());
    }

    #[test]
    fn reset_clears_refractory() {
        let mut det = EnergyBurstDetector::new("vesper", 0.6);
        for seq in 0..4 {
            let _ = det.process(&frame(seq, 8000));
        }
        det.reset();
        let mut fired = false;
        for seq in 4..8 {
            if matches!(
                det.process(&frame(seq, 8000)).unwrap(),
                WakeDecision::Detected { .. }
            ) {
                fired = true;
            }
        }
        assert!(fired);
    }
}
