//! Pipeline frame format and the captured utterance buffer.

/// Every stage downstream of the chunker sees audio at this rate.
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Fixed frame size for the whole pipeline. 512 samples at 16 kHz
/// is 32 ms, the granularity of wake scanning and silence tracking.
pub const FRAME_SIZE_SAMPLES: usize = 512;

/// Frame duration in milliseconds (derived).
pub const FRAME_DURATION_MS: f32 = (FRAME_SIZE_SAMPLES as f32 * 1000.0) / SAMPLE_RATE_HZ as f32;

/// One fixed-size block of mono PCM, owned by exactly one stage at a
/// time. The sequence number is monotonic per chunker instance and
/// makes dropped frames observable downstream.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub seq: u64,
    pub sample_rate: u32,
}

impl AudioFrame {
    pub fn duration_ms(&self) -> u64 {
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }
}

/// The bounded audio span between wake activation and silence/timeout.
/// Created by the capturer, consumed once by the transcription client.
#[derive(Debug, Clone)]
pub struct Utterance {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    /// Frames whose energy cleared the silence threshold. Zero means
    /// the whole capture was silence and no transcription request is
    /// worth making.
    pub speech_frames: u32,
}

impl Utterance {
    pub fn duration_ms(&self) -> u64 {
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }

    pub fn has_speech(&self) -> bool {
        self.speech_frames > 0
    }
}
