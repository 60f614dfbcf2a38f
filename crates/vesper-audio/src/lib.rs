//! Audio capture, framing, resampling, and playback.
//!
//! The capture side runs a dedicated cpal thread feeding an SPSC ring
//! buffer; a chunker task drains it into fixed 16 kHz mono frames and
//! broadcasts them to the pipeline. The playback side is a blocking
//! sink used by the synthesizer.

pub mod capture;
pub mod chunker;
pub mod device;
pub mod frame;
pub mod playback;
pub mod resampler;
pub mod ring_buffer;

pub use capture::{CaptureStats, CaptureThread, DeviceConfig};
pub use chunker::{ChunkerConfig, FrameChunker};
pub use frame::{AudioFrame, Utterance, FRAME_DURATION_MS, FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ};
pub use playback::play_pcm;
pub use ring_buffer::{SampleConsumer, SampleProducer, SampleRingBuffer};
