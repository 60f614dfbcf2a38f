use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::resampler::MonoResampler;
use vesper_foundation::AudioError;

/// Play mono i16 PCM through the default output device, blocking the
/// calling thread until the buffer is fully drained. The orchestrator
/// relies on this blocking to avoid capturing the assistant's own
/// voice as a new utterance.
pub fn play_pcm(samples: &[i16], sample_rate: u32) -> Result<(), AudioError> {
    if samples.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioError::OutputDeviceNotFound)?;

    let supported = device.default_output_config()?;
    let config = StreamConfig {
        channels: supported.channels(),
        sample_rate: SampleRate(supported.sample_rate().0),
        buffer_size: cpal::BufferSize::Default,
    };
    let out_rate = config.sample_rate.0;
    let channels = config.channels as usize;

    // Match the device rate before queueing.
    let samples: Arc<Vec<f32>> = {
        let resampled = if out_rate != sample_rate {
            let mut resampler = MonoResampler::new(sample_rate, out_rate);
            let mut out = resampler.process(samples);
            // Zero pad flushes the partial chunk held by the filter so
            // the tail of the speech is not clipped.
            out.extend(resampler.process(&[0i16; 1024]));
            out
        } else {
            samples.to_vec()
        };
        Arc::new(resampled.iter().map(|&s| s as f32 / 32768.0).collect())
    };

    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let cb_samples = Arc::clone(&samples);
    let cb_position = Arc::clone(&position);
    let cb_finished = Arc::clone(&finished);

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let mut pos = cb_position.load(Ordering::Relaxed);
            for frame in data.chunks_mut(channels) {
                let sample = if pos < cb_samples.len() {
                    let s = cb_samples[pos];
                    pos += 1;
                    s
                } else {
                    cb_finished.store(true, Ordering::Relaxed);
                    0.0
                };
                for out in frame.iter_mut() {
                    *out = sample;
                }
            }
            cb_position.store(pos, Ordering::Relaxed);
        },
        |err| {
            tracing::error!("Audio playback error: {}", err);
        },
        None,
    )?;

    stream.play()?;

    let expected_ms = (samples.len() as u64 * 1000) / u64::from(out_rate);
    let deadline = Instant::now() + Duration::from_millis(expected_ms + 500);
    while !finished.load(Ordering::Relaxed) {
        if Instant::now() > deadline {
            tracing::warn!("Playback did not drain before deadline, stopping early");
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    // Let the device flush its last buffer before tearing down.
    std::thread::sleep(Duration::from_millis(50));
    drop(stream);

    Ok(())
}

/// Interpret raw little-endian 16-bit PCM bytes as samples. Odd
/// trailing bytes are discarded.
pub fn pcm_bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_decode_little_endian() {
        let bytes = [0x00, 0x00, 0xFF, 0x7F, 0x00, 0x80, 0x01];
        assert_eq!(pcm_bytes_to_samples(&bytes), vec![0, 32767, -32768]);
    }
}
