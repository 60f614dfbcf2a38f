use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::device::open_input_device;
use crate::ring_buffer::SampleProducer;
use vesper_foundation::AudioError;

/// Negotiated stream parameters, reported back to the chunker so it
/// knows what it is resampling from.
#[derive(Debug, Clone, Copy)]
pub struct DeviceConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Default)]
pub struct CaptureStats {
    pub samples_captured: AtomicU64,
    pub samples_dropped: AtomicU64,
    pub callbacks: AtomicU64,
}

/// Handle to the dedicated `audio-capture` thread. The cpal stream
/// lives entirely on that thread; this handle only carries the stop
/// flag and join handle.
pub struct CaptureThread {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    stats: Arc<CaptureStats>,
}

impl CaptureThread {
    pub fn spawn(
        producer: SampleProducer,
        device_name: Option<String>,
    ) -> Result<(Self, DeviceConfig), AudioError> {
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(CaptureStats::default());
        let (config_tx, config_rx) = mpsc::channel::<Result<DeviceConfig, AudioError>>();

        let thread_running = Arc::clone(&running);
        let thread_stats = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || {
                run_capture(
                    producer,
                    device_name,
                    thread_running,
                    thread_stats,
                    config_tx,
                );
            })
            .map_err(|e| AudioError::Fatal(format!("Failed to spawn audio thread: {}", e)))?;

        let config = config_rx
            .recv_timeout(Duration::from_secs(5))
            .map_err(|_| AudioError::Fatal("Audio device did not start within timeout".into()))??;

        Ok((
            Self {
                handle: Some(handle),
                running,
                stats,
            },
            config,
        ))
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    /// Release the device and join the capture thread. Shutdown latency
    /// is bounded by the thread's poll period, not by any remote call.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        tracing::info!("Audio capture thread stopped");
    }
}

impl Drop for CaptureThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_capture(
    producer: SampleProducer,
    device_name: Option<String>,
    running: Arc<AtomicBool>,
    stats: Arc<CaptureStats>,
    config_tx: mpsc::Sender<Result<DeviceConfig, AudioError>>,
) {
    let device = match open_input_device(device_name.as_deref()) {
        Ok(d) => d,
        Err(e) => {
            let _ = config_tx.send(Err(e));
            return;
        }
    };

    let (config, sample_format) = match negotiate_config(&device) {
        Ok(c) => c,
        Err(e) => {
            let _ = config_tx.send(Err(e));
            return;
        }
    };
    let device_config = DeviceConfig {
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    };

    if let Ok(name) = device.name() {
        tracing::info!(
            device = %name,
            sample_rate = device_config.sample_rate,
            channels = device_config.channels,
            "Selected input device"
        );
    }

    let stream = match build_stream(&device, &config, sample_format, producer, stats, &running) {
        Ok(s) => s,
        Err(e) => {
            let _ = config_tx.send(Err(e));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = config_tx.send(Err(e.into()));
        return;
    }
    let _ = config_tx.send(Ok(device_config));

    // Keep the stream alive until asked to stop. The flag is also read
    // by the callback so samples stop flowing immediately.
    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(50));
    }
    drop(stream);
}

fn negotiate_config(device: &cpal::Device) -> Result<(StreamConfig, SampleFormat), AudioError> {
    if let Ok(default_config) = device.default_input_config() {
        return Ok((
            StreamConfig {
                channels: default_config.channels(),
                sample_rate: default_config.sample_rate(),
                buffer_size: cpal::BufferSize::Default,
            },
            default_config.sample_format(),
        ));
    }

    if let Ok(mut configs) = device.supported_input_configs() {
        if let Some(config) = configs.next() {
            return Ok((config.with_max_sample_rate().into(), config.sample_format()));
        }
    }

    Err(AudioError::FormatNotSupported {
        format: "No supported input formats".to_string(),
    })
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    mut producer: SampleProducer,
    stats: Arc<CaptureStats>,
    running: &Arc<AtomicBool>,
) -> Result<cpal::Stream, AudioError> {
    let running = Arc::clone(running);

    let err_fn = |err: cpal::StreamError| {
        tracing::error!("Audio stream error: {}", err);
    };

    let mut handle_i16 = move |data: &[i16]| {
        if !running.load(Ordering::SeqCst) {
            return;
        }
        stats.callbacks.fetch_add(1, Ordering::Relaxed);
        let written = producer.write(data);
        stats
            .samples_captured
            .fetch_add(written as u64, Ordering::Relaxed);
        if written < data.len() {
            stats
                .samples_dropped
                .fetch_add((data.len() - written) as u64, Ordering::Relaxed);
        }
    };

    // Thread-local scratch avoids allocating in the audio callback.
    thread_local! {
        static CONVERT: std::cell::RefCell<Vec<i16>> = const { std::cell::RefCell::new(Vec::new()) };
    }

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &_| handle_i16(data),
            err_fn,
            None,
        )?,
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &_| {
                CONVERT.with(|buf| {
                    let mut converted = buf.borrow_mut();
                    converted.clear();
                    converted.extend(
                        data.iter()
                            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16),
                    );
                    handle_i16(&converted);
                });
            },
            err_fn,
            None,
        )?,
        SampleFormat::U16 => device.build_input_stream(
            config,
            move |data: &[u16], _: &_| {
                CONVERT.with(|buf| {
                    let mut converted = buf.borrow_mut();
                    converted.clear();
                    converted.extend(data.iter().map(|&s| (s as i32 - 32768) as i16));
                    handle_i16(&converted);
                });
            },
            err_fn,
            None,
        )?,
        other => {
            return Err(AudioError::FormatNotSupported {
                format: format!("{:?}", other),
            });
        }
    };

    Ok(stream)
}

#[cfg(test)]
mod convert_tests {
    #[test]
    fn f32_to_i16_full_scale() {
        let src = [-1.0f32, -0.5, 0.0, 0.5, 1.0];
        let out: Vec<i16> = src
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16)
            .collect();
        assert_eq!(out, vec![-32767, -16384, 0, 16384, 32767]);
    }

    #[test]
    fn u16_to_i16_centering() {
        let src = [0u16, 32768, 65535];
        let out: Vec<i16> = src.iter().map(|&s| (s as i32 - 32768) as i16).collect();
        assert_eq!(out, vec![-32768, 0, 32767]);
    }
}
