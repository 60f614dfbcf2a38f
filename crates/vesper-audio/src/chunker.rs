use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};

use crate::capture::DeviceConfig;
use crate::frame::{AudioFrame, FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ};
use crate::resampler::MonoResampler;
use crate::ring_buffer::SampleConsumer;

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub frame_size_samples: usize,
    pub sample_rate_hz: u32,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            frame_size_samples: FRAME_SIZE_SAMPLES,
            sample_rate_hz: SAMPLE_RATE_HZ,
        }
    }
}

/// Drains the capture ring buffer, downmixes to mono, resamples to the
/// pipeline rate, and broadcasts fixed-size frames. Receivers that fall
/// behind lag and lose the oldest frames; the device side is never
/// backpressured.
pub struct FrameChunker {
    consumer: SampleConsumer,
    output_tx: broadcast::Sender<AudioFrame>,
    device: DeviceConfig,
    cfg: ChunkerConfig,
    running: Arc<AtomicBool>,
}

impl FrameChunker {
    pub fn new(
        consumer: SampleConsumer,
        output_tx: broadcast::Sender<AudioFrame>,
        device: DeviceConfig,
        cfg: ChunkerConfig,
    ) -> Self {
        Self {
            consumer,
            output_tx,
            device,
            cfg,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let mut worker = ChunkerWorker {
            consumer: self.consumer,
            output_tx: self.output_tx,
            cfg: self.cfg,
            channels: self.device.channels.max(1) as usize,
            resampler: MonoResampler::new(self.device.sample_rate, self.cfg.sample_rate_hz),
            pending: VecDeque::with_capacity(self.cfg.frame_size_samples * 4),
            next_seq: 0,
        };
        tokio::spawn(async move {
            worker.run(running).await;
        })
    }
}

struct ChunkerWorker {
    consumer: SampleConsumer,
    output_tx: broadcast::Sender<AudioFrame>,
    cfg: ChunkerConfig,
    channels: usize,
    resampler: MonoResampler,
    pending: VecDeque<i16>,
    next_seq: u64,
}

impl ChunkerWorker {
    async fn run(&mut self, running: Arc<AtomicBool>) {
        tracing::info!(
            in_rate = self.resampler.input_rate(),
            out_rate = self.resampler.output_rate(),
            channels = self.channels,
            "Frame chunker started"
        );

        let mut scratch = vec![0i16; 4096];
        while running.load(Ordering::SeqCst) {
            let read = self.consumer.read(&mut scratch);
            if read == 0 {
                // Poll just under one frame period so shutdown latency
                // and frame latency both stay bounded by ~32 ms.
                time::sleep(Duration::from_millis(25)).await;
                continue;
            }

            let mono = downmix(&scratch[..read], self.channels);
            let resampled = self.resampler.process(&mono);
            self.pending.extend(resampled);
            self.flush_ready_frames();
        }

        tracing::info!("Frame chunker stopped");
    }

    fn flush_ready_frames(&mut self) {
        let fs = self.cfg.frame_size_samples;
        while self.pending.len() >= fs {
            let samples: Vec<i16> = self.pending.drain(..fs).collect();
            let frame = AudioFrame {
                samples,
                seq: self.next_seq,
                sample_rate: self.cfg.sample_rate_hz,
            };
            self.next_seq += 1;
            // Send only fails with zero receivers; that just means the
            // pipeline is still wiring up or tearing down.
            let _ = self.output_tx.send(frame);
        }
    }
}

/// Average interleaved channels down to mono. Truncated trailing
/// frames (fewer samples than channels) are dropped.
fn downmix(samples: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring_buffer::SampleRingBuffer;

    #[test]
    fn downmix_averages_stereo_pairs() {
        let interleaved = [100i16, 300, -50, 50, 7, 7];
        assert_eq!(downmix(&interleaved, 2), vec![200, 0, 7]);
    }

    #[test]
    fn downmix_passthrough_for_mono() {
        let samples = [1i16, 2, 3];
        assert_eq!(downmix(&samples, 1), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn emits_fixed_frames_with_monotonic_seq() {
        let (producer, consumer) = SampleRingBuffer::new(FRAME_SIZE_SAMPLES * 8).split();
        let mut producer = producer;
        let (tx, mut rx) = broadcast::channel(16);

        let device = DeviceConfig {
            sample_rate: SAMPLE_RATE_HZ,
            channels: 1,
        };
        let chunker = FrameChunker::new(consumer, tx, device, ChunkerConfig::default());
        let handle = chunker.spawn();

        // Three frames' worth of samples, written in odd-sized chunks.
        let total = FRAME_SIZE_SAMPLES * 3;
        let samples: Vec<i16> = (0..total).map(|i| (i % 1000) as i16).collect();
        for chunk in samples.chunks(700) {
            assert_eq!(producer.write(chunk), chunk.len());
        }

        for expected_seq in 0..3u64 {
            let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("frame within timeout")
                .expect("channel open");
            assert_eq!(frame.seq, expected_seq);
            assert_eq!(frame.samples.len(), FRAME_SIZE_SAMPLES);
            assert_eq!(frame.sample_rate, SAMPLE_RATE_HZ);
        }

        handle.abort();
        let _ = handle.await;
    }
}
