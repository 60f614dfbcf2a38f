use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Streaming mono resampler bridging the device rate to the 16 kHz
/// pipeline rate. Accumulates arbitrary-sized input and processes it
/// in the fixed chunks rubato requires.
pub struct MonoResampler {
    in_rate: u32,
    out_rate: u32,
    inner: Option<SincFixedIn<f32>>,
    pending: Vec<f32>,
    chunk_size: usize,
}

impl MonoResampler {
    pub fn new(in_rate: u32, out_rate: u32) -> Self {
        let chunk_size = 512;
        let inner = if in_rate == out_rate {
            None
        } else {
            // Sinc parameters tuned for speech: medium filter length,
            // cutoff just under Nyquist for anti-aliasing.
            let params = SincInterpolationParameters {
                sinc_len: 64,
                f_cutoff: 0.95,
                interpolation: SincInterpolationType::Cubic,
                oversampling_factor: 128,
                window: WindowFunction::Blackman2,
            };
            Some(
                SincFixedIn::<f32>::new(
                    out_rate as f64 / in_rate as f64,
                    2.0,
                    params,
                    chunk_size,
                    1,
                )
                .expect("valid resampler parameters"),
            )
        };

        Self {
            in_rate,
            out_rate,
            inner,
            pending: Vec::with_capacity(chunk_size * 2),
            chunk_size,
        }
    }

    /// Feed a chunk of mono i16 samples; returns whatever resampled
    /// output is ready (possibly empty while the filter fills).
    pub fn process(&mut self, input: &[i16]) -> Vec<i16> {
        let Some(inner) = self.inner.as_mut() else {
            return input.to_vec();
        };

        self.pending
            .extend(input.iter().map(|&s| s as f32 / 32768.0));

        let mut out = Vec::new();
        while self.pending.len() >= self.chunk_size {
            let chunk: Vec<f32> = self.pending.drain(..self.chunk_size).collect();
            match inner.process(&[chunk], None) {
                Ok(mut frames) => {
                    if let Some(channel) = frames.pop() {
                        out.extend(channel.iter().map(|&s| {
                            (s.clamp(-1.0, 1.0) * 32767.0).round() as i16
                        }));
                    }
                }
                Err(e) => {
                    tracing::error!("Resampler error: {}", e);
                    break;
                }
            }
        }
        out
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        if let Some(inner) = self.inner.as_mut() {
            inner.reset();
        }
    }

    pub fn input_rate(&self) -> u32 {
        self.in_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.out_rate
    }
}
