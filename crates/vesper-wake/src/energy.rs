//! RMS energy measurement shared by the reference wake engine and the
//! utterance capturer's silence tracking.

pub fn rms(frame: &[i16]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_squares: i64 = frame
        .iter()
        .map(|&sample| {
            let s = sample as i64;
            s * s
        })
        .sum();
    let mean_square = sum_squares as f64 / frame.len() as f64;
    (mean_square.sqrt() / 32768.0) as f32
}

pub fn dbfs(frame: &[i16]) -> f32 {
    let rms = rms(frame);
    if rms <= 1e-10 {
        return -100.0;
    }
    20.0 * rms.log10()
}
