use std::io::Cursor;

use vesper_audio::Utterance;

/// Encode a captured utterance as a 16-bit mono WAV payload for the
/// transcription request.
pub fn encode(utterance: &Utterance) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: utterance.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in &utterance.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_audio::SAMPLE_RATE_HZ;

    #[test]
    fn round_trips_through_hound() {
        let utterance = Utterance {
            samples: vec![0, 100, -100, 32767, -32768],
            sample_rate: SAMPLE_RATE_HZ,
            speech_frames: 1,
        };
        let bytes = encode(&utterance).unwrap();

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, SAMPLE_RATE_HZ);
        assert_eq!(spec.bits_per_sample, 16);
        let decoded: Vec<i16> = reader.into_samples().map(Result::unwrap).collect();
        assert_eq!(decoded, utterance.samples);
    }
}
