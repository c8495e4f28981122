use std::io::Cursor;

use thiserror::Error;

use super::frame::StereoFrame;

// Decoded PCM, immutable once built. Channels are kept as separate arrays
// because the detector walks one channel and reverse materialization copies
// per channel.
#[derive(Clone, Debug)]
pub struct PcmBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed or unsupported audio data: {0}")]
    Malformed(#[from] hound::Error),
    #[error("audio stream contains no samples")]
    Empty,
    #[error("audio stream declares a zero sample rate")]
    ZeroRate,
}

impl PcmBuffer {
    // Decode raw WAV bytes into per-channel float samples. The caller hands us
    // an opaque byte blob; a failure here leaves no partial buffer behind.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return Err(DecodeError::ZeroRate);
        }
        let n_channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader // float, just pass it through
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => { // int, scale down to [-1, 1]
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        if interleaved.is_empty() {
            return Err(DecodeError::Empty);
        }

        let mut channels =
            vec![Vec::with_capacity(interleaved.len() / n_channels + 1); n_channels];
        for (i, s) in interleaved.into_iter().enumerate() {
            channels[i % n_channels].push(s);
        }
        // a truncated final frame would leave the channels ragged
        let frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        for c in &mut channels {
            c.truncate(frames);
        }
        if frames == 0 {
            return Err(DecodeError::Empty);
        }

        Ok(Self {
            sample_rate: spec.sample_rate,
            channels,
        })
    }

    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn duration(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }

    // stereo view over whatever channel layout we decoded: mono doubles up,
    // anything beyond two channels plays its first pair
    pub fn frame_at(&self, index: usize) -> StereoFrame {
        let left = self.channels[0].get(index).copied().unwrap_or(0.0);
        match self.channels.get(1) {
            Some(ch) => StereoFrame {
                left,
                right: ch.get(index).copied().unwrap_or(0.0),
            },
            None => StereoFrame::mono(left),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(channels: u16, rate: u32, samples: &[f32]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn decodes_mono_float_wav() {
        let bytes = wav_bytes(1, 44100, &[0.0, 0.5, -0.5, 1.0]);
        let buf = PcmBuffer::decode(&bytes).unwrap();
        assert_eq!(buf.sample_rate, 44100);
        assert_eq!(buf.channels.len(), 1);
        assert_eq!(buf.frames(), 4);
        assert_eq!(buf.channels[0], vec![0.0, 0.5, -0.5, 1.0]);
    }

    #[test]
    fn decodes_stereo_and_deinterleaves() {
        let bytes = wav_bytes(2, 48000, &[0.1, -0.1, 0.2, -0.2, 0.3, -0.3]);
        let buf = PcmBuffer::decode(&bytes).unwrap();
        assert_eq!(buf.channels.len(), 2);
        assert_eq!(buf.frames(), 3);
        assert_eq!(buf.channels[0], vec![0.1, 0.2, 0.3]);
        assert_eq!(buf.channels[1], vec![-0.1, -0.2, -0.3]);
    }

    #[test]
    fn decodes_int_wav_scaled() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        writer.write_sample(16384i16).unwrap();
        writer.write_sample(-32768i16).unwrap();
        writer.finalize().unwrap();

        let buf = PcmBuffer::decode(&cursor.into_inner()).unwrap();
        assert!((buf.channels[0][0] - 0.5).abs() < 1e-6);
        assert!((buf.channels[0][1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(PcmBuffer::decode(b"definitely not a wav file").is_err());
    }

    #[test]
    fn mono_frame_doubles_up() {
        let bytes = wav_bytes(1, 44100, &[0.25]);
        let buf = PcmBuffer::decode(&bytes).unwrap();
        assert_eq!(buf.frame_at(0), StereoFrame { left: 0.25, right: 0.25 });
        // out of range reads are silence, not panics
        assert_eq!(buf.frame_at(10), StereoFrame::zero());
    }

    #[test]
    fn duration_is_frames_over_rate() {
        let bytes = wav_bytes(1, 1000, &vec![0.0; 500]);
        let buf = PcmBuffer::decode(&bytes).unwrap();
        assert!((buf.duration() - 0.5).abs() < 1e-6);
    }
}
