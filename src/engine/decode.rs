//! WAV asset decoding

use hound::{SampleFormat, WavReader};
use std::path::Path;

use crate::error::StationError;

/// A clip fully decoded into memory
#[derive(Debug, Clone)]
pub struct DecodedClip {
    /// Interleaved samples in -1.0..=1.0
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedClip {
    /// Number of frames (samples per channel)
    pub fn frame_length(&self) -> u64 {
        if self.channels == 0 {
            0
        } else {
            (self.samples.len() / self.channels as usize) as u64
        }
    }

    /// Samples of frame `index`, or None past the end
    pub fn frame(&self, index: u64) -> Option<&[f32]> {
        let channels = self.channels as usize;
        let start = index as usize * channels;
        self.samples.get(start..start + channels)
    }
}

/// Decode a WAV file
///
/// Any other extension is rejected as an unsupported format.
pub fn decode_wav(path: &Path) -> Result<DecodedClip, StationError> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);
    if !is_wav {
        return Err(StationError::UnsupportedFormat(format!(
            "{:?} is not a WAV file",
            path
        )));
    }

    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(StationError::UnsupportedFormat("WAV file declares zero channels".into()));
    }

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
            let scale = (1i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
        (format, bits) => {
            return Err(StationError::UnsupportedFormat(format!(
                "{:?} samples at {} bits",
                format, bits
            )))
        }
    };

    Ok(DecodedClip {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}
