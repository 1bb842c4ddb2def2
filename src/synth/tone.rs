//! Pattern tones
//!
//! A pattern string is folded into a frequency between 200 and 1000 Hz,
//! then rendered as ten seconds of 16-bit mono PCM.

use super::Oscillator;
use std::time::Duration;

/// Lowest frequency a pattern can map to
pub const BASE_FREQUENCY_HZ: u32 = 200;

/// Number of distinct frequencies above the base (200..=1000 Hz)
pub const FREQUENCY_SPAN: u64 = 801;

/// Length of every tone
pub const TONE_DURATION: Duration = Duration::from_secs(10);

/// Bytes written to the output line per chunk
pub const CHUNK_BYTES: usize = 4096;

/// Raw PCM layout of a line or buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

/// 44.1 kHz, 16-bit signed little-endian, mono
pub const TONE_FORMAT: PcmFormat = PcmFormat {
    sample_rate: 44100,
    channels: 1,
    bits_per_sample: 16,
};

/// Check whether a pattern carries anything to synthesize
pub fn is_blank(pattern: Option<&str>) -> bool {
    pattern.map_or(true, |p| p.trim().is_empty())
}

/// Derive the tone frequency of a pattern
///
/// `200 + (sum of code points mod 801)`. Only the sum matters, so any
/// permutation of the same characters gives the same tone.
pub fn frequency_hz(pattern: &str) -> u32 {
    let sum: u64 = pattern.chars().map(|c| c as u64).sum();
    BASE_FREQUENCY_HZ + (sum % FREQUENCY_SPAN) as u32
}

/// Number of samples in a tone of the given format
pub fn tone_sample_count(format: &PcmFormat) -> usize {
    (TONE_DURATION.as_secs() * format.sample_rate as u64) as usize
}

/// Render a full-length tone as signed 16-bit samples
pub fn generate_samples(frequency: u32, format: &PcmFormat) -> Vec<i16> {
    Oscillator::new(frequency as f64, format.sample_rate as f64)
        .take(tone_sample_count(format))
        .collect()
}

/// Encode samples as little-endian bytes
pub fn encode_le(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Decode little-endian bytes back into samples
///
/// A trailing odd byte is ignored.
pub fn decode_le(bytes: &[u8]) -> impl Iterator<Item = i16> + '_ {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
}

/// Render the encoded byte stream for a pattern's tone
pub fn render_pattern(pattern: &str) -> (u32, Vec<u8>) {
    let frequency = frequency_hz(pattern);
    let bytes = encode_le(&generate_samples(frequency, &TONE_FORMAT));
    (frequency, bytes)
}
