//! Tone synthesis
//!
//! Frequency derivation from pattern strings and PCM generation.

mod oscillator;
pub mod tone;

pub use oscillator::Oscillator;
pub use tone::{frequency_hz, PcmFormat, CHUNK_BYTES, TONE_DURATION, TONE_FORMAT};
