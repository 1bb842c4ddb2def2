//! Sine oscillator addressed by sample index

use std::f64::consts::PI;

/// A full-scale sine oscillator
///
/// The phase of every sample is computed from its index rather than
/// accumulated, so sample `i` is exactly `sin(2π·i·f / rate)` no matter how
/// long the tone runs.
#[derive(Debug, Clone)]
pub struct Oscillator {
    frequency: f64,
    sample_rate: f64,
    index: u64,
}

impl Oscillator {
    /// Create a new oscillator
    pub fn new(frequency: f64, sample_rate: f64) -> Self {
        Self {
            frequency,
            sample_rate,
            index: 0,
        }
    }

    /// Value of sample `index` in -1.0..=1.0
    pub fn sample_at(&self, index: u64) -> f64 {
        let angle = 2.0 * PI * index as f64 * self.frequency / self.sample_rate;
        angle.sin()
    }

    /// Generate the next sample
    pub fn generate(&mut self) -> f64 {
        let sample = self.sample_at(self.index);
        self.index += 1;
        sample
    }

    /// Generate the next sample as signed 16-bit PCM
    pub fn generate_i16(&mut self) -> i16 {
        (self.generate() * i16::MAX as f64) as i16
    }
}

impl Iterator for Oscillator {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        Some(self.generate_i16())
    }
}
