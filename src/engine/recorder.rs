//! WAV file output line
//!
//! Records a tone to disk instead of a sound card, through the same line
//! interface the live output uses.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::line::{LineProvider, OutputLine};
use crate::error::StationError;
use crate::synth::tone::decode_le;
use crate::synth::PcmFormat;

/// WAV file recorder
///
/// Draining the line finalizes the file, so the header is complete once
/// `drain` returns. Nothing more can be written after that.
pub struct Recorder {
    writer: Option<WavWriter<BufWriter<File>>>,
    sample_rate: u32,
    samples_written: u64,
}

impl Recorder {
    /// Create a new recorder
    ///
    /// # Arguments
    /// * `path` - Output file path
    /// * `format` - PCM layout; only 16-bit integer samples are recorded
    pub fn new(path: &Path, format: &PcmFormat) -> Result<Self, StationError> {
        if format.bits_per_sample != 16 {
            return Err(StationError::UnsupportedFormat(format!(
                "cannot record {}-bit samples",
                format.bits_per_sample
            )));
        }

        let spec = WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let writer = WavWriter::create(path, spec)?;

        Ok(Self {
            writer: Some(writer),
            sample_rate: format.sample_rate,
            samples_written: 0,
        })
    }

    fn duration_secs(&self) -> f64 {
        self.samples_written as f64 / self.sample_rate as f64
    }
}

impl OutputLine for Recorder {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, StationError> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            let err = io::Error::new(io::ErrorKind::BrokenPipe, "recording already finalized");
            StationError::Io(err)
        })?;

        let mut count = 0;
        for sample in decode_le(bytes) {
            writer.write_sample(sample)?;
            count += 1;
        }
        self.samples_written += count;
        Ok(count as usize * 2)
    }

    fn drain(&mut self) -> Result<(), StationError> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            debug!(
                samples = self.samples_written,
                seconds = self.duration_secs(),
                "recording finalized"
            );
        }
        Ok(())
    }
}

/// Opens a [`Recorder`] on a fixed path for every line request
pub struct WavLineProvider {
    path: PathBuf,
}

impl WavLineProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LineProvider for WavLineProvider {
    fn open_line(&self, format: &PcmFormat) -> Result<Box<dyn OutputLine>, StationError> {
        Ok(Box::new(Recorder::new(&self.path, format)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::tone::encode_le;
    use crate::synth::TONE_FORMAT;
    use tempfile::NamedTempFile;

    #[test]
    fn test_recorder_creation() {
        let file = NamedTempFile::new().unwrap();
        let recorder = Recorder::new(file.path(), &TONE_FORMAT).unwrap();

        assert_eq!(recorder.samples_written, 0);
        assert_eq!(recorder.duration_secs(), 0.0);
    }

    #[test]
    fn test_recorder_rejects_float_format() {
        let file = NamedTempFile::new().unwrap();
        let format = PcmFormat { bits_per_sample: 32, ..TONE_FORMAT };

        assert!(matches!(
            Recorder::new(file.path(), &format),
            Err(StationError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_recorder_write_bytes() {
        let file = NamedTempFile::new().unwrap();
        let mut recorder = Recorder::new(file.path(), &TONE_FORMAT).unwrap();

        let written = recorder.write(&encode_le(&[1, 2, 3])).unwrap();
        assert_eq!(written, 6);
        assert_eq!(recorder.samples_written, 3);
    }

    #[test]
    fn test_recorder_duration() {
        let file = NamedTempFile::new().unwrap();
        let mut recorder = Recorder::new(file.path(), &TONE_FORMAT).unwrap();

        // Write 1 second of samples
        recorder.write(&vec![0u8; 88200]).unwrap();

        assert!((recorder.duration_secs() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_recorder_produces_valid_wav() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        {
            let provider = WavLineProvider::new(&path);
            let mut line = provider.open_line(&TONE_FORMAT).unwrap();
            line.write(&encode_le(&[0, 1000, -1000, i16::MAX])).unwrap();
            line.drain().unwrap();
        }

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();

        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, SampleFormat::Int);

        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 1000, -1000, i16::MAX]);
    }

    #[test]
    fn test_drain_finalizes_header() {
        let file = NamedTempFile::new().unwrap();
        let provider = WavLineProvider::new(file.path());
        let mut line = provider.open_line(&TONE_FORMAT).unwrap();

        line.write(&vec![0u8; 8820]).unwrap();
        line.drain().unwrap();

        // The line is still open; the header must already be complete
        let reader = hound::WavReader::open(file.path()).unwrap();
        assert_eq!(reader.len(), 4410);
        assert!(line.write(&[0, 0]).is_err());
    }
}
