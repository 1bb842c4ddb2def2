//! Error kinds raised inside the station core
//!
//! None of these reach a remote caller: the station logs them at its
//! boundary and carries on.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while resolving, opening, or streaming audio
#[derive(Debug, Error)]
pub enum StationError {
    /// No asset file exists for the requested song
    #[error("asset not found: {0:?}")]
    AssetNotFound(PathBuf),

    /// The asset or requested stream format cannot be handled
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// No usable output device, or the device refused the stream
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

impl From<hound::Error> for StationError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(io) => StationError::Io(io),
            other => StationError::UnsupportedFormat(other.to_string()),
        }
    }
}

impl From<cpal::BuildStreamError> for StationError {
    fn from(err: cpal::BuildStreamError) -> Self {
        StationError::DeviceUnavailable(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for StationError {
    fn from(err: cpal::PlayStreamError) -> Self {
        StationError::DeviceUnavailable(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for StationError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        StationError::DeviceUnavailable(err.to_string())
    }
}

impl From<cpal::SupportedStreamConfigsError> for StationError {
    fn from(err: cpal::SupportedStreamConfigsError) -> Self {
        StationError::DeviceUnavailable(err.to_string())
    }
}

impl From<cpal::DevicesError> for StationError {
    fn from(err: cpal::DevicesError) -> Self {
        StationError::DeviceUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hound_io_error_maps_to_io() {
        let err: StationError =
            hound::Error::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")).into();
        assert!(matches!(err, StationError::Io(_)));
    }

    #[test]
    fn test_hound_format_error_maps_to_unsupported() {
        let err: StationError = hound::Error::FormatError("no RIFF tag found").into();
        assert!(matches!(err, StationError::UnsupportedFormat(_)));
    }
}
