//! Output streams using cpal

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{BufferSize, Device, SampleFormat, SampleRate, Stream, StreamConfig};
use tracing::{debug, error};

use crate::error::StationError;

/// Something that renders interleaved f32 frames for an output stream
///
/// Runs on the audio thread: implementations must not block.
pub trait FrameSource: Send + 'static {
    /// Fill `out` with interleaved samples for `channels` output channels
    fn fill(&mut self, out: &mut [f32], channels: usize);
}

/// Find an output device by name, or the default device when `name` is None
pub fn open_device(name: Option<&str>) -> Result<Device, StationError> {
    let host = cpal::default_host();

    match name {
        None => host
            .default_output_device()
            .ok_or_else(|| StationError::DeviceUnavailable("no output device available".into())),
        Some(wanted) => host
            .output_devices()?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or_else(|| {
                StationError::DeviceUnavailable(format!("no output device named '{}'", wanted))
            }),
    }
}

/// Pick the rate to open `device` at for audio recorded at `requested` Hz
///
/// Uses `requested` when the device supports it with its default channel
/// count and sample format, otherwise the device's default rate.
pub fn output_sample_rate(device: &Device, requested: u32) -> Result<u32, StationError> {
    let default_config = device.default_output_config()?;

    let supported = device.supported_output_configs()?.any(|range| {
        range.channels() == default_config.channels()
            && range.sample_format() == default_config.sample_format()
            && range.min_sample_rate().0 <= requested
            && range.max_sample_rate().0 >= requested
    });

    if supported {
        Ok(requested)
    } else {
        let fallback = default_config.sample_rate().0;
        debug!(requested, fallback, "device cannot run at the source rate, resampling");
        Ok(fallback)
    }
}

/// Source frames to advance per output frame
pub fn resample_step(source_rate: u32, output_rate: u32) -> f64 {
    source_rate as f64 / output_rate.max(1) as f64
}

/// Build an output stream at `sample_rate` fed by `source`
///
/// The stream is built but not yet playing. The channel count and sample
/// format follow the device's default configuration. Pick the rate with
/// [`output_sample_rate`].
pub fn build_stream<S: FrameSource>(
    device: &Device,
    sample_rate: u32,
    source: S,
) -> Result<Stream, StationError> {
    let default_config = device.default_output_config()?;
    let sample_format = default_config.sample_format();
    let config = StreamConfig {
        channels: default_config.channels(),
        sample_rate: SampleRate(sample_rate),
        buffer_size: BufferSize::Default,
    };

    match sample_format {
        SampleFormat::F32 => build_typed::<f32, S>(device, &config, source),
        SampleFormat::I16 => build_typed::<i16, S>(device, &config, source),
        SampleFormat::U16 => build_typed::<u16, S>(device, &config, source),
        other => Err(StationError::UnsupportedFormat(format!(
            "device sample format {:?}",
            other
        ))),
    }
}

fn build_typed<T, S>(
    device: &Device,
    config: &StreamConfig,
    mut source: S,
) -> Result<Stream, StationError>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
    S: FrameSource,
{
    let channels = config.channels as usize;
    let mut scratch: Vec<f32> = Vec::new();

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            scratch.resize(data.len(), 0.0);
            source.fill(&mut scratch, channels);
            for (out, &sample) in data.iter_mut().zip(scratch.iter()) {
                *out = T::from_sample(sample);
            }
        },
        |err| {
            error!("Audio stream error: {}", err);
        },
        None,
    )?;

    Ok(stream)
}

/// Spread one source frame across `out_channels` output channels
///
/// Mono is duplicated; wider sources are truncated or wrapped.
pub fn map_frame(frame: &[f32], out: &mut [f32]) {
    if frame.is_empty() {
        out.fill(0.0);
        return;
    }
    for (ch, sample) in out.iter_mut().enumerate() {
        *sample = frame[ch % frame.len()];
    }
}

/// Get the default output device name
pub fn default_device_name() -> Option<String> {
    let host = cpal::default_host();
    host.default_output_device()
        .and_then(|d| d.name().ok())
}

/// List all available output devices
pub fn list_output_devices() -> Vec<(String, StreamConfig)> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let (Ok(name), Ok(config)) = (device.name(), device.default_output_config()) {
                devices.push((name, config.into()));
            }
        }
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_mono_to_stereo() {
        let mut out = [0.0; 2];
        map_frame(&[0.25], &mut out);
        assert_eq!(out, [0.25, 0.25]);
    }

    #[test]
    fn test_map_stereo_to_mono() {
        let mut out = [0.0; 1];
        map_frame(&[0.5, -0.5], &mut out);
        assert_eq!(out, [0.5]);
    }

    #[test]
    fn test_map_empty_frame_is_silence() {
        let mut out = [1.0; 2];
        map_frame(&[], &mut out);
        assert_eq!(out, [0.0, 0.0]);
    }

    #[test]
    fn test_resample_step() {
        assert_eq!(resample_step(44100, 44100), 1.0);
        assert_eq!(resample_step(24000, 48000), 0.5);
        assert!((resample_step(44100, 48000) - 0.91875).abs() < 1e-9);
    }
}
