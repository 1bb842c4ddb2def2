//! Streaming PCM output lines
//!
//! A line accepts raw little-endian PCM bytes in blocking writes, the way a
//! sound card's data line does. It is released when dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::StreamTrait;
use cpal::Stream;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;
use tracing::debug;

use super::output::{
    build_stream, map_frame, open_device, output_sample_rate, resample_step, FrameSource,
};
use crate::error::StationError;
use crate::synth::tone::decode_le;
use crate::synth::PcmFormat;

/// How long a write or drain may go without progress before giving up
const STALL_TIMEOUT: Duration = Duration::from_secs(2);

const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// An open output line
pub trait OutputLine {
    /// Write PCM bytes, blocking until the line has accepted all of them
    fn write(&mut self, bytes: &[u8]) -> Result<usize, StationError>;

    /// Block until everything written so far has been played
    fn drain(&mut self) -> Result<(), StationError>;
}

/// Opens output lines
pub trait LineProvider: Send + Sync {
    fn open_line(&self, format: &PcmFormat) -> Result<Box<dyn OutputLine>, StationError>;
}

/// Lines backed by a cpal output stream
pub struct CpalLineProvider {
    device: Option<String>,
    buffer_frames: usize,
}

impl CpalLineProvider {
    /// Create a provider for the named device (None = default)
    ///
    /// `buffer_frames` is the ring capacity between writer and device.
    pub fn new(device: Option<String>, buffer_frames: usize) -> Self {
        Self {
            device,
            buffer_frames,
        }
    }
}

impl LineProvider for CpalLineProvider {
    fn open_line(&self, format: &PcmFormat) -> Result<Box<dyn OutputLine>, StationError> {
        if format.bits_per_sample != 16 || format.channels == 0 {
            return Err(StationError::UnsupportedFormat(format!(
                "{} channel(s) at {} bits",
                format.channels, format.bits_per_sample
            )));
        }

        let src_channels = format.channels as usize;
        let ring = HeapRb::<f32>::new(self.buffer_frames * src_channels);
        let (producer, consumer) = ring.split();
        let played = Arc::new(AtomicU64::new(0));

        let device = open_device(self.device.as_deref())?;
        let rate = output_sample_rate(&device, format.sample_rate)?;
        let step = resample_step(format.sample_rate, rate);
        let source = RingFrames::new(consumer, src_channels, step, Arc::clone(&played));

        let stream = build_stream(&device, rate, source)?;
        stream.play()?;
        debug!(sample_rate = format.sample_rate, device_rate = rate, "output line opened");

        Ok(Box::new(CpalLine {
            _stream: stream,
            producer,
            played,
            pushed: 0,
        }))
    }
}

/// Reads PCM frames from the ring at the line's own rate
///
/// `played` counts samples taken out of the ring, skipped ones included.
struct RingFrames<C> {
    consumer: C,
    src_channels: usize,
    step: f64,
    phase: f64,
    current: Vec<f32>,
    loaded: bool,
    skip: usize,
    scratch: Vec<f32>,
    played: Arc<AtomicU64>,
}

impl<C> RingFrames<C>
where
    C: Consumer<Item = f32>,
{
    fn new(consumer: C, src_channels: usize, step: f64, played: Arc<AtomicU64>) -> Self {
        Self {
            consumer,
            src_channels,
            step,
            phase: 0.0,
            current: vec![0.0; src_channels],
            loaded: false,
            skip: 0,
            scratch: Vec::new(),
            played,
        }
    }

    /// Load the next frame to hold, dropping any frames stepped over
    fn load_next(&mut self) -> bool {
        let available = self.consumer.occupied_len() / self.src_channels;
        let skipped = self.skip.min(available);
        if skipped > 0 {
            self.scratch.resize(skipped * self.src_channels, 0.0);
            let read = self.consumer.pop_slice(&mut self.scratch);
            self.played.fetch_add(read as u64, Ordering::SeqCst);
            self.skip -= skipped;
        }
        if self.skip > 0 || available == skipped {
            return false;
        }

        let read = self.consumer.pop_slice(&mut self.current);
        self.played.fetch_add(read as u64, Ordering::SeqCst);
        true
    }
}

impl<C> FrameSource for RingFrames<C>
where
    C: Consumer<Item = f32> + Send + 'static,
{
    fn fill(&mut self, out: &mut [f32], channels: usize) {
        for frame in out.chunks_mut(channels.max(1)) {
            if !self.loaded {
                self.loaded = self.load_next();
            }
            if !self.loaded {
                frame.fill(0.0);
                continue;
            }

            map_frame(&self.current, frame);
            self.phase += self.step;
            let advance = self.phase.floor();
            if advance >= 1.0 {
                self.phase -= advance;
                self.loaded = false;
                self.skip = advance as usize - 1;
            }
        }
    }
}

struct CpalLine<P> {
    _stream: Stream,
    producer: P,
    played: Arc<AtomicU64>,
    pushed: u64,
}

impl<P> OutputLine for CpalLine<P>
where
    P: Producer<Item = f32>,
{
    fn write(&mut self, bytes: &[u8]) -> Result<usize, StationError> {
        let samples: Vec<f32> = decode_le(bytes).map(|s| s as f32 / 32768.0).collect();

        let mut offset = 0;
        let mut last_progress = Instant::now();
        while offset < samples.len() {
            let n = self.producer.push_slice(&samples[offset..]);
            if n > 0 {
                offset += n;
                last_progress = Instant::now();
            } else if last_progress.elapsed() > STALL_TIMEOUT {
                return Err(StationError::DeviceUnavailable("output line stalled".into()));
            } else {
                thread::sleep(POLL_INTERVAL);
            }
        }

        self.pushed += samples.len() as u64;
        Ok(samples.len() * 2)
    }

    fn drain(&mut self) -> Result<(), StationError> {
        let mut last_seen = self.played.load(Ordering::SeqCst);
        let mut last_progress = Instant::now();
        loop {
            let played = self.played.load(Ordering::SeqCst);
            if played >= self.pushed {
                return Ok(());
            }
            if played != last_seen {
                last_seen = played;
                last_progress = Instant::now();
            } else if last_progress.elapsed() > STALL_TIMEOUT {
                return Err(StationError::DeviceUnavailable(
                    "output line stalled while draining".into(),
                ));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}
