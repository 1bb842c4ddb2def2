//! Seekable clips and the driver that plays them
//!
//! A [`Clip`] is released by dropping it. Ownership of the box is the
//! exclusive handle: whoever holds it is the only one able to release it,
//! and it can only be released once.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;

use cpal::traits::StreamTrait;
use tracing::{debug, warn};

use super::decode::{decode_wav, DecodedClip};
use super::output::{
    build_stream, map_frame, open_device, output_sample_rate, resample_step, FrameSource,
};
use crate::error::StationError;

/// Observer invoked when a clip's play cursor reaches its end
///
/// Drivers call it on their own execution context, never from inside a
/// [`Clip`] method, so it may take locks the clip's owner holds while
/// calling into the clip.
pub type CompletionListener = Box<dyn Fn() + Send + Sync + 'static>;

/// A loaded, seekable audio resource
pub trait Clip: Send {
    /// Total number of frames
    fn frame_length(&self) -> u64;

    /// Current play cursor in frames
    fn frame_position(&self) -> u64;

    /// Move the play cursor
    fn set_frame_position(&mut self, frame: u64);

    /// Check if the clip is currently playing
    fn is_running(&self) -> bool;

    /// Start (or continue) playback from the current cursor
    fn start(&mut self);

    /// Stop playback, keeping the cursor and the resource
    fn stop(&mut self);
}

/// Opens clips from asset files
pub trait ClipDriver: Send + Sync {
    /// Open the clip at `path`, stopped at frame 0
    ///
    /// `on_complete` is registered before the clip is returned.
    fn open(
        &self,
        path: &Path,
        on_complete: CompletionListener,
    ) -> Result<Box<dyn Clip>, StationError>;
}

/// Clip driver playing decoded WAV files through cpal
pub struct CpalClipDriver {
    device: Option<String>,
}

impl CpalClipDriver {
    /// Create a driver for the named output device (None = default)
    pub fn new(device: Option<String>) -> Self {
        Self { device }
    }
}

impl ClipDriver for CpalClipDriver {
    fn open(
        &self,
        path: &Path,
        on_complete: CompletionListener,
    ) -> Result<Box<dyn Clip>, StationError> {
        let decoded = decode_wav(path)?;
        let clip = CpalClip::spawn(self.device.clone(), decoded, on_complete)?;
        Ok(Box::new(clip))
    }
}

enum DriverEvent {
    Completed,
    Close,
}

struct ClipShared {
    audio: DecodedClip,
    position: AtomicU64,
    running: AtomicBool,
}

impl ClipShared {
    /// Move the cursor, clamped to the end of the clip
    fn seek(&self, frame: u64) {
        let frame = frame.min(self.audio.frame_length());
        self.position.store(frame, Ordering::SeqCst);
    }
}

/// Feeds the stream from the shared clip state
///
/// The cursor counts clip frames. When the device runs at another rate each
/// output frame advances it by `step`, holding the nearest clip frame.
struct ClipFrames {
    shared: Arc<ClipShared>,
    events: Sender<DriverEvent>,
    step: f64,
    phase: f64,
}

impl ClipFrames {
    fn new(shared: Arc<ClipShared>, events: Sender<DriverEvent>, step: f64) -> Self {
        Self {
            shared,
            events,
            step,
            phase: 0.0,
        }
    }
}

impl FrameSource for ClipFrames {
    fn fill(&mut self, out: &mut [f32], channels: usize) {
        if !self.shared.running.load(Ordering::SeqCst) {
            out.fill(0.0);
            return;
        }

        let mut position = self.shared.position.load(Ordering::SeqCst);
        let mut reached_end = false;
        for frame in out.chunks_mut(channels) {
            match self.shared.audio.frame(position) {
                Some(samples) => {
                    map_frame(samples, frame);
                    self.phase += self.step;
                    let advance = self.phase.floor();
                    self.phase -= advance;
                    position += advance as u64;
                }
                None => {
                    frame.fill(0.0);
                    reached_end = true;
                }
            }
        }
        let position = position.min(self.shared.audio.frame_length());
        self.shared.position.store(position, Ordering::SeqCst);

        if reached_end && self.shared.running.swap(false, Ordering::SeqCst) {
            let _ = self.events.send(DriverEvent::Completed);
        }
    }
}

/// A clip whose stream lives on a dedicated driver thread
///
/// cpal streams cannot leave the thread that built them, so the driver
/// thread owns the stream and delivers completion notifications.
pub struct CpalClip {
    shared: Arc<ClipShared>,
    events: Sender<DriverEvent>,
}

impl CpalClip {
    fn spawn(
        device: Option<String>,
        audio: DecodedClip,
        on_complete: CompletionListener,
    ) -> Result<Self, StationError> {
        let sample_rate = audio.sample_rate;
        let shared = Arc::new(ClipShared {
            audio,
            position: AtomicU64::new(0),
            running: AtomicBool::new(false),
        });

        let (events, inbox) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let frame_shared = Arc::clone(&shared);
        let frame_events = events.clone();

        thread::Builder::new()
            .name("clip-driver".to_string())
            .spawn(move || {
                let opened = open_device(device.as_deref()).and_then(|d| {
                    let rate = output_sample_rate(&d, sample_rate)?;
                    let step = resample_step(sample_rate, rate);
                    let frames = ClipFrames::new(frame_shared, frame_events, step);
                    let stream = build_stream(&d, rate, frames)?;
                    stream.play()?;
                    Ok(stream)
                });
                let stream = match opened {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                for event in inbox {
                    match event {
                        DriverEvent::Completed => on_complete(),
                        DriverEvent::Close => break,
                    }
                }

                drop(stream);
                debug!("clip driver released its stream");
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { shared, events }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(StationError::DeviceUnavailable(
                "clip driver exited during setup".into(),
            )),
        }
    }
}

impl Clip for CpalClip {
    fn frame_length(&self) -> u64 {
        self.shared.audio.frame_length()
    }

    fn frame_position(&self) -> u64 {
        self.shared.position.load(Ordering::SeqCst)
    }

    fn set_frame_position(&mut self, frame: u64) {
        self.shared.seek(frame);
    }

    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    fn start(&mut self) {
        self.shared.running.store(true, Ordering::SeqCst);
    }

    fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for CpalClip {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        // Not joined: the driver thread may be the one dropping us from
        // inside the completion listener.
        if self.events.send(DriverEvent::Close).is_err() {
            warn!("clip driver already gone at release");
        }
    }
}
