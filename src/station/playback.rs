//! Clip playback state machine
//!
//! Owns at most one clip at a time. Every transition (play, pause, resume,
//! and the driver's completion notification) runs under the same mutex.
//!
//! ```text
//! STOPPED --play--> PLAYING --pause--> PAUSED --resume--> PLAYING
//!                      |                  |
//!                      +---reach end------+--> released
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{error, info, warn};

use super::assets::AssetLocator;
use crate::engine::{Clip, ClipDriver, CompletionListener};
use crate::error::StationError;

/// The clip currently owned by the station
struct ActiveClip {
    /// Distinguishes this clip from ones it superseded
    generation: u64,
    clip: Box<dyn Clip>,
}

#[derive(Default)]
struct PlaybackState {
    current: Option<ActiveClip>,
    pause_frame_position: u64,
    generations: u64,
}

impl PlaybackState {
    /// Stop and drop the owned clip, if any
    fn release_current(&mut self) -> bool {
        self.pause_frame_position = 0;
        match self.current.take() {
            Some(mut active) => {
                active.clip.stop();
                true
            }
            None => false,
        }
    }
}

/// Snapshot of the owned clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipStatus {
    pub playing: bool,
    pub frame_position: u64,
    pub frame_length: u64,
}

/// Snapshot of the playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackStatus {
    pub clip: Option<ClipStatus>,
    pub pause_frame_position: u64,
}

/// Drives the single active clip
pub struct PlaybackController {
    name: Arc<str>,
    driver: Arc<dyn ClipDriver>,
    assets: AssetLocator,
    state: Arc<Mutex<PlaybackState>>,
}

impl PlaybackController {
    /// Create a controller with no clip loaded
    pub fn new(
        name: impl Into<Arc<str>>,
        driver: Arc<dyn ClipDriver>,
        assets: AssetLocator,
    ) -> Self {
        Self {
            name: name.into(),
            driver,
            assets,
            state: Arc::new(Mutex::new(PlaybackState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PlaybackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace whatever is playing with song `song_id`
    ///
    /// A missing asset leaves everything untouched. Open failures leave the
    /// station with no clip.
    pub fn play_bird_song(&self, song_id: i32) {
        let mut state = self.lock();

        let path = match self.assets.resolve(song_id) {
            Ok(path) => path,
            Err(e) => {
                warn!(station = %self.name, song_id, "{}", e);
                return;
            }
        };

        if state.release_current() {
            info!(station = %self.name, "previous clip released");
        }

        state.generations += 1;
        let generation = state.generations;
        let listener = completion_listener(
            Arc::downgrade(&self.state),
            Arc::clone(&self.name),
            generation,
        );

        let mut clip = match self.driver.open(&path, listener) {
            Ok(clip) => clip,
            Err(e) => {
                report_playback_error(&self.name, song_id, &e);
                return;
            }
        };

        info!(station = %self.name, song_id, path = ?path, "playing bird song");
        clip.start();
        state.current = Some(ActiveClip { generation, clip });
    }

    /// Pause the clip, remembering where it stopped
    pub fn pause_audio(&self) {
        let mut state = self.lock();
        let state = &mut *state;

        match state.current.as_mut() {
            Some(active) if active.clip.is_running() => {
                state.pause_frame_position = active.clip.frame_position();
                active.clip.stop();
                info!(station = %self.name, frame = state.pause_frame_position, "audio paused");
            }
            _ => info!(station = %self.name, "no active audio to pause"),
        }
    }

    /// Resume the clip from the frame captured at pause
    pub fn resume_audio(&self) {
        let mut state = self.lock();
        let state = &mut *state;

        match state.current.as_mut() {
            Some(active) if !active.clip.is_running() => {
                active.clip.set_frame_position(state.pause_frame_position);
                active.clip.start();
                info!(station = %self.name, frame = state.pause_frame_position, "audio resumed");
            }
            _ => info!(station = %self.name, "no paused audio to resume"),
        }
    }

    /// Stop and release the clip, if any
    pub fn stop(&self) {
        if self.lock().release_current() {
            info!(station = %self.name, "clip released");
        }
    }

    /// Current state of the owned clip
    pub fn status(&self) -> PlaybackStatus {
        let state = self.lock();
        PlaybackStatus {
            clip: state.current.as_ref().map(|active| ClipStatus {
                playing: active.clip.is_running(),
                frame_position: active.clip.frame_position(),
                frame_length: active.clip.frame_length(),
            }),
            pause_frame_position: state.pause_frame_position,
        }
    }
}

fn report_playback_error(name: &str, song_id: i32, err: &StationError) {
    match err {
        StationError::UnsupportedFormat(_) => {
            error!(station = %name, song_id, "cannot play audio: {}", err)
        }
        StationError::DeviceUnavailable(_) => {
            error!(station = %name, song_id, "cannot open audio device: {}", err)
        }
        _ => error!(station = %name, song_id, "error playing audio: {}", err),
    }
}

/// Build the observer a clip's driver calls when the clip reaches its end
///
/// It only releases the clip it was registered for, and only if that clip's
/// cursor is still at the end once the lock is held: a resume or a new song
/// may have got there first.
fn completion_listener(
    state: Weak<Mutex<PlaybackState>>,
    name: Arc<str>,
    generation: u64,
) -> CompletionListener {
    Box::new(move || {
        let Some(state) = state.upgrade() else {
            return;
        };
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);

        let finished = match state.current.as_ref() {
            Some(active) if active.generation == generation => {
                active.clip.frame_position() >= active.clip.frame_length()
            }
            _ => false,
        };

        if finished {
            state.release_current();
            info!(station = %name, "playback finished");
        }
    })
}
