//! The station: one command surface over clip playback and tone synthesis
//!
//! Clip commands are serialized through the playback controller's lock.
//! Tone commands are not: they replace the background session and return.
//! The two audio paths are independent and may sound at the same time.

mod assets;
mod playback;
mod tone;

#[cfg(test)]
pub(crate) mod testing;

pub use assets::AssetLocator;
pub use playback::{ClipStatus, PlaybackController, PlaybackStatus};
pub use tone::{stream_chunks, CancellationToken, StreamOutcome, ToneSynthesizer};

use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

use crate::config::StationConfig;
use crate::engine::{ClipDriver, CpalClipDriver, CpalLineProvider, LineProvider};

/// Remotely controlled audio station
pub struct Station {
    name: Arc<str>,
    playback: PlaybackController,
    tone: ToneSynthesizer,
}

impl Station {
    /// Create a station from its parts
    pub fn new(
        name: impl Into<Arc<str>>,
        assets: AssetLocator,
        clips: Arc<dyn ClipDriver>,
        lines: Arc<dyn LineProvider>,
        runtime: Handle,
    ) -> Self {
        let name = name.into();
        Self {
            playback: PlaybackController::new(Arc::clone(&name), clips, assets),
            tone: ToneSynthesizer::new(Arc::clone(&name), lines, runtime),
            name,
        }
    }

    /// Create a station playing through the configured sound card
    pub fn from_config(config: &StationConfig, runtime: Handle) -> Self {
        let device = config.audio.device.clone();
        Self::new(
            config.station.name.as_str(),
            AssetLocator::new(&config.station.asset_dir, &config.station.extension),
            Arc::new(CpalClipDriver::new(device.clone())),
            Arc::new(CpalLineProvider::new(device, config.audio.tone_buffer_frames)),
            runtime,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Play song `song_id`, replacing any clip already loaded
    pub fn play_bird_song(&self, song_id: i32) {
        self.playback.play_bird_song(song_id);
    }

    /// Replace the running tone with one derived from `pattern`
    pub fn change_sound_pattern(&self, pattern: Option<&str>) {
        self.tone.change_sound_pattern(pattern);
    }

    pub fn pause_audio(&self) {
        self.playback.pause_audio();
    }

    pub fn resume_audio(&self) {
        self.playback.resume_audio();
    }

    /// Current clip state
    pub fn playback_status(&self) -> PlaybackStatus {
        self.playback.status()
    }

    /// Check if a tone session is running
    pub fn tone_active(&self) -> bool {
        self.tone.is_active()
    }

    /// Wait for the tone session in flight to end on its own
    pub async fn settle(&self) {
        self.tone.settle().await;
    }

    /// Release the clip, cancel the tone, and wait for the tone's line
    pub async fn shutdown(&self) {
        info!(station = %self.name, "shutting down");
        self.playback.stop();
        self.tone.shutdown().await;
    }
}
