//! Wire format: one JSON object per line in each direction

use serde::{Deserialize, Serialize};

use crate::station::Station;

/// A request to the station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    PlayBirdSong {
        song_id: i32,
    },
    ChangeSoundPattern {
        #[serde(default)]
        pattern: Option<String>,
    },
    PauseAudio,
    ResumeAudio,
}

impl Command {
    /// Run the command against a station
    ///
    /// Blocks while a clip is opened; call from a blocking context.
    pub fn apply(&self, station: &Station) {
        match self {
            Command::PlayBirdSong { song_id } => station.play_bird_song(*song_id),
            Command::ChangeSoundPattern { pattern } => {
                station.change_sound_pattern(pattern.as_deref())
            }
            Command::PauseAudio => station.pause_audio(),
            Command::ResumeAudio => station.resume_audio(),
        }
    }
}

/// The station's answer to one request line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    pub fn ok() -> Self {
        Self { ok: true, error: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
        }
    }
}
