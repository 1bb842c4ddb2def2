//! Configuration schema definitions

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Main configuration for a station
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StationConfig {
    /// Station identity and asset lookup
    #[serde(default)]
    pub station: StationSettings,

    /// Remote command listener
    #[serde(default)]
    pub server: ServerConfig,

    /// Audio output settings
    #[serde(default)]
    pub audio: AudioConfig,
}

impl StationConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.station.name.trim().is_empty() {
            bail!("Station name must not be empty");
        }
        if self.station.extension.is_empty() || self.station.extension.contains('.') {
            bail!("Asset extension must be non-empty and given without a dot");
        }

        if self.server.bind.parse::<SocketAddr>().is_err() {
            bail!("Server bind address '{}' is not a valid socket address", self.server.bind);
        }

        if self.audio.tone_buffer_frames < 1024 || self.audio.tone_buffer_frames > 65536 {
            bail!("Tone buffer must be between 1024 and 65536 frames");
        }

        Ok(())
    }
}

/// Station identity and asset location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationSettings {
    /// Name used in log output (default: station)
    #[serde(default = "default_name")]
    pub name: String,

    /// Directory holding `bird{id}.{extension}` files (default: audios)
    #[serde(default = "default_asset_dir")]
    pub asset_dir: PathBuf,

    /// Asset file extension without the dot (default: wav)
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_name() -> String { "station".to_string() }
fn default_asset_dir() -> PathBuf { PathBuf::from("audios") }
fn default_extension() -> String { "wav".to_string() }

impl Default for StationSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            asset_dir: default_asset_dir(),
            extension: default_extension(),
        }
    }
}

/// Command listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on (default: 127.0.0.1:7878)
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String { "127.0.0.1:7878".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

/// Audio output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Output device name (None = default device)
    pub device: Option<String>,

    /// Frames buffered between the tone writer and the device (default: 8192)
    #[serde(default = "default_tone_buffer_frames")]
    pub tone_buffer_frames: usize,
}

fn default_tone_buffer_frames() -> usize { 8192 }

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            tone_buffer_frames: default_tone_buffer_frames(),
        }
    }
}
