//! CLI interface for Perch

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Remotely controlled bird song station
#[derive(Parser)]
#[command(name = "perch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the station and listen for remote commands
    Serve {
        /// Configuration file path
        #[arg(short, long, default_value = "perch.yaml")]
        config: PathBuf,

        /// Override the listen address from the configuration
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Ask a station to play a bird song
    Play {
        /// Song number (plays bird<ID>.<ext>)
        #[arg(allow_negative_numbers = true)]
        id: i32,

        /// Station address
        #[arg(short, long, default_value = "127.0.0.1:7878")]
        addr: String,
    },

    /// Ask a station to sing the tone for a pattern (empty stops the tone)
    Pattern {
        /// Any text; its characters pick the pitch
        text: Option<String>,

        /// Station address
        #[arg(short, long, default_value = "127.0.0.1:7878")]
        addr: String,
    },

    /// Pause the station's bird song
    Pause {
        /// Station address
        #[arg(short, long, default_value = "127.0.0.1:7878")]
        addr: String,
    },

    /// Resume the station's bird song
    Resume {
        /// Station address
        #[arg(short, long, default_value = "127.0.0.1:7878")]
        addr: String,
    },

    /// Render a pattern's tone to a WAV file
    Render {
        /// Pattern text
        text: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List available audio devices
    Devices,

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "perch.yaml")]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init,
}
