//! Perch - a remotely controlled bird song station

use anyhow::{bail, Result};
use clap::Parser;
use perch::config;
use perch::engine::output::{default_device_name, list_output_devices};
use perch::engine::WavLineProvider;
use perch::server::{self, client, Command};
use perch::station::{Station, ToneSynthesizer};
use perch::synth::{frequency_hz, tone::is_blank};
use std::sync::Arc;

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config: config_path, bind } => {
            println!("Loading configuration from {:?}...", config_path);
            let cfg = config::load_config(&config_path)?;
            let addr = bind.unwrap_or_else(|| cfg.server.bind.clone());

            println!("Starting station '{}'...", cfg.station.name);
            println!("  Assets: {:?} (*.{})", cfg.station.asset_dir, cfg.station.extension);
            println!(
                "  Output: {}",
                cfg.audio
                    .device
                    .clone()
                    .or_else(default_device_name)
                    .unwrap_or_else(|| "none".to_string())
            );
            println!("  Listening on {} (Ctrl-C to stop)", addr);

            let rt = tokio::runtime::Runtime::new()?;
            let station = Arc::new(Station::from_config(&cfg, rt.handle().clone()));
            rt.block_on(server::serve(station, &addr))?;
        }

        Commands::Play { id, addr } => {
            send(&addr, Command::PlayBirdSong { song_id: id })?;
        }

        Commands::Pattern { text, addr } => {
            send(&addr, Command::ChangeSoundPattern { pattern: text })?;
        }

        Commands::Pause { addr } => {
            send(&addr, Command::PauseAudio)?;
        }

        Commands::Resume { addr } => {
            send(&addr, Command::ResumeAudio)?;
        }

        Commands::Render { text, output } => {
            if is_blank(Some(text.as_str())) {
                bail!("pattern is empty; nothing to render");
            }

            println!("Rendering '{}' at {} Hz to {:?}...", text, frequency_hz(&text), output);

            if output.exists() {
                std::fs::remove_file(&output)?;
            }

            let rt = tokio::runtime::Runtime::new()?;
            let provider = Arc::new(WavLineProvider::new(&output));
            let tone = ToneSynthesizer::new("render", provider, rt.handle().clone());
            tone.change_sound_pattern(Some(text.as_str()));
            rt.block_on(tone.settle());

            let reader = match hound::WavReader::open(&output) {
                Ok(reader) => reader,
                Err(e) => bail!(
                    "{:?} is not a complete recording ({}); see the log for the cause",
                    output,
                    e
                ),
            };
            let seconds = reader.duration() as f64 / reader.spec().sample_rate as f64;
            println!("Rendered {:.1}s to {:?}", seconds, output);
        }

        Commands::Devices => {
            println!("Available audio devices:\n");

            match default_device_name() {
                Some(name) => println!("Default output: {}\n", name),
                None => println!("Default output: none\n"),
            }

            println!("Output devices:");
            let devices = list_output_devices();
            if devices.is_empty() {
                println!("  (none found)");
            }
            for (name, config) in devices {
                println!(
                    "  - {} ({} Hz, {} ch)",
                    name, config.sample_rate.0, config.channels
                );
            }
        }

        Commands::Check { config: config_path } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    println!("Configuration is valid!");
                    println!("  Station: {}", cfg.station.name);
                    println!("  Asset dir: {:?}", cfg.station.asset_dir);
                    println!("  Extension: {}", cfg.station.extension);
                    println!("  Bind: {}", cfg.server.bind);
                    println!(
                        "  Device: {}",
                        cfg.audio.device.as_deref().unwrap_or("(default)")
                    );
                    println!("  Tone buffer: {} frames", cfg.audio.tone_buffer_frames);
                    if !cfg.station.asset_dir.is_dir() {
                        println!("  Warning: asset dir does not exist yet");
                    }
                }
                Err(e) => {
                    println!("Configuration is invalid: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Init => {
            let example_config = include_str!("../station.example.yaml");

            let path = "perch.yaml";
            if std::path::Path::new(path).exists() {
                println!("perch.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, example_config)?;
                println!("Created perch.yaml with example configuration.");
            }
        }
    }

    Ok(())
}

/// Send one command to a station and report its reply
fn send(addr: &str, command: Command) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let reply = rt.block_on(client::send(addr, &command))?;

    if reply.ok {
        println!("ok");
        Ok(())
    } else {
        bail!("station rejected the request: {}", reply.error.unwrap_or_default())
    }
}
