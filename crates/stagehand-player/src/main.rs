//! Stagehand Player - headless live multitrack setlist player
//!
//! This is the main entry point. It:
//! 1. Starts the audio output and restores the saved session
//! 2. Decodes song folders on a background loader thread
//! 3. Reads operator commands from stdin and drives the transport at 60 Hz
//!
//! ## Usage
//!
//! `stagehand-player [--config PATH] [SONG_DIR ...]`

mod app;
mod commands;
mod config;

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam::channel::{self, RecvTimeoutError};
use stagehand_core::audio::start_audio_system;
use stagehand_core::config::{load_config, save_config};
use stagehand_core::loader::{SongLoadRequest, SongLoader};
use stagehand_core::pad::PadBank;
use stagehand_core::session::SessionStore;
use stagehand_core::transport::PlaybackController;

use app::{Outcome, Player};
use config::PlayerConfig;

/// Transport tick (timers, end-of-song detection)
const TICK_INTERVAL: Duration = Duration::from_micros(16_667);

/// Headless live multitrack setlist player
#[derive(Parser, Debug)]
#[command(name = "stagehand-player")]
#[command(version)]
struct Args {
    /// Settings file (defaults to player.yaml in the config folder)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Song folders to load, in setlist order
    songs: Vec<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    log::info!("stagehand-player starting up");

    let config_path = args.config.unwrap_or_else(config::default_path);
    let config: PlayerConfig = load_config(&config_path);

    let audio = start_audio_system(&config.audio).context("Could not start audio output")?;
    println!(
        "Audio running at {} Hz, {} frames (~{:.1}ms)",
        audio.sample_rate, audio.buffer_size, audio.latency_ms
    );
    let handle = audio.handle;
    let sample_rate = audio.sample_rate;

    let controller = PlaybackController::new(audio.command_sender, Arc::new(audio.clock), config.transport.sanitized())
        .with_auto_pan(config.auto_pan)
        .with_output_device(config.audio.device.clone());
    let pads = PadBank::new(audio.pad_sender, config.pad_volume);

    let store = match SessionStore::open(config.session_dir()) {
        Ok(store) => Some(store),
        Err(e) => {
            log::error!("Session folder unavailable, nothing will be saved: {:#}", e);
            None
        }
    };

    let mut player = Player::new(controller, pads, store, config, sample_rate);
    match player.restore_session() {
        Ok(Some(report)) if !report.dropped_songs.is_empty() => {
            println!("Dropped from the saved setlist: {}", report.dropped_songs.join(", "));
        }
        Ok(_) => {}
        Err(e) => log::error!("Could not restore the saved session: {:#}", e),
    }
    let pad_count = player.load_custom_pads();
    if pad_count > 0 {
        log::info!("{} custom pads loaded", pad_count);
    }

    let loader = SongLoader::spawn(sample_rate).context("Could not start the song loader")?;
    for dir in args.songs {
        queue_load(&loader, dir);
    }

    // Stdin on its own thread so the tick loop never blocks on input
    let (line_tx, line_rx) = channel::unbounded::<String>();
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("Could not start the input thread")?;

    println!("{}", player.describe_setlist());
    println!("Type 'help' for commands");

    loop {
        match line_rx.recv_timeout(TICK_INTERVAL) {
            Ok(line) => match commands::parse(&line) {
                Ok(Some(command)) => match player.apply(command) {
                    Ok(Outcome::Silent) => {}
                    Ok(Outcome::Reply(text)) => println!("{}", text),
                    Ok(Outcome::Load(dir)) => queue_load(&loader, dir),
                    Ok(Outcome::Quit) => break,
                    Err(e) => println!("error: {:#}", e),
                },
                Ok(None) => {}
                Err(e) => println!("error: {}", e),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                log::info!("Input closed");
                break;
            }
        }

        handle.service();
        if let Some(message) = player.tick() {
            println!("{}", message);
        }
        while let Some(loaded) = loader.try_recv() {
            println!("{}", player.song_loaded(loaded));
        }
        player.persist();
        if let Some(config) = player.take_dirty_config() {
            if let Err(e) = save_config(config, &config_path) {
                log::warn!("Failed to save settings: {:#}", e);
            }
        }
    }

    player.persist();
    log::info!("stagehand-player shutting down");
    Ok(())
}

fn queue_load(loader: &SongLoader, dir: PathBuf) {
    let request = SongLoadRequest::Directory(dir);
    println!("Loading {}...", request.label());
    if let Err(e) = loader.load(request) {
        log::error!("{}", e);
    }
}
