//! Headless player state
//!
//! Glue between operator commands and the core: the transport controller,
//! the pad bank and the on-disk session. Generic over the graph sink so the
//! whole command surface runs against an offline `RenderGraph` in tests.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use stagehand_core::audio::available_output_devices;
use stagehand_core::engine::GraphSink;
use stagehand_core::loader::{channel_name, decode_file, SongLoadResult};
use stagehand_core::pad::PadBank;
use stagehand_core::session::SessionStore;
use stagehand_core::transport::{PlaybackController, RestoreReport, TransportEvent, TransportState};
use stagehand_core::{ChannelId, SongId};

use crate::commands::{Command, HELP};
use crate::config::PlayerConfig;

/// What the main loop should do after a command
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Silent,
    Reply(String),
    /// Hand the folder to the background loader
    Load(PathBuf),
    Quit,
}

pub struct Player<G: GraphSink> {
    controller: PlaybackController<G>,
    pads: PadBank<G>,
    store: Option<SessionStore>,
    config: PlayerConfig,
    config_dirty: bool,
    /// Rate stems and pads are decoded to
    sample_rate: u32,
}

impl<G: GraphSink> Player<G> {
    pub fn new(
        controller: PlaybackController<G>,
        pads: PadBank<G>,
        store: Option<SessionStore>,
        config: PlayerConfig,
        sample_rate: u32,
    ) -> Self {
        Self {
            controller,
            pads,
            store,
            config,
            config_dirty: false,
            sample_rate,
        }
    }

    pub fn controller(&self) -> &PlaybackController<G> {
        &self.controller
    }

    pub fn pads(&self) -> &PadBank<G> {
        &self.pads
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────────────

    /// Rebuild the setlist saved in the session folder
    pub fn restore_session(&mut self) -> Result<Option<RestoreReport>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let Some(snapshot) = store.load_snapshot()? else {
            return Ok(None);
        };
        let mut audio = store.load_audio(&snapshot, self.sample_rate);
        let report = self.controller.restore(&snapshot, |channel| audio.remove(&channel.id));
        Ok(Some(report))
    }

    /// Decode the custom pads stored in the session; returns how many loaded
    pub fn load_custom_pads(&mut self) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };
        let pads = match store.custom_pads() {
            Ok(pads) => pads,
            Err(e) => {
                log::warn!("Failed to read custom pads: {:#}", e);
                return 0;
            }
        };

        let mut loaded = 0;
        for pad in pads {
            match decode_file(&pad.path, self.sample_rate) {
                Ok(buffer) => {
                    self.pads.set_custom_pad(pad.note, pad.name, buffer);
                    loaded += 1;
                }
                Err(e) => log::warn!("Custom pad {} unusable: {}", pad.note, e),
            }
        }
        loaded
    }

    /// Add a finished background load to the setlist
    pub fn song_loaded(&mut self, loaded: SongLoadResult) -> String {
        let load = match loaded.result {
            Ok(load) => load,
            Err(e) => return format!("Could not load {}: {}", loaded.label, e),
        };
        let sources = load.sources();
        let report = match self.controller.load_song(load) {
            Ok(report) => report,
            Err(e) => return format!("Could not load {}: {}", loaded.label, e),
        };

        if let Some(store) = &self.store {
            for (channel, path) in &sources {
                if let Err(e) = store.import_audio(*channel, path) {
                    log::warn!("Channel audio not stored, it will be missing next session: {:#}", e);
                }
            }
        }

        let name = self.controller.song(report.index).map(|s| s.name().to_string()).unwrap_or_default();
        let mut message = format!("Loaded '{}' as song {} ({} channels)", name, report.index + 1, report.loaded);
        if !report.failed.is_empty() {
            message.push_str(&format!(", {} failed to decode", report.failed.len()));
        }
        message
    }

    /// Write the snapshot if anything changed since the last save
    pub fn persist(&mut self) {
        let Some(snapshot) = self.controller.take_dirty_snapshot() else {
            return;
        };
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save_snapshot(&snapshot) {
            log::error!("Failed to save session: {:#}", e);
            return;
        }
        match store.prune_audio(&snapshot) {
            Ok(0) => {}
            Ok(n) => log::debug!("Pruned {} unused stems", n),
            Err(e) => log::warn!("Failed to prune session audio: {:#}", e),
        }
    }

    /// Settings changed by commands, once
    pub fn take_dirty_config(&mut self) -> Option<&PlayerConfig> {
        if !self.config_dirty {
            return None;
        }
        self.config_dirty = false;
        Some(&self.config)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────

    pub fn tick(&mut self) -> Option<String> {
        let event = self.controller.tick()?;
        Some(self.describe_event(event))
    }

    pub fn apply(&mut self, command: Command) -> Result<Outcome> {
        match command {
            Command::Play => self.controller.play(),
            Command::Pause => self.controller.pause(),
            Command::Toggle => self.controller.toggle_play(),
            Command::Next => self.controller.next(),
            Command::Prev => self.controller.prev(),
            Command::Back => self.controller.previous_song(),
            Command::Jump(index) => {
                self.song_id(index)?;
                self.controller.jump_to_song(index);
            }
            Command::Restart => self.controller.seek_to_start(),

            Command::Mute(channel) => {
                let id = self.channel_id(channel)?;
                self.controller.toggle_mute(id);
            }
            Command::Solo(channel) => {
                let id = self.channel_id(channel)?;
                self.controller.toggle_solo(id);
            }
            Command::Volume { channel, volume } => {
                let id = self.channel_id(channel)?;
                self.controller.set_volume(id, volume);
            }
            Command::Bus { channel, bus } => {
                let id = self.channel_id(channel)?;
                self.controller.set_bus(id, bus);
            }
            Command::Master(volume) => self.controller.set_master_volume(volume),
            Command::AutoPan(enabled) => {
                self.controller.set_auto_pan(enabled);
                self.config.auto_pan = enabled;
                self.config_dirty = true;
            }

            Command::Pad(note) => {
                return Ok(match self.pads.play(note) {
                    Some(note) => Outcome::Reply(format!("Pad {} on", note)),
                    None => Outcome::Reply("Pad off".to_string()),
                });
            }
            Command::PadStop => self.pads.stop(),
            Command::PadVolume(volume) => {
                self.pads.set_volume(volume);
                self.config.pad_volume = self.pads.volume();
                self.config_dirty = true;
            }
            Command::PadSet { note, path } => {
                let buffer = decode_file(&path, self.sample_rate)?;
                let name = channel_name(&path);
                if let Some(store) = &self.store {
                    store.save_custom_pad(note, &name, &path)?;
                }
                self.pads.set_custom_pad(note, name.clone(), buffer);
                return Ok(Outcome::Reply(format!("Pad {} uses '{}'", note, name)));
            }
            Command::PadClear(note) => {
                self.pads.remove_custom_pad(note);
                if let Some(store) = &self.store {
                    store.remove_custom_pad(note)?;
                }
            }

            Command::Rename { song, name } => {
                let id = self.song_id(song)?;
                if !self.controller.rename_song(id, &name) {
                    bail!("song name cannot be empty");
                }
            }
            Command::Cover { song, image } => {
                let id = self.song_id(song)?;
                self.controller.set_cover_image(id, image);
            }
            Command::Move { from, to } => {
                if !self.controller.move_song(from, to) {
                    bail!("no such song position");
                }
            }
            Command::Remove(song) => {
                let id = self.song_id(song)?;
                self.controller.remove_song(id);
            }
            Command::Clear => {
                self.controller.clear_session();
                if let Some(store) = &self.store {
                    store.clear()?;
                }
            }
            Command::Load(dir) => return Ok(Outcome::Load(dir)),

            Command::List => return Ok(Outcome::Reply(self.describe_setlist())),
            Command::Status => return Ok(Outcome::Reply(self.describe_status())),
            Command::Devices => {
                let lines: Vec<String> = available_output_devices()
                    .iter()
                    .enumerate()
                    .map(|(i, device)| format!("{:>3}. {}", i + 1, device))
                    .collect();
                return Ok(Outcome::Reply(lines.join("\n")));
            }
            Command::Device(choice) => {
                let device = match choice {
                    Some(index) => Some(
                        available_output_devices()
                            .into_iter()
                            .nth(index)
                            .map(|d| d.id)
                            .ok_or_else(|| anyhow!("no device {}", index + 1))?,
                    ),
                    None => None,
                };
                if self.controller.set_output_device(device.clone()) {
                    self.config.audio.device = device;
                    self.config_dirty = true;
                    return Ok(Outcome::Reply("Output device saved, restart to use it".to_string()));
                }
            }
            Command::Help => return Ok(Outcome::Reply(HELP.to_string())),
            Command::Quit => return Ok(Outcome::Quit),
        }
        Ok(Outcome::Silent)
    }

    fn song_id(&self, index: usize) -> Result<SongId> {
        self.controller
            .song(index)
            .map(|s| s.id())
            .with_context(|| format!("no song {}", index + 1))
    }

    /// Channel of the active song by position
    fn channel_id(&self, index: usize) -> Result<ChannelId> {
        let song = self.controller.active_song().context("setlist is empty")?;
        song.channels()
            .get(index)
            .map(|c| c.id())
            .with_context(|| format!("'{}' has no channel {}", song.name(), index + 1))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Display
    // ─────────────────────────────────────────────────────────────────────

    fn song_label(&self, index: usize) -> String {
        match self.controller.song(index) {
            Some(song) => format!("{}. {}", index + 1, song.name()),
            None => format!("{}.", index + 1),
        }
    }

    fn describe_event(&self, event: TransportEvent) -> String {
        match event {
            TransportEvent::SongEnded { index, auto_advance: true } => format!(
                "{} ended, next song in {:.0}s",
                self.song_label(index),
                self.controller.config().auto_advance_grace_secs
            ),
            TransportEvent::SongEnded { index, auto_advance: false } => {
                format!("{} ended", self.song_label(index))
            }
            TransportEvent::AutoAdvanced { to } | TransportEvent::Transitioned { to } => {
                format!("Now playing {}", self.song_label(to))
            }
        }
    }

    pub fn describe_status(&self) -> String {
        let status = self.controller.status();
        let state = match status.state {
            TransportState::Idle => return "Setlist is empty".to_string(),
            TransportState::Stopped { index } => format!("Stopped   {}", self.song_label(index)),
            TransportState::Playing { index } => format!("Playing   {}", self.song_label(index)),
            TransportState::PendingAutoAdvance { index } => format!("Ended     {}", self.song_label(index)),
            TransportState::Transitioning { from, to } => {
                format!("Fading    {} -> {}", self.song_label(from), self.song_label(to))
            }
        };
        let mut line = format!(
            "{}  {} / {}  master {:.0}%",
            state,
            clock(status.elapsed),
            clock(status.duration),
            status.master_volume * 100.0
        );
        if let Some(note) = self.pads.active_note() {
            line.push_str(&format!("  pad {}", note));
        }
        line
    }

    pub fn describe_setlist(&self) -> String {
        if self.controller.songs().is_empty() {
            return "Setlist is empty".to_string();
        }
        let active = self.controller.active_index();
        let mut lines = Vec::new();
        for (i, song) in self.controller.songs().iter().enumerate() {
            let marker = if active == Some(i) { '>' } else { ' ' };
            lines.push(format!(
                "{} {:>2}. {}  [{}]  {} ch",
                marker,
                i + 1,
                song.name(),
                clock(song.duration()),
                song.channels().len()
            ));
            if active != Some(i) {
                continue;
            }
            for (j, channel) in song.channels().iter().enumerate() {
                let mix = channel.mix();
                lines.push(format!(
                    "       {:>2}. {:<16} vol {:.2}  bus {:<3}{}{}",
                    j + 1,
                    channel.name(),
                    mix.volume,
                    mix.bus.label(),
                    if mix.muted { "  MUTE" } else { "" },
                    if mix.soloed { "  SOLO" } else { "" }
                ));
            }
        }
        lines.join("\n")
    }
}

/// `m:ss`
fn clock(seconds: f64) -> String {
    let total = if seconds.is_finite() { seconds.max(0.0) as u64 } else { 0 };
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use stagehand_core::config::TransportConfig;
    use stagehand_core::engine::{ManualClock, RenderGraph};
    use stagehand_core::loader::load_song_dir;
    use stagehand_core::mix::Bus;
    use stagehand_core::pad::PadNote;
    use stagehand_core::transport::SongLoad;
    use stagehand_core::types::{ChannelBuffer, StereoBuffer};

    use crate::commands::parse;

    const SR: u32 = 8000;

    fn player(store: Option<SessionStore>) -> (Player<RenderGraph>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let controller = PlaybackController::new(RenderGraph::new(SR), clock.clone(), TransportConfig::default());
        let pads = PadBank::new(RenderGraph::new(SR), 0.4);
        (Player::new(controller, pads, store, PlayerConfig::default(), SR), clock)
    }

    fn run(player: &mut Player<RenderGraph>, line: &str) -> Outcome {
        let command = parse(line).unwrap().unwrap();
        player.apply(command).unwrap()
    }

    fn song(name: &str, channels: &[&str]) -> SongLoad {
        channels.iter().fold(SongLoad::new(name), |load, channel| {
            load.with_channel(*channel, ChannelBuffer::new(StereoBuffer::silence(SR as usize * 10), SR))
        })
    }

    fn add(player: &mut Player<RenderGraph>, load: SongLoad) {
        let message = player.song_loaded(SongLoadResult {
            label: load.name.clone(),
            result: Ok(load),
        });
        assert!(message.starts_with("Loaded"), "{}", message);
    }

    fn write_wav(path: &Path, frames: usize) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: SR,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let v = ((i % 100) as i16 - 50) * 200;
            writer.write_sample(v).unwrap();
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_mix_commands_target_active_song() {
        let (mut p, _clock) = player(None);
        add(&mut p, song("Opener", &["Drums", "Click"]));
        add(&mut p, song("Closer", &["Keys"]));

        run(&mut p, "mute 1");
        run(&mut p, "vol 2 0.5");
        run(&mut p, "bus 1 r");

        let opener = p.controller().song(0).unwrap();
        assert!(opener.channels()[0].mix().muted);
        assert_eq!(opener.channels()[1].mix().volume, 0.5);
        assert_eq!(opener.channels()[0].mix().bus, Bus::Right);
        assert!(!p.controller().song(1).unwrap().channels()[0].mix().muted);

        let err = p.apply(parse("solo 3").unwrap().unwrap()).unwrap_err();
        assert!(err.to_string().contains("no channel 3"));
    }

    #[test]
    fn test_transport_commands() {
        let (mut p, clock) = player(None);
        add(&mut p, song("A", &["Drums"]));
        add(&mut p, song("B", &["Drums"]));

        run(&mut p, "play");
        assert!(p.controller().is_playing());
        assert!(p.describe_status().starts_with("Playing   1. A"));

        run(&mut p, "next");
        assert!(matches!(p.controller().state(), TransportState::Transitioning { from: 0, to: 1 }));

        clock.advance(2.0);
        assert_eq!(p.tick().as_deref(), Some("Now playing 2. B"));
        assert_eq!(p.controller().active_index(), Some(1));

        run(&mut p, "toggle");
        assert!(!p.controller().is_playing());
        assert!(p.apply(parse("jump 9").unwrap().unwrap()).is_err());
        run(&mut p, "jump 1");
        assert_eq!(p.controller().active_index(), Some(0));
    }

    #[test]
    fn test_setlist_editing_commands() {
        let (mut p, _clock) = player(None);
        add(&mut p, song("A", &["Drums"]));
        add(&mut p, song("B", &["Drums"]));

        run(&mut p, "rename 2 Encore");
        run(&mut p, "move 2 1");
        let names: Vec<&str> = p.controller().songs().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Encore", "A"]);
        assert!(p.apply(parse("move 1 5").unwrap().unwrap()).is_err());

        run(&mut p, "remove 1");
        assert_eq!(p.controller().songs().len(), 1);
        assert!(p.describe_setlist().starts_with(">  1. A"));

        run(&mut p, "clear");
        assert_eq!(p.describe_status(), "Setlist is empty");
    }

    #[test]
    fn test_settings_commands_mark_config_dirty() {
        let (mut p, _clock) = player(None);
        assert!(p.take_dirty_config().is_none());

        run(&mut p, "autopan off");
        run(&mut p, "padvol 2.0");
        let config = p.take_dirty_config().unwrap();
        assert!(!config.auto_pan);
        assert_eq!(config.pad_volume, 1.0);
        assert!(p.take_dirty_config().is_none());
    }

    #[test]
    fn test_pad_toggle_replies() {
        let (mut p, _clock) = player(None);
        assert_eq!(run(&mut p, "pad A"), Outcome::Reply("Pad A on".to_string()));
        assert_eq!(p.pads().active_note(), Some(PadNote::A));
        assert_eq!(run(&mut p, "pad a"), Outcome::Reply("Pad off".to_string()));
        assert_eq!(run(&mut p, "quit"), Outcome::Quit);
        assert_eq!(run(&mut p, "load /tmp/x"), Outcome::Load(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn test_session_survives_restart() {
        let songs = tempfile::tempdir().unwrap();
        let dir = songs.path().join("Opener");
        std::fs::create_dir(&dir).unwrap();
        write_wav(&dir.join("Drums.wav"), 4000);
        write_wav(&dir.join("Click.wav"), 4000);

        let session = tempfile::tempdir().unwrap();
        let (mut first, _clock) = player(Some(SessionStore::open(session.path()).unwrap()));
        first.song_loaded(SongLoadResult {
            label: "Opener".to_string(),
            result: load_song_dir(&dir, SR),
        });
        run(&mut first, "mute 1");
        first.persist();
        drop(first);

        // The originals can go away, the session has its own copies
        std::fs::remove_dir_all(&dir).unwrap();

        let (mut second, _clock) = player(Some(SessionStore::open(session.path()).unwrap()));
        let report = second.restore_session().unwrap().unwrap();
        assert_eq!(report.restored, 1);
        assert!(report.missing_channels.is_empty());

        let song = second.controller().song(0).unwrap();
        assert_eq!(song.name(), "Opener");
        let muted: Vec<bool> = song.channels().iter().map(|c| c.mix().muted).collect();
        assert_eq!(muted.iter().filter(|m| **m).count(), 1);
    }

    #[test]
    fn test_custom_pad_is_stored() {
        let files = tempfile::tempdir().unwrap();
        let pad_file = files.path().join("Warm.wav");
        write_wav(&pad_file, 2000);

        let session = tempfile::tempdir().unwrap();
        let (mut p, _clock) = player(Some(SessionStore::open(session.path()).unwrap()));
        let line = format!("padset D {}", pad_file.display());
        assert_eq!(run(&mut p, &line), Outcome::Reply("Pad D uses 'Warm'".to_string()));

        let (mut reloaded, _clock) = player(Some(SessionStore::open(session.path()).unwrap()));
        assert_eq!(reloaded.load_custom_pads(), 1);
        assert_eq!(reloaded.pads().custom_pad(PadNote::D), Some("Warm"));

        run(&mut reloaded, "padclear D");
        assert_eq!(reloaded.pads().custom_pad(PadNote::D), None);
    }

    #[test]
    fn test_clock_format() {
        assert_eq!(clock(0.0), "0:00");
        assert_eq!(clock(83.9), "1:23");
        assert_eq!(clock(f64::NAN), "0:00");
    }
}
