//! Playback controller - setlist transport and auto-advance
//!
//! Owns every piece of transport and mix state and is the only thing that
//! mutates it. Each public method performs its state change and the matching
//! graph commands together, so the data the UI reads and what the audio
//! thread plays never disagree.
//!
//! ```text
//!            play                natural end (not last)
//!  Stopped ────────▶ Playing ─────────────────────────▶ PendingAutoAdvance
//!     ▲                │ next/prev                          │ grace elapsed
//!     │ pause          ▼                                    ▼
//!     └──────────  Transitioning ── fade done ──▶ Playing(next), master fades in
//! ```
//!
//! Deferred work (auto-advance, completing a fade) lives in a single
//! [`TimerSlot`] polled from [`PlaybackController::tick`]. Any manual action
//! cancels it first.

use std::sync::Arc;

use crate::audio::DeviceId;
use crate::config::TransportConfig;
use crate::engine::{AudioClock, GraphSink, MAX_CHANNEL_NODES};
use crate::mix::{any_soloed, auto_pan_for, clamp_volume, effective_gain, Bus, ChannelMix};
use crate::session::{ChannelSnapshot, SessionSnapshot, SongSnapshot, SNAPSHOT_VERSION};
use crate::types::{ChannelBuffer, ChannelId, SongId};

use super::clock::{sanitize_duration, TransportClock};
use super::error::{EngineError, EngineResult};
use super::playback::SyncPlayback;
use super::setlist::{Channel, LoadReport, Setlist, Song, SongLoad};
use super::timer::TimerSlot;

/// Master level a fade goes down to and comes back up from
pub const FADE_FLOOR: f32 = 0.01;

/// Work scheduled on the audio clock
#[derive(Debug, Clone, Copy, PartialEq)]
enum Deferred {
    /// Advance to the song after the active one
    AutoAdvance,
    /// Master has faded down; swap to `to` and fade back in
    CompleteTransition { to: SongId },
}

/// Where the transport is, derived from the controller's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Empty setlist
    Idle,
    Stopped { index: usize },
    Playing { index: usize },
    /// Song `index` ended; the next one starts when the grace window runs out
    PendingAutoAdvance { index: usize },
    /// Master is fading down before switching from `from` to `to`
    Transitioning { from: usize, to: usize },
}

/// Something `tick` noticed or did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    SongEnded { index: usize, auto_advance: bool },
    AutoAdvanced { to: usize },
    Transitioned { to: usize },
}

/// Read-only summary for displays
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportStatus {
    pub state: TransportState,
    pub elapsed: f64,
    pub duration: f64,
    pub master_volume: f32,
    pub active_song_playable: bool,
}

/// Result of rebuilding a setlist from a snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreReport {
    pub restored: usize,
    /// Names of songs left out because none of their audio was available
    pub dropped_songs: Vec<String>,
    pub missing_channels: Vec<ChannelId>,
}

struct PendingChannel {
    id: ChannelId,
    name: String,
    mix: ChannelMix,
    buffer: ChannelBuffer,
}

pub struct PlaybackController<G: GraphSink> {
    clock: Arc<dyn AudioClock>,
    playback: SyncPlayback<G>,
    config: TransportConfig,
    setlist: Setlist,
    active: usize,
    transport: TransportClock,
    timer: TimerSlot<Deferred>,
    master_volume: f32,
    auto_pan: bool,
    output_device: Option<DeviceId>,
    /// Set by every mutation the session snapshot can see
    dirty: bool,
}

impl<G: GraphSink> PlaybackController<G> {
    pub fn new(graph: G, clock: Arc<dyn AudioClock>, config: TransportConfig) -> Self {
        Self {
            clock,
            playback: SyncPlayback::new(graph),
            config: config.sanitized(),
            setlist: Setlist::default(),
            active: 0,
            transport: TransportClock::new(),
            timer: TimerSlot::new(),
            master_volume: 1.0,
            auto_pan: false,
            output_device: None,
            dirty: false,
        }
    }

    /// Pan channels of songs loaded from now on by name
    pub fn with_auto_pan(mut self, enabled: bool) -> Self {
        self.auto_pan = enabled;
        self
    }

    pub fn with_output_device(mut self, device: Option<DeviceId>) -> Self {
        self.output_device = device;
        self
    }

    // ─────────────────────────────────────────────────────────────────────
    // Views
    // ─────────────────────────────────────────────────────────────────────

    pub fn songs(&self) -> &[Song] {
        self.setlist.songs()
    }

    pub fn song(&self, index: usize) -> Option<&Song> {
        self.setlist.get(index)
    }

    pub fn active_index(&self) -> Option<usize> {
        (!self.setlist.is_empty()).then_some(self.active)
    }

    pub fn active_song(&self) -> Option<&Song> {
        self.setlist.get(self.active)
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    /// Seconds into the active song
    pub fn elapsed(&self) -> f64 {
        self.transport.elapsed(self.clock.now())
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn auto_pan(&self) -> bool {
        self.auto_pan
    }

    pub fn output_device(&self) -> Option<&DeviceId> {
        self.output_device.as_ref()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: TransportConfig) {
        self.config = config.sanitized();
    }

    pub fn graph(&self) -> &G {
        self.playback.graph()
    }

    pub fn graph_mut(&mut self) -> &mut G {
        self.playback.graph_mut()
    }

    pub fn state(&self) -> TransportState {
        if self.setlist.is_empty() {
            return TransportState::Idle;
        }
        let index = self.active;
        match self.timer.pending() {
            Some(Deferred::AutoAdvance) => TransportState::PendingAutoAdvance { index },
            Some(Deferred::CompleteTransition { to }) => match self.setlist.index_of(*to) {
                Some(to) => TransportState::Transitioning { from: index, to },
                None => TransportState::Playing { index },
            },
            None if self.transport.is_playing() => TransportState::Playing { index },
            None => TransportState::Stopped { index },
        }
    }

    pub fn status(&self) -> TransportStatus {
        let duration = self.transport.duration();
        let mut elapsed = self.elapsed();
        if duration > 0.0 {
            elapsed = elapsed.min(duration);
        }
        TransportStatus {
            state: self.state(),
            elapsed,
            duration,
            master_volume: self.master_volume,
            active_song_playable: self.active_song().is_some_and(Song::is_playable),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Loading and session
    // ─────────────────────────────────────────────────────────────────────

    /// Append a decoded song to the setlist
    ///
    /// Channels that failed to decode are left out; the song is rejected only
    /// when nothing is left to play.
    pub fn load_song(&mut self, load: SongLoad) -> EngineResult<LoadReport> {
        let failed: Vec<ChannelId> = load.failed.iter().map(|f| f.id).collect();
        for channel in &load.failed {
            log::warn!("Song '{}': channel '{}' failed to decode: {}", load.name, channel.name, channel.reason);
        }
        if load.channels.is_empty() {
            return Err(EngineError::NoPlayableChannels { song: load.name, failed });
        }

        let auto_pan = self.auto_pan;
        let channels: Vec<PendingChannel> = load
            .channels
            .into_iter()
            .map(|c| PendingChannel {
                mix: ChannelMix::for_channel(&c.name, auto_pan),
                id: c.id,
                name: c.name,
                buffer: c.buffer,
            })
            .collect();
        let loaded = channels.len();

        let index = self.insert_song(load.id, load.name, load.cover_image, None, channels)?;
        log::info!("Loaded song {} ({} channels, {} failed)", index + 1, loaded, failed.len());

        Ok(LoadReport { song: load.id, index, loaded, failed })
    }

    /// Replace the setlist with the one described by `snapshot`
    ///
    /// `audio_for` supplies the decoded audio of each channel. Channels
    /// without audio are dropped; songs left without channels are dropped.
    pub fn restore<F>(&mut self, snapshot: &SessionSnapshot, mut audio_for: F) -> RestoreReport
    where
        F: FnMut(&ChannelSnapshot) -> Option<ChannelBuffer>,
    {
        self.clear_session();
        let mut report = RestoreReport::default();

        for song in &snapshot.songs {
            let mut channels = Vec::with_capacity(song.channels.len());
            for channel in &song.channels {
                match audio_for(channel) {
                    Some(buffer) => channels.push(PendingChannel {
                        id: channel.id,
                        name: channel.name.clone(),
                        mix: channel.mix.sanitized(),
                        buffer,
                    }),
                    None => {
                        log::warn!("Song '{}': no audio for channel '{}', dropping it", song.name, channel.name);
                        report.missing_channels.push(channel.id);
                    }
                }
            }

            if channels.is_empty() {
                log::warn!("Song '{}' has no playable channels, dropping it", song.name);
                report.dropped_songs.push(song.name.clone());
                continue;
            }

            let inserted = self.insert_song(
                song.id,
                song.name.clone(),
                song.cover_image.clone(),
                Some(song.duration),
                channels,
            );
            match inserted {
                Ok(_) => report.restored += 1,
                Err(e) => {
                    log::warn!("Song '{}' not restored: {}", song.name, e);
                    report.dropped_songs.push(song.name.clone());
                }
            }
        }

        self.dirty = !report.dropped_songs.is_empty() || !report.missing_channels.is_empty();
        log::info!(
            "Restored {} songs ({} dropped, {} channels missing)",
            report.restored,
            report.dropped_songs.len(),
            report.missing_channels.len()
        );
        report
    }

    fn insert_song(
        &mut self,
        id: SongId,
        name: String,
        cover_image: Option<String>,
        duration: Option<f64>,
        channels: Vec<PendingChannel>,
    ) -> EngineResult<usize> {
        if self.playback.free_capacity() < channels.len() {
            return Err(EngineError::GraphFull { capacity: MAX_CHANNEL_NODES });
        }

        let has_solo = any_soloed(channels.iter().map(|c| &c.mix));
        // A saved duration that isn't positive would never reach the end
        let duration = duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or_else(|| channels.iter().map(|c| c.buffer.duration_secs()).fold(0.0, f64::max));

        let mut built = Vec::with_capacity(channels.len());
        for pending in channels {
            let channel_duration = pending.buffer.duration_secs();
            let gain = effective_gain(&pending.mix, has_solo);
            let Some(node) = self.playback.create_node(pending.buffer, gain, pending.mix.pan) else {
                return Err(EngineError::GraphFull { capacity: MAX_CHANNEL_NODES });
            };
            built.push(Channel {
                id: pending.id,
                name: pending.name,
                mix: pending.mix,
                node,
                duration: channel_duration,
            });
        }

        self.setlist.push(Song {
            id,
            name,
            cover_image,
            duration: sanitize_duration(duration),
            channels: built,
        });
        let index = self.setlist.len() - 1;
        if index == 0 {
            self.select(0);
        }
        self.dirty = true;
        Ok(index)
    }

    /// Serializable form of the setlist (no audio)
    pub fn snapshot(&self) -> SessionSnapshot {
        let songs = self
            .setlist
            .songs()
            .iter()
            .map(|song| SongSnapshot {
                id: song.id,
                name: song.name.clone(),
                cover_image: song.cover_image.clone(),
                duration: song.duration,
                channels: song
                    .channels
                    .iter()
                    .map(|c| ChannelSnapshot {
                        id: c.id,
                        name: c.name.clone(),
                        mix: c.mix,
                    })
                    .collect(),
            })
            .collect();
        SessionSnapshot {
            version: SNAPSHOT_VERSION,
            songs,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Snapshot if anything changed since the last call
    pub fn take_dirty_snapshot(&mut self) -> Option<SessionSnapshot> {
        if !std::mem::take(&mut self.dirty) {
            return None;
        }
        Some(self.snapshot())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────────────

    /// Start playing the active song from the current position
    ///
    /// A song that already reached its end starts over. Already playing:
    /// only cancels pending deferred work.
    pub fn play(&mut self) {
        if !self.active_song().is_some_and(Song::is_playable) {
            return;
        }
        self.cancel_deferred();
        if self.transport.is_playing() {
            return;
        }

        let now = self.clock.now();
        let duration = self.transport.duration();
        if duration > 0.0 && self.transport.elapsed(now) >= duration {
            self.transport.seek_to_start(now);
        }
        if self.start_segment() {
            log::info!("Play song {} at {:.2}s", self.active + 1, self.transport.elapsed(now));
        }
    }

    pub fn pause(&mut self) {
        self.cancel_deferred();
        if !self.transport.is_playing() {
            return;
        }
        self.playback.stop_all();
        self.transport.pause(self.clock.now());
        log::info!("Paused song {} at {:.2}s", self.active + 1, self.elapsed());
    }

    pub fn toggle_play(&mut self) {
        if self.transport.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Back to the top of the active song, still playing if it was
    pub fn seek_to_start(&mut self) {
        self.cancel_deferred();
        self.restart_current();
    }

    /// Select song `index` directly, keeping the play state
    pub fn jump_to_song(&mut self, index: usize) {
        if index >= self.setlist.len() || index == self.active {
            return;
        }
        let was_playing = self.transport.is_playing() || self.pending_transition().is_some();
        self.cancel_deferred();
        self.swap_to(index, was_playing, false);
    }

    /// Next song; fades across when playing, otherwise starts it right away
    ///
    /// No-op on the last song. A press during the auto-advance grace window
    /// skips the wait.
    pub fn next(&mut self) {
        let target = self.active + 1;
        if target >= self.setlist.len() {
            return;
        }
        self.transition_to(target, true);
    }

    /// Restart the current song, or go to the previous one near its start
    pub fn prev(&mut self) {
        if self.setlist.is_empty() {
            return;
        }
        let elapsed = self.elapsed();
        if self.active == 0 || elapsed > self.config.prev_restart_threshold_secs {
            self.cancel_deferred();
            self.restart_current();
        } else {
            self.transition_to(self.active - 1, false);
        }
    }

    /// Go to the previous song regardless of position
    pub fn previous_song(&mut self) {
        if self.active == 0 {
            self.prev();
        } else {
            self.transition_to(self.active - 1, false);
        }
    }

    /// Drive timers and end-of-song detection; call at ~60 Hz
    pub fn tick(&mut self) -> Option<TransportEvent> {
        let now = self.clock.now();
        if let Some(action) = self.timer.poll(now) {
            return self.run_deferred(action);
        }
        if self.transport.reached_end(now) {
            return Some(self.finish_song(now));
        }
        None
    }

    fn finish_song(&mut self, now: f64) -> TransportEvent {
        self.playback.stop_all();
        self.transport.finish();
        let index = self.active;

        // A fade already in flight decides where we go next
        let auto_advance = self.pending_transition().is_none() && index + 1 < self.setlist.len();
        if auto_advance {
            self.timer.arm(Deferred::AutoAdvance, now + self.config.auto_advance_grace_secs);
        }
        log::info!("Song {} ended{}", index + 1, if auto_advance { ", advancing after grace" } else { "" });
        TransportEvent::SongEnded { index, auto_advance }
    }

    fn run_deferred(&mut self, action: Deferred) -> Option<TransportEvent> {
        match action {
            Deferred::AutoAdvance => {
                let to = self.active + 1;
                if to >= self.setlist.len() {
                    return None;
                }
                self.swap_to(to, true, true);
                Some(TransportEvent::AutoAdvanced { to })
            }
            Deferred::CompleteTransition { to } => match self.setlist.index_of(to) {
                Some(index) => {
                    self.swap_to(index, true, true);
                    Some(TransportEvent::Transitioned { to: index })
                }
                None => {
                    self.playback.ramp_master(self.master_volume, self.config.ramp_time_constant);
                    None
                }
            },
        }
    }

    fn pending_transition(&self) -> Option<SongId> {
        match self.timer.pending() {
            Some(Deferred::CompleteTransition { to }) => Some(*to),
            _ => None,
        }
    }

    /// Drop pending deferred work; an interrupted fade brings the master back
    fn cancel_deferred(&mut self) {
        if let Some(Deferred::CompleteTransition { .. }) = self.timer.cancel() {
            self.playback.ramp_master(self.master_volume, self.config.ramp_time_constant);
        }
    }

    /// Move to `target`, fading across when playing
    ///
    /// When stopped the swap is immediate; `start_if_stopped` decides whether
    /// the new song starts.
    fn transition_to(&mut self, target: usize, start_if_stopped: bool) {
        let Some(to) = self.setlist.get(target).map(Song::id) else {
            return;
        };
        let now = self.clock.now();

        match self.pending_transition() {
            // Repeated presses while fading don't restart the fade
            Some(pending) if pending == to => {}
            Some(_) => {
                let due = self.timer.due().unwrap_or(now + self.config.fade_out_secs);
                self.timer.arm(Deferred::CompleteTransition { to }, due);
            }
            None if self.transport.is_playing() => {
                self.timer.cancel();
                self.playback.ramp_master(FADE_FLOOR, self.config.fade_out_time_constant);
                self.timer.arm(Deferred::CompleteTransition { to }, now + self.config.fade_out_secs);
                log::debug!("Fading out song {} toward song {}", self.active + 1, target + 1);
            }
            None => {
                self.timer.cancel();
                self.swap_to(target, start_if_stopped, false);
            }
        }
    }

    /// Make `index` the active song, paused at zero
    fn select(&mut self, index: usize) {
        self.active = index;
        self.transport.reset();
        let duration = self.setlist.get(index).map_or(0.0, Song::duration);
        self.transport.set_duration(duration);
    }

    fn swap_to(&mut self, index: usize, resume: bool, fade_in: bool) {
        self.playback.stop_all();
        self.select(index);
        if fade_in {
            self.playback.fade_master_in(FADE_FLOOR, self.master_volume, self.config.fade_in_secs);
        }
        if resume {
            self.start_segment();
        }
        log::debug!("Switched to song {} ({})", index + 1, if resume { "playing" } else { "stopped" });
    }

    fn restart_current(&mut self) {
        if self.setlist.is_empty() {
            return;
        }
        let was_playing = self.transport.is_playing();
        self.playback.stop_all();
        let now = self.clock.now();
        self.transport.pause(now);
        self.transport.seek_to_start(now);
        if was_playing {
            self.start_segment();
        }
    }

    /// Start every channel of the active song from the transport position
    fn start_segment(&mut self) -> bool {
        self.playback.stop_all();
        let Some(song) = self.setlist.get(self.active) else {
            return false;
        };
        if song.channels.is_empty() {
            return false;
        }

        if self.clock.is_suspended() {
            if let Err(e) = self.clock.resume() {
                log::warn!("Audio clock did not resume: {}", e);
            }
        }

        let now = self.clock.now();
        let offset = self.transport.elapsed(now);
        self.playback.start_all(song.channels.iter().map(Channel::node), offset);
        self.transport.play(now);
        true
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mix (active song only)
    // ─────────────────────────────────────────────────────────────────────

    fn update_active_mix(&mut self, channel: ChannelId, update: impl FnOnce(&mut ChannelMix)) -> bool {
        let Some(song) = self.setlist.get_mut(self.active) else {
            return false;
        };
        let Some(target) = song.channels.iter_mut().find(|c| c.id == channel) else {
            return false;
        };
        update(&mut target.mix);
        self.dirty = true;
        true
    }

    /// Ramp every channel of the active song to its effective gain
    fn apply_active_gains(&mut self) {
        let tc = self.config.ramp_time_constant;
        let Some(song) = self.setlist.get(self.active) else {
            return;
        };
        let has_solo = song.has_solo();
        for channel in &song.channels {
            self.playback.ramp_gain(channel.node, effective_gain(&channel.mix, has_solo), tc);
        }
    }

    pub fn set_volume(&mut self, channel: ChannelId, volume: f32) -> bool {
        if !self.update_active_mix(channel, |mix| mix.volume = clamp_volume(volume)) {
            return false;
        }
        self.apply_active_gains();
        true
    }

    pub fn toggle_mute(&mut self, channel: ChannelId) -> bool {
        if !self.update_active_mix(channel, |mix| mix.muted = !mix.muted) {
            return false;
        }
        self.apply_active_gains();
        true
    }

    pub fn toggle_solo(&mut self, channel: ChannelId) -> bool {
        if !self.update_active_mix(channel, |mix| mix.soloed = !mix.soloed) {
            return false;
        }
        self.apply_active_gains();
        true
    }

    pub fn set_bus(&mut self, channel: ChannelId, bus: Bus) -> bool {
        if !self.update_active_mix(channel, |mix| mix.set_bus(bus)) {
            return false;
        }
        if let Some(node) = self.active_song().and_then(|s| s.channel(channel)).map(Channel::node) {
            self.playback.ramp_pan(node, bus.pan(), self.config.ramp_time_constant);
        }
        true
    }

    /// Set the master level, clamped to `[0, 1]`
    ///
    /// While a fade transition is pending the new level is only stored; the
    /// fade-in after the swap heads for it.
    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        if self.pending_transition().is_none() {
            self.playback.ramp_master(self.master_volume, self.config.ramp_time_constant);
        }
    }

    /// Toggle name-based panning for every song
    ///
    /// The active song glides to its new pans; the others jump.
    pub fn set_auto_pan(&mut self, enabled: bool) {
        if self.auto_pan == enabled {
            return;
        }
        self.auto_pan = enabled;
        let ramp = self.config.ramp_time_constant;

        for index in 0..self.setlist.len() {
            let time_constant = if index == self.active { ramp } else { 0.0 };
            let Some(song) = self.setlist.get_mut(index) else {
                continue;
            };
            for channel in song.channels.iter_mut() {
                let pan = auto_pan_for(&channel.name, enabled);
                channel.mix.pan = pan;
                channel.mix.bus = Bus::from_pan(pan);
                self.playback.ramp_pan(channel.node, pan, time_constant);
            }
        }
        self.dirty = true;
        log::info!("Auto-pan {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Remember the output device; the audio system picks it up on next start
    pub fn set_output_device(&mut self, device: Option<DeviceId>) -> bool {
        if self.output_device == device {
            return false;
        }
        match &device {
            Some(id) => log::info!("Output device set to {}, takes effect on restart", id),
            None => log::info!("Output device reset to system default, takes effect on restart"),
        }
        self.output_device = device;
        true
    }

    // ─────────────────────────────────────────────────────────────────────
    // Setlist editing
    // ─────────────────────────────────────────────────────────────────────

    pub fn rename_song(&mut self, id: SongId, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let Some(song) = self.setlist.index_of(id).and_then(|i| self.setlist.get_mut(i)) else {
            return false;
        };
        song.name = name.to_string();
        self.dirty = true;
        true
    }

    pub fn set_cover_image(&mut self, id: SongId, cover_image: Option<String>) -> bool {
        let Some(song) = self.setlist.index_of(id).and_then(|i| self.setlist.get_mut(i)) else {
            return false;
        };
        song.cover_image = cover_image;
        self.dirty = true;
        true
    }

    /// Reorder the setlist; the active song stays active wherever it lands
    pub fn move_song(&mut self, from: usize, to: usize) -> bool {
        let active_id = self.active_song().map(Song::id);
        if !self.setlist.move_song(from, to) {
            return false;
        }
        if let Some(id) = active_id {
            self.active = self.setlist.index_of(id).unwrap_or(0);
        }
        self.dirty = true;
        true
    }

    /// Drop a song and its graph nodes
    ///
    /// Removing the active song stops playback and selects the song that
    /// takes its place.
    pub fn remove_song(&mut self, id: SongId) -> bool {
        let Some(index) = self.setlist.index_of(id) else {
            return false;
        };
        let removing_active = index == self.active;
        if removing_active || self.pending_transition() == Some(id) {
            self.cancel_deferred();
        }
        if removing_active {
            self.playback.stop_all();
        }

        let song = self.setlist.remove(index);
        for channel in &song.channels {
            self.playback.destroy_node(channel.node);
        }

        if self.setlist.is_empty() {
            self.select(0);
        } else if removing_active {
            self.select(index.min(self.setlist.len() - 1));
        } else if index < self.active {
            self.active -= 1;
        }

        self.dirty = true;
        log::info!("Removed song '{}'", song.name);
        true
    }

    /// Empty the setlist and release every graph node
    pub fn clear_session(&mut self) {
        self.cancel_deferred();
        self.playback.stop_all();
        for song in self.setlist.clear() {
            for channel in &song.channels {
                self.playback.destroy_node(channel.node);
            }
        }
        self.select(0);
        self.dirty = true;
    }
}
