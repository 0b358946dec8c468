//! Setlist data model
//!
//! The setlist owns its songs, each song owns its channels. Songs expose
//! read-only views; every mutation goes through the playback controller so the
//! live graph and the data never disagree.

use std::path::PathBuf;

use crate::mix::ChannelMix;
use crate::types::{ChannelBuffer, ChannelId, NodeId, SongId};

/// One stem of a song
#[derive(Debug, Clone)]
pub struct Channel {
    pub(crate) id: ChannelId,
    pub(crate) name: String,
    pub(crate) mix: ChannelMix,
    pub(crate) node: NodeId,
    pub(crate) duration: f64,
}

impl Channel {
    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Live mix settings
    pub fn mix(&self) -> &ChannelMix {
        &self.mix
    }

    /// Render-graph node carrying this channel
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Length of this channel's audio in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }
}

/// An entry of the setlist
#[derive(Debug, Clone)]
pub struct Song {
    pub(crate) id: SongId,
    pub(crate) name: String,
    pub(crate) cover_image: Option<String>,
    /// Longest channel at creation time; never recomputed
    pub(crate) duration: f64,
    pub(crate) channels: Vec<Channel>,
}

impl Song {
    pub fn id(&self) -> SongId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cover_image(&self) -> Option<&str> {
        self.cover_image.as_deref()
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    /// Whether the song has anything to play
    pub fn is_playable(&self) -> bool {
        !self.channels.is_empty()
    }

    pub(crate) fn has_solo(&self) -> bool {
        crate::mix::any_soloed(self.channels.iter().map(|c| &c.mix))
    }
}

/// Ordered list of songs; order is playback order
#[derive(Debug, Clone, Default)]
pub struct Setlist {
    songs: Vec<Song>,
}

impl Setlist {
    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Song> {
        self.songs.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Song> {
        self.songs.get_mut(index)
    }

    pub fn index_of(&self, id: SongId) -> Option<usize> {
        self.songs.iter().position(|s| s.id == id)
    }

    pub(crate) fn push(&mut self, song: Song) {
        self.songs.push(song);
    }

    pub(crate) fn remove(&mut self, index: usize) -> Song {
        self.songs.remove(index)
    }

    pub(crate) fn clear(&mut self) -> Vec<Song> {
        std::mem::take(&mut self.songs)
    }

    /// Move the song at `from` to position `to`; false if either is out of range
    pub(crate) fn move_song(&mut self, from: usize, to: usize) -> bool {
        if from >= self.songs.len() || to >= self.songs.len() {
            return false;
        }
        let song = self.songs.remove(from);
        self.songs.insert(to, song);
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Song load contract
// ─────────────────────────────────────────────────────────────────────────────

/// A decoded channel ready to become part of a song
pub struct LoadedChannel {
    pub id: ChannelId,
    pub name: String,
    pub buffer: ChannelBuffer,
    /// File the audio was decoded from, if any
    pub source: Option<PathBuf>,
}

/// A channel whose decode failed
#[derive(Debug, Clone)]
pub struct FailedChannel {
    pub id: ChannelId,
    pub name: String,
    pub reason: String,
}

/// Everything needed to add a song to the setlist
///
/// Produced by whatever decoded the stems (local files, a restored session,
/// a download). Only fully decoded channels are accepted here.
pub struct SongLoad {
    pub id: SongId,
    pub name: String,
    pub cover_image: Option<String>,
    pub channels: Vec<LoadedChannel>,
    pub failed: Vec<FailedChannel>,
}

impl SongLoad {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SongId::new(),
            name: name.into(),
            cover_image: None,
            channels: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn with_channel(mut self, name: impl Into<String>, buffer: ChannelBuffer) -> Self {
        self.channels.push(LoadedChannel {
            id: ChannelId::new(),
            name: name.into(),
            buffer,
            source: None,
        });
        self
    }

    /// Source files of the decoded channels, by channel id
    pub fn sources(&self) -> Vec<(ChannelId, PathBuf)> {
        self.channels
            .iter()
            .filter_map(|c| c.source.clone().map(|path| (c.id, path)))
            .collect()
    }
}

/// Outcome of a successful song load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub song: SongId,
    pub index: usize,
    pub loaded: usize,
    /// Channels left out because they failed to decode
    pub failed: Vec<ChannelId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(name: &str) -> Song {
        Song {
            id: SongId::new(),
            name: name.to_string(),
            cover_image: None,
            duration: 1.0,
            channels: Vec::new(),
        }
    }

    #[test]
    fn test_move_song_reorders() {
        let mut setlist = Setlist::default();
        for name in ["A", "B", "C"] {
            setlist.push(song(name));
        }

        assert!(setlist.move_song(0, 2));
        let names: Vec<&str> = setlist.songs().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["B", "C", "A"]);

        assert!(!setlist.move_song(3, 0));
        assert!(!setlist.move_song(0, 3));
    }

    #[test]
    fn test_index_of() {
        let mut setlist = Setlist::default();
        let a = song("A");
        let id = a.id();
        setlist.push(song("B"));
        setlist.push(a);
        assert_eq!(setlist.index_of(id), Some(1));
        assert_eq!(setlist.index_of(SongId::new()), None);
        assert!(!setlist.get(0).unwrap().is_playable());
    }
}
