//! Session snapshot - the serializable form of the setlist
//!
//! Carries everything needed to rebuild the setlist except the audio itself.
//! Audio is paired back up by channel id when the session is restored.

use serde::{Deserialize, Serialize};

use crate::mix::ChannelMix;
use crate::types::{ChannelId, SongId};

/// Current snapshot layout version
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub songs: Vec<SongSnapshot>,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            songs: Vec::new(),
        }
    }
}

impl SessionSnapshot {
    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Every channel id referenced by the snapshot
    pub fn channel_ids(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.songs.iter().flat_map(|s| s.channels.iter().map(|c| c.id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongSnapshot {
    pub id: SongId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub duration: f64,
    #[serde(default)]
    pub channels: Vec<ChannelSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub id: ChannelId,
    pub name: String,
    #[serde(flatten)]
    pub mix: ChannelMix,
}
