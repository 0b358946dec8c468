//! Session folder on disk
//!
//! ```text
//! <session>/
//! ├── session.json            snapshot of the setlist
//! ├── audio/<channel-id>.wav  copy of every stem, named by channel id
//! └── pads/
//!     ├── pads.json           note -> custom pad name and file
//!     └── <note>.wav
//! ```
//!
//! Stems are copied in when a song is loaded so the session survives the
//! original files moving or disappearing.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::snapshot::SessionSnapshot;
use crate::loader::{decode_file, is_supported, SUPPORTED_EXTENSIONS};
use crate::pad::PadNote;
use crate::types::{ChannelBuffer, ChannelId};

pub const SESSION_FILE: &str = "session.json";
pub const AUDIO_DIR: &str = "audio";
pub const PADS_DIR: &str = "pads";
pub const PADS_FILE: &str = "pads.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PadEntry {
    name: String,
    file: String,
}

/// A custom pad stored in the session
#[derive(Debug, Clone, PartialEq)]
pub struct CustomPadFile {
    pub note: PadNote,
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// Open (and create if needed) the session folder at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { root: root.into() };
        for dir in [store.audio_dir(), store.pads_dir()] {
            std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create session directory: {:?}", dir))?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn audio_dir(&self) -> PathBuf {
        self.root.join(AUDIO_DIR)
    }

    fn pads_dir(&self) -> PathBuf {
        self.root.join(PADS_DIR)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Snapshot
    // ─────────────────────────────────────────────────────────────────────

    /// Saved snapshot, or `None` if no session was saved yet
    pub fn load_snapshot(&self) -> Result<Option<SessionSnapshot>> {
        let path = self.root.join(SESSION_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path).with_context(|| format!("Failed to read session: {:?}", path))?;
        let snapshot = serde_json::from_str(&json).with_context(|| format!("Failed to parse session: {:?}", path))?;
        Ok(Some(snapshot))
    }

    /// Write the snapshot (via a temp file, so a crash never leaves half a session)
    pub fn save_snapshot(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let path = self.root.join(SESSION_FILE);
        let tmp = self.root.join(format!("{}.tmp", SESSION_FILE));
        let json = serde_json::to_string_pretty(snapshot).context("Failed to serialize session")?;
        std::fs::write(&tmp, json).with_context(|| format!("Failed to write session: {:?}", tmp))?;
        std::fs::rename(&tmp, &path).with_context(|| format!("Failed to replace session: {:?}", path))?;
        log::debug!("Saved session ({} songs)", snapshot.songs.len());
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Channel audio
    // ─────────────────────────────────────────────────────────────────────

    /// Copy a stem into the session under its channel id
    pub fn import_audio(&self, channel: ChannelId, source: &Path) -> Result<PathBuf> {
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "wav".to_string());
        let dest = self.audio_dir().join(format!("{}.{}", channel, ext));
        if dest != source {
            std::fs::copy(source, &dest).with_context(|| format!("Failed to copy {:?} into session", source))?;
        }
        Ok(dest)
    }

    /// Stored stem of `channel`, whatever its extension
    pub fn audio_path(&self, channel: ChannelId) -> Option<PathBuf> {
        SUPPORTED_EXTENSIONS
            .iter()
            .map(|ext| self.audio_dir().join(format!("{}.{}", channel, ext)))
            .find(|p| p.is_file())
    }

    /// Decode the stored audio of every channel in `snapshot`
    ///
    /// Channels whose audio is missing or broken are simply absent from the
    /// result; restoring drops them.
    pub fn load_audio(&self, snapshot: &SessionSnapshot, target_rate: u32) -> HashMap<ChannelId, ChannelBuffer> {
        let ids: Vec<ChannelId> = snapshot.channel_ids().collect();
        ids.par_iter()
            .filter_map(|id| {
                let path = self.audio_path(*id)?;
                match decode_file(&path, target_rate) {
                    Ok(buffer) => Some((*id, buffer)),
                    Err(e) => {
                        log::warn!("Stored audio for channel {} unusable: {}", id, e);
                        None
                    }
                }
            })
            .collect()
    }

    /// Delete stored stems no channel of `snapshot` refers to
    pub fn prune_audio(&self, snapshot: &SessionSnapshot) -> Result<usize> {
        let keep: Vec<String> = snapshot.channel_ids().map(|id| id.to_string()).collect();
        let dir = self.audio_dir();
        let mut removed = 0;
        for entry in std::fs::read_dir(&dir).with_context(|| format!("Failed to list {:?}", dir))? {
            let path = entry?.path();
            let referenced = path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| keep.iter().any(|k| k == stem));
            if !referenced && is_supported(&path) {
                std::fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
                removed += 1;
            }
        }
        if removed > 0 {
            log::info!("Removed {} unused stems from the session", removed);
        }
        Ok(removed)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Custom pads
    // ─────────────────────────────────────────────────────────────────────

    fn read_pad_index(&self) -> Result<BTreeMap<PadNote, PadEntry>> {
        let path = self.pads_dir().join(PADS_FILE);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let json = std::fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
        serde_json::from_str(&json).with_context(|| format!("Failed to parse {:?}", path))
    }

    fn write_pad_index(&self, index: &BTreeMap<PadNote, PadEntry>) -> Result<()> {
        let path = self.pads_dir().join(PADS_FILE);
        let json = serde_json::to_string_pretty(index).context("Failed to serialize pad index")?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))
    }

    /// Store `source` as the custom pad for `note`, replacing any previous one
    pub fn save_custom_pad(&self, note: PadNote, name: &str, source: &Path) -> Result<PathBuf> {
        let mut index = self.read_pad_index()?;
        if let Some(old) = index.remove(&note) {
            let _ = std::fs::remove_file(self.pads_dir().join(old.file));
        }

        let ext = source.extension().and_then(|e| e.to_str()).unwrap_or("wav").to_ascii_lowercase();
        let file = format!("{}.{}", note.name(), ext);
        let dest = self.pads_dir().join(&file);
        std::fs::copy(source, &dest).with_context(|| format!("Failed to copy pad {:?}", source))?;

        index.insert(note, PadEntry { name: name.to_string(), file });
        self.write_pad_index(&index)?;
        Ok(dest)
    }

    pub fn remove_custom_pad(&self, note: PadNote) -> Result<bool> {
        let mut index = self.read_pad_index()?;
        let Some(entry) = index.remove(&note) else {
            return Ok(false);
        };
        let path = self.pads_dir().join(entry.file);
        if path.exists() {
            std::fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
        }
        self.write_pad_index(&index)?;
        Ok(true)
    }

    /// Every custom pad whose file is still present
    pub fn custom_pads(&self) -> Result<Vec<CustomPadFile>> {
        let pads = self
            .read_pad_index()?
            .into_iter()
            .map(|(note, entry)| CustomPadFile {
                note,
                name: entry.name,
                path: self.pads_dir().join(entry.file),
            })
            .filter(|pad| pad.path.is_file())
            .collect();
        Ok(pads)
    }

    /// Forget the setlist: snapshot and every stored stem (pads stay)
    pub fn clear(&self) -> Result<()> {
        let session = self.root.join(SESSION_FILE);
        if session.exists() {
            std::fs::remove_file(&session).with_context(|| format!("Failed to remove {:?}", session))?;
        }
        self.prune_audio(&SessionSnapshot::default())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::test_support::write_wav;
    use crate::mix::ChannelMix;
    use crate::session::{ChannelSnapshot, SongSnapshot};
    use crate::types::SongId;

    fn snapshot_with(channels: &[ChannelId]) -> SessionSnapshot {
        SessionSnapshot {
            songs: vec![SongSnapshot {
                id: SongId::new(),
                name: "Closer".to_string(),
                cover_image: None,
                duration: 0.1,
                channels: channels
                    .iter()
                    .map(|id| ChannelSnapshot {
                        id: *id,
                        name: "Stem".to_string(),
                        mix: ChannelMix::default(),
                    })
                    .collect(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_snapshot_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("session")).unwrap();
        assert!(store.load_snapshot().unwrap().is_none());

        let snapshot = snapshot_with(&[ChannelId::new()]);
        store.save_snapshot(&snapshot).unwrap();
        assert_eq!(store.load_snapshot().unwrap(), Some(snapshot));
        assert!(!store.root().join("session.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();
        std::fs::write(dir.path().join(SESSION_FILE), "{ not json").unwrap();
        assert!(store.load_snapshot().is_err());
    }

    #[test]
    fn test_audio_import_load_and_prune() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("session")).unwrap();
        let source = dir.path().join("Drums.WAV");
        write_wav(&source, 8_000, 400);

        let kept = ChannelId::new();
        let dropped = ChannelId::new();
        let stored = store.import_audio(kept, &source).unwrap();
        assert!(stored.ends_with(format!("audio/{}.wav", kept)));
        store.import_audio(dropped, &source).unwrap();
        assert_eq!(store.audio_path(kept), Some(stored));

        let snapshot = snapshot_with(&[kept, ChannelId::new()]);
        let audio = store.load_audio(&snapshot, 8_000);
        assert_eq!(audio.len(), 1);
        assert_eq!(audio[&kept].frames(), 400);

        assert_eq!(store.prune_audio(&snapshot).unwrap(), 1);
        assert!(store.audio_path(dropped).is_none());
        assert!(store.audio_path(kept).is_some());

        store.save_snapshot(&snapshot).unwrap();
        store.clear().unwrap();
        assert!(store.load_snapshot().unwrap().is_none());
        assert!(store.audio_path(kept).is_none());
    }

    #[test]
    fn test_custom_pads() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("session")).unwrap();
        let source = dir.path().join("strings.wav");
        write_wav(&source, 8_000, 100);

        store.save_custom_pad(PadNote::Eb, "Strings", &source).unwrap();
        store.save_custom_pad(PadNote::Eb, "Strings 2", &source).unwrap();
        let pads = store.custom_pads().unwrap();
        assert_eq!(pads.len(), 1);
        assert_eq!(pads[0].note, PadNote::Eb);
        assert_eq!(pads[0].name, "Strings 2");
        assert!(pads[0].path.ends_with("pads/Eb.wav"));

        assert!(store.remove_custom_pad(PadNote::Eb).unwrap());
        assert!(!store.remove_custom_pad(PadNote::Eb).unwrap());
        assert!(store.custom_pads().unwrap().is_empty());
    }
}
