//! Song loading
//!
//! Turns folders or lists of stem files into [`SongLoad`]s the controller can
//! accept. Each file becomes one channel named after the file. Channels of a
//! song decode in parallel on the rayon pool; a file that fails to decode is
//! reported as a failed channel instead of failing the song.
//!
//! [`SongLoader`] runs all of this on a background thread so the control loop
//! never blocks on disk or codecs.

mod decode;
mod error;
mod song_loader;

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::transport::{FailedChannel, LoadedChannel, SongLoad};
use crate::types::ChannelId;

pub use decode::decode_file;
pub use error::DecodeError;
pub use song_loader::{SongLoadRequest, SongLoadResult, SongLoader};

/// Extensions recognised as stems
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["wav", "flac", "mp3"];

/// File stems recognised as song artwork inside a song folder
const COVER_STEMS: [&str; 3] = ["cover", "folder", "artwork"];
const COVER_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|s| ext.eq_ignore_ascii_case(s)))
}

pub fn is_supported(path: &Path) -> bool {
    has_extension(path, &SUPPORTED_EXTENSIONS)
}

/// Display name of a channel: the file name without its extension
pub fn channel_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Channel".to_string())
}

/// Decode `paths` as the channels of one song
pub fn load_song_files(name: &str, paths: &[PathBuf], target_rate: u32) -> SongLoad {
    let decoded: Vec<_> = paths
        .par_iter()
        .map(|path| (ChannelId::new(), channel_name(path), path, decode_file(path, target_rate)))
        .collect();

    let mut load = SongLoad::new(name);
    for (id, name, path, result) in decoded {
        match result {
            Ok(buffer) => load.channels.push(LoadedChannel {
                id,
                name,
                buffer,
                source: Some(path.clone()),
            }),
            Err(e) => load.failed.push(FailedChannel {
                id,
                name,
                reason: e.to_string(),
            }),
        }
    }
    load
}

/// Decode every supported file in `dir` as one song named after the folder
///
/// Files are taken in name order. A `cover.png`/`cover.jpg` (or `folder.*`,
/// `artwork.*`) next to the stems becomes the song's cover.
pub fn load_song_dir(dir: &Path, target_rate: u32) -> Result<SongLoad, DecodeError> {
    let mut stems = Vec::new();
    let mut cover = None;
    for entry in std::fs::read_dir(dir).map_err(|e| DecodeError::io(dir, e))? {
        let path = entry.map_err(|e| DecodeError::io(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        if is_supported(&path) {
            stems.push(path);
        } else if is_cover(&path) && cover.is_none() {
            cover = Some(path);
        }
    }
    if stems.is_empty() {
        return Err(DecodeError::NoAudioFiles(dir.to_path_buf()));
    }
    stems.sort();

    let name = dir
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Untitled".to_string());
    log::info!("Decoding '{}' ({} stems)", name, stems.len());

    let mut load = load_song_files(&name, &stems, target_rate);
    load.cover_image = cover.map(|p| p.to_string_lossy().into_owned());
    Ok(load)
}

fn is_cover(path: &Path) -> bool {
    let stem_matches = path
        .file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| COVER_STEMS.iter().any(|c| s.eq_ignore_ascii_case(c)));
    stem_matches && has_extension(path, &COVER_EXTENSIONS)
}


#[cfg(test)]
mod tests {
    use super::test_support::write_wav;
    use super::*;

    #[test]
    fn test_channel_name_is_file_stem() {
        assert_eq!(channel_name(Path::new("/songs/opener/Click Track.wav")), "Click Track");
        assert_eq!(channel_name(Path::new("bass.stem.flac")), "bass.stem");
        assert!(is_supported(Path::new("a.WAV")));
        assert!(is_supported(Path::new("a.mp3")));
        assert!(!is_supported(Path::new("a.txt")));
        assert!(!is_supported(Path::new("noext")));
    }

    #[test]
    fn test_load_song_dir() {
        let dir = tempfile::tempdir().unwrap();
        let song_dir = dir.path().join("Opener");
        std::fs::create_dir(&song_dir).unwrap();
        write_wav(&song_dir.join("Click.wav"), 8_000, 800);
        write_wav(&song_dir.join("Bass.wav"), 8_000, 1_600);
        std::fs::write(song_dir.join("Broken.wav"), b"garbage").unwrap();
        std::fs::write(song_dir.join("notes.txt"), b"intro x2").unwrap();
        std::fs::write(song_dir.join("cover.png"), b"png").unwrap();

        let load = load_song_dir(&song_dir, 8_000).unwrap();
        assert_eq!(load.name, "Opener");
        let names: Vec<&str> = load.channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Bass", "Click"]);
        assert_eq!(load.failed.len(), 1);
        assert_eq!(load.failed[0].name, "Broken");
        assert!(load.cover_image.as_deref().is_some_and(|c| c.ends_with("cover.png")));
        assert_eq!(load.sources().len(), 2);
        assert_eq!(load.channels[0].buffer.frames(), 1_600);
    }

    #[test]
    fn test_empty_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.md"), b"-").unwrap();
        assert!(matches!(load_song_dir(dir.path(), 48_000), Err(DecodeError::NoAudioFiles(_))));
        assert!(matches!(
            load_song_dir(&dir.path().join("missing"), 48_000),
            Err(DecodeError::Io { .. })
        ));
    }
}
