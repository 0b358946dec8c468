//! Decoder error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while turning audio files into channel buffers
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// The file decoded to zero frames
    #[error("No audio decoded from {0:?}")]
    Empty(PathBuf),

    #[error("No supported audio files in {0:?}")]
    NoAudioFiles(PathBuf),

    #[error("Resampling failed: {0}")]
    Resample(String),
}

impl DecodeError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
