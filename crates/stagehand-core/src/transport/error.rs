//! Transport error types

use thiserror::Error;

use crate::types::ChannelId;

/// Errors that can occur while adding songs to the setlist
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Every channel of the song failed to decode
    #[error("Song '{song}' has no playable channels ({} failed to decode)", failed.len())]
    NoPlayableChannels { song: String, failed: Vec<ChannelId> },

    /// The render graph has no free node slots left for the song's channels
    #[error("Render graph is full ({capacity} channel nodes)")]
    GraphFull { capacity: usize },
}

/// Result type for transport operations
pub type EngineResult<T> = Result<T, EngineError>;
