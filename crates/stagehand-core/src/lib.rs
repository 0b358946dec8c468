//! Stagehand Core - multitrack setlist playback for live performance

pub mod audio;
pub mod config;
pub mod types;
pub mod engine;
pub mod mix;
pub mod transport;
pub mod pad;
pub mod loader;
pub mod session;

pub use types::*;
