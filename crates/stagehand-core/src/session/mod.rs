//! Session persistence
//!
//! - [`SessionSnapshot`]: the setlist minus the audio, as JSON
//! - [`SessionStore`]: the on-disk session folder holding the snapshot, a copy
//!   of every stem and the custom pads

mod snapshot;
mod store;

pub use snapshot::{ChannelSnapshot, SessionSnapshot, SongSnapshot, SNAPSHOT_VERSION};
pub use store::{CustomPadFile, SessionStore, AUDIO_DIR, PADS_DIR, PADS_FILE, SESSION_FILE};
