//! Setlist transport
//!
//! - [`TransportClock`]: the play-head, derived from the audio clock
//! - [`SyncPlayback`]: same-origin start/stop of every channel of a song
//! - [`PlaybackController`]: setlist state machine, mix operations, editing
//! - [`TimerSlot`]: cancellable deferred work polled from the tick loop

mod clock;
mod controller;
mod error;
mod playback;
mod setlist;
mod timer;

pub use clock::{sanitize_duration, TransportClock};
pub use controller::{
    PlaybackController, RestoreReport, TransportEvent, TransportState, TransportStatus, FADE_FLOOR,
};
pub use error::{EngineError, EngineResult};
pub use playback::SyncPlayback;
pub use setlist::{Channel, FailedChannel, LoadReport, LoadedChannel, Setlist, Song, SongLoad};
pub use timer::TimerSlot;
