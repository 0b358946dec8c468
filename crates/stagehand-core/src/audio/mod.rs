//! Cross-platform audio output for Stagehand
//!
//! A single CPAL stereo output stream drives the render graph. The control
//! side talks to it only through lock-free command queues and reads time
//! from relaxed atomics; see [`crate::engine`] for the graph itself.
//!
//! ```ignore
//! use stagehand_core::audio::{start_audio_system, AudioConfig};
//!
//! let audio = start_audio_system(&AudioConfig::default())?;
//! let controller = PlaybackController::new(audio.command_sender, Arc::new(audio.clock), transport);
//! ```

mod backend;
mod config;
mod cpal_backend;
mod device;
mod error;

pub use backend::{start_audio_system, AudioHandle, AudioSystemResult, CommandSender};
pub use config::{latency_ms, AudioConfig, DeviceId, DEFAULT_BUFFER_SIZE, DEFAULT_SAMPLE_RATE, MAX_BUFFER_SIZE, MIN_BUFFER_SIZE};
pub use device::{available_output_devices, output_devices, resolve_output_device, OutputDevice};
pub use error::{AudioError, AudioResult};
