//! Audio system entry point
//!
//! Same lock-free layout on every platform:
//! - the control thread pushes `GraphCommand`s into SPSC ringbuffers
//! - the audio thread owns the `RenderGraph` exclusively and drains them
//! - the audio clock is read through relaxed atomics

use crate::engine::{GraphCommand, GraphSink, StreamClock};

use super::config::AudioConfig;
use super::cpal_backend::CpalAudioHandle;
use super::error::AudioResult;

/// Result of starting the audio system
pub struct AudioSystemResult {
    /// Handle to keep audio alive (drop to stop)
    pub handle: AudioHandle,
    /// Command sender for the setlist transport
    pub command_sender: CommandSender,
    /// Separate queue for the pad bank, so both can be driven independently
    pub pad_sender: CommandSender,
    /// Monotonic clock advanced by the render callback
    pub clock: StreamClock,
    pub sample_rate: u32,
    /// Actual buffer size in frames
    pub buffer_size: u32,
    /// Audio latency in milliseconds (one-way, output only)
    pub latency_ms: f32,
}

/// Handle to the active audio system; drop to stop audio
pub type AudioHandle = CpalAudioHandle;

/// Command sender for the control thread
///
/// Wraps the lock-free producer for sending `GraphCommand`s to the audio
/// thread. All operations are non-blocking.
pub struct CommandSender {
    pub(crate) producer: rtrb::Producer<GraphCommand>,
}

impl CommandSender {
    /// Send a command (non-blocking)
    ///
    /// Returns `Err(cmd)` if the queue is full.
    pub fn send(&mut self, cmd: GraphCommand) -> Result<(), GraphCommand> {
        self.producer.push(cmd).map_err(|e| match e {
            rtrb::PushError::Full(value) => value,
        })
    }

    /// Check if the queue has space for more commands
    pub fn has_space(&self) -> bool {
        self.producer.slots() > 0
    }
}

impl GraphSink for CommandSender {
    fn submit(&mut self, cmd: GraphCommand) {
        if let Err(cmd) = self.send(cmd) {
            log::warn!("Audio command queue full, dropping {}", cmd.label());
        }
    }
}

/// Start the audio system with the given configuration
pub fn start_audio_system(config: &AudioConfig) -> AudioResult<AudioSystemResult> {
    super::cpal_backend::start_audio_system(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::command_channel;

    #[test]
    fn test_sender_reports_full_queue() {
        let (producer, mut consumer) = command_channel();
        let mut sender = CommandSender { producer };

        for _ in 0..crate::engine::COMMAND_QUEUE_CAPACITY {
            sender.submit(GraphCommand::RampMaster { target: 1.0, time_constant: 0.0 });
        }
        assert!(!sender.has_space());
        assert!(sender.send(GraphCommand::RampMaster { target: 0.0, time_constant: 0.0 }).is_err());

        // Dropped silently through the sink, queue contents untouched
        sender.submit(GraphCommand::RampMaster { target: 0.0, time_constant: 0.0 });
        assert!(consumer.pop().is_ok());
        assert!(sender.has_space());
    }
}
