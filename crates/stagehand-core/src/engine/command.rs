//! Lock-free command queue between the controller and the render graph
//!
//! The controller never touches the render graph directly. Every change to the
//! live audio (creating channel nodes, starting and stopping sources, gain and
//! pan ramps, pad voices) is expressed as a [`GraphCommand`] and pushed into a
//! wait-free `rtrb` ringbuffer. The audio thread drains the queue at the start
//! of every block, so all commands pushed in one control pass take effect in
//! the same block.
//!
//! ```ignore
//! let (tx, rx) = command_channel();
//! // control thread
//! sender.submit(GraphCommand::StartSources { offset: 0.0, nodes });
//! // audio thread
//! graph.process_commands(&mut rx);
//! ```

use basedrop::Shared;

use crate::types::{ChannelBuffer, NodeId};

/// Sound source for a pad voice
pub enum PadSource {
    /// Built-in synth voice at the given fundamental (Hz)
    Synth { frequency: f32 },
    /// Looped custom sample
    Sample { buffer: Shared<ChannelBuffer> },
}

/// Commands sent from the control thread to the render graph
///
/// Times are in seconds; time constants follow exponential-approach semantics
/// (a zero time constant applies the value immediately).
pub enum GraphCommand {
    /// Install a persistent gain/pan node for a channel in `node`'s slot
    CreateChannel {
        node: NodeId,
        buffer: Shared<ChannelBuffer>,
        gain: f32,
        pan: f32,
    },
    /// Remove a channel node; its buffer is released through the collector
    DestroyChannel { node: NodeId },
    /// Start fresh one-shot sources on every listed node in the same block,
    /// all reading from `offset`
    StartSources { offset: f64, nodes: Box<[NodeId]> },
    /// Stop and discard the sources of the listed nodes
    StopSources { nodes: Box<[NodeId]> },
    RampGain {
        node: NodeId,
        target: f32,
        time_constant: f64,
    },
    RampPan {
        node: NodeId,
        target: f32,
        time_constant: f64,
    },
    /// Move the master stage toward `target`
    RampMaster { target: f32, time_constant: f64 },
    /// Set the master stage to `from`, then ramp exponentially to `to`
    MasterFadeIn { from: f32, to: f32, duration: f64 },
    /// Start a new pad voice, fading in linearly to `volume`
    PadStart {
        source: PadSource,
        volume: f32,
        fade_in: f64,
    },
    /// Fade the active pad voice out and free it after `hold` seconds
    PadRelease { time_constant: f64, hold: f64 },
    /// Re-target the active pad voice's level
    PadVolume { volume: f32, time_constant: f64 },
}

impl GraphCommand {
    /// Short name for diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            GraphCommand::CreateChannel { .. } => "CreateChannel",
            GraphCommand::DestroyChannel { .. } => "DestroyChannel",
            GraphCommand::StartSources { .. } => "StartSources",
            GraphCommand::StopSources { .. } => "StopSources",
            GraphCommand::RampGain { .. } => "RampGain",
            GraphCommand::RampPan { .. } => "RampPan",
            GraphCommand::RampMaster { .. } => "RampMaster",
            GraphCommand::MasterFadeIn { .. } => "MasterFadeIn",
            GraphCommand::PadStart { .. } => "PadStart",
            GraphCommand::PadRelease { .. } => "PadRelease",
            GraphCommand::PadVolume { .. } => "PadVolume",
        }
    }
}

/// Anything that accepts graph commands
///
/// The real-time path is [`crate::audio::CommandSender`]; the render graph
/// itself also implements this trait so it can be driven synchronously for
/// offline rendering and tests.
pub trait GraphSink {
    fn submit(&mut self, cmd: GraphCommand);
}

/// Capacity of each command queue
///
/// Loading a song sends one `CreateChannel` per stem and restoring a session
/// sends them for every song at once, so leave generous headroom.
pub const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// Create a new command channel (producer for the control thread, consumer
/// for the audio thread)
pub fn command_channel() -> (rtrb::Producer<GraphCommand>, rtrb::Consumer<GraphCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}
