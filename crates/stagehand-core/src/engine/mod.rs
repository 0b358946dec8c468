//! Audio engine - render graph, parameters, clock and command queue
//!
//! - RenderGraph: per-channel persistent nodes, transient sources, master stage
//! - SmoothedParam: click-free gain/pan trajectories
//! - AudioClock: monotonic time derived from rendered frames
//! - GraphCommand: the only way the control thread changes live audio

mod clock;
mod command;
mod gc;
mod graph;
pub mod param;

pub use clock::{AudioClock, ClockAtomics, ManualClock, StreamClock};
pub use command::{command_channel, GraphCommand, GraphSink, PadSource, COMMAND_QUEUE_CAPACITY};
pub use gc::gc_handle;
pub use graph::{pan_stereo, ChannelNode, RenderGraph, MAX_CHANNEL_NODES};
