//! Render graph - the audio-thread side of the engine
//!
//! ```text
//!  source ─► pan ─► gain ─┐
//!  source ─► pan ─► gain ─┼─► master gain ─┬─► output
//!  source ─► pan ─► gain ─┘                │
//!                              pad voices ─┘  (pads bypass master)
//! ```
//!
//! Every channel owns a persistent node (gain + pan parameters and a shared
//! reference to its decoded buffer) that lives as long as the channel. The
//! source reading from the buffer is transient: it is created on every start
//! and dropped on every stop, never rewound or reused.
//!
//! The graph owns all of this exclusively on the audio thread. It is mutated
//! only by [`GraphCommand`]s, applied at block boundaries, which keeps node
//! mutation in one place.

use std::sync::Arc;

use basedrop::Shared;

use super::clock::ClockAtomics;
use super::command::{GraphCommand, GraphSink};
use super::param::SmoothedParam;
use crate::pad::voice::PadVoices;
use crate::types::{ChannelBuffer, NodeId, StereoBuffer, StereoSample};

/// Number of channel node slots (pre-allocated, never grown on the audio thread)
pub const MAX_CHANNEL_NODES: usize = 512;

/// Transient playing unit of a channel
#[derive(Debug, Clone, Copy)]
struct SourceVoice {
    /// Next frame to read from the buffer
    position: usize,
    /// Graph frame at which the source was started
    started_at: u64,
}

/// Persistent per-channel node
pub struct ChannelNode {
    buffer: Shared<ChannelBuffer>,
    gain: SmoothedParam,
    pan: SmoothedParam,
    source: Option<SourceVoice>,
}

impl ChannelNode {
    pub fn gain(&self) -> &SmoothedParam {
        &self.gain
    }

    pub fn pan(&self) -> &SmoothedParam {
        &self.pan
    }

    /// Whether a source is currently producing audio
    pub fn is_playing(&self) -> bool {
        self.source.is_some()
    }

    /// Graph frame at which the current source started
    pub fn started_at(&self) -> Option<u64> {
        self.source.map(|s| s.started_at)
    }

    /// Read position of the current source (frames)
    pub fn position(&self) -> Option<usize> {
        self.source.map(|s| s.position)
    }
}

/// Equal-power pan of a stereo frame
///
/// Pan 0 leaves the frame untouched; toward either side the far channel is
/// folded into the near one, so -1 puts the whole frame on the left output.
#[inline]
pub fn pan_stereo(frame: StereoSample, pan: f32) -> StereoSample {
    let pan = pan.clamp(-1.0, 1.0);
    if pan == 0.0 {
        return frame;
    }
    let x = if pan <= 0.0 { pan + 1.0 } else { pan };
    let angle = x * std::f32::consts::FRAC_PI_2;
    let (gain_l, gain_r) = (angle.cos(), angle.sin());
    if pan <= 0.0 {
        StereoSample::new(frame.left + frame.right * gain_l, frame.right * gain_r)
    } else {
        StereoSample::new(frame.left * gain_l, frame.right + frame.left * gain_r)
    }
}

/// Audio-thread render graph
pub struct RenderGraph {
    sample_rate: u32,
    nodes: Vec<Option<ChannelNode>>,
    master: SmoothedParam,
    pads: PadVoices,
    /// Frames rendered since creation
    frames: u64,
    clock: Option<Arc<ClockAtomics>>,
}

impl RenderGraph {
    pub fn new(sample_rate: u32) -> Self {
        let sample_rate = sample_rate.max(1);
        let mut nodes = Vec::with_capacity(MAX_CHANNEL_NODES);
        nodes.resize_with(MAX_CHANNEL_NODES, || None);
        Self {
            sample_rate,
            nodes,
            master: SmoothedParam::new(1.0),
            pads: PadVoices::new(sample_rate),
            frames: 0,
            clock: None,
        }
    }

    /// Publish rendered frames to the shared audio clock
    pub fn with_clock(mut self, clock: Arc<ClockAtomics>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames rendered so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn master(&self) -> &SmoothedParam {
        &self.master
    }

    pub fn node(&self, id: NodeId) -> Option<&ChannelNode> {
        self.nodes.get(id.0).and_then(|n| n.as_ref())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn pads(&self) -> &PadVoices {
        &self.pads
    }

    /// Drain a command queue (audio thread, once per block)
    pub fn process_commands(&mut self, rx: &mut rtrb::Consumer<GraphCommand>) {
        while let Ok(cmd) = rx.pop() {
            self.apply(cmd);
        }
    }

    /// Apply one command
    pub fn apply(&mut self, cmd: GraphCommand) {
        let sr = self.sample_rate;
        match cmd {
            GraphCommand::CreateChannel { node, buffer, gain, pan } => {
                if let Some(slot) = self.nodes.get_mut(node.0) {
                    *slot = Some(ChannelNode {
                        buffer,
                        gain: SmoothedParam::new(gain),
                        pan: SmoothedParam::new(pan),
                        source: None,
                    });
                }
            }
            GraphCommand::DestroyChannel { node } => {
                if let Some(slot) = self.nodes.get_mut(node.0) {
                    *slot = None;
                }
            }
            GraphCommand::StartSources { offset, nodes } => {
                // One pass, one frame stamp: every listed source starts in this block
                let started_at = self.frames;
                for id in nodes.iter() {
                    if let Some(node) = self.node_mut(*id) {
                        node.source = Some(SourceVoice {
                            position: node.buffer.frame_at(offset),
                            started_at,
                        });
                    }
                }
            }
            GraphCommand::StopSources { nodes } => {
                for id in nodes.iter() {
                    if let Some(node) = self.node_mut(*id) {
                        node.source = None;
                    }
                }
            }
            GraphCommand::RampGain { node, target, time_constant } => {
                if let Some(node) = self.node_mut(node) {
                    node.gain.approach(target, time_constant, sr);
                }
            }
            GraphCommand::RampPan { node, target, time_constant } => {
                if let Some(node) = self.node_mut(node) {
                    node.pan.approach(target.clamp(-1.0, 1.0), time_constant, sr);
                }
            }
            GraphCommand::RampMaster { target, time_constant } => {
                self.master.approach(target, time_constant, sr);
            }
            GraphCommand::MasterFadeIn { from, to, duration } => {
                self.master.set(from);
                self.master.exp_ramp(to, duration, sr);
            }
            GraphCommand::PadStart { source, volume, fade_in } => {
                self.pads.start(source, volume, fade_in);
            }
            GraphCommand::PadRelease { time_constant, hold } => {
                self.pads.release(time_constant, hold);
            }
            GraphCommand::PadVolume { volume, time_constant } => {
                self.pads.set_volume(volume, time_constant);
            }
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut ChannelNode> {
        self.nodes.get_mut(id.0).and_then(|n| n.as_mut())
    }

    /// Render one block into `out` (its current length is the block size)
    pub fn render(&mut self, out: &mut StereoBuffer) {
        out.fill_silence();
        let frames = out.as_mut_slice();
        let n_frames = frames.len();

        for node in self.nodes.iter_mut().flatten() {
            let Some(source) = node.source.as_mut() else {
                // Nothing audible: settle parameters instead of ticking them
                if node.gain.is_moving() {
                    node.gain.set(node.gain.target());
                }
                if node.pan.is_moving() {
                    node.pan.set(node.pan.target());
                }
                continue;
            };

            let samples = node.buffer.samples().as_slice();
            for frame in frames.iter_mut() {
                let gain = node.gain.next_value();
                let pan = node.pan.next_value();
                let Some(input) = samples.get(source.position) else { break };
                source.position += 1;
                *frame += pan_stereo(*input, pan) * gain;
            }

            // One-shot: a source that ran off the end is finished for good
            if source.position >= samples.len() {
                node.source = None;
            }
        }

        for frame in frames.iter_mut() {
            *frame = *frame * self.master.next_value();
        }

        self.pads.render_add(out);

        self.frames += n_frames as u64;
        if let Some(clock) = &self.clock {
            clock.advance(n_frames);
        }
    }
}

impl GraphSink for RenderGraph {
    fn submit(&mut self, cmd: GraphCommand) {
        self.apply(cmd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::gc_handle;

    const SR: u32 = 1000;

    fn constant_buffer(frames: usize, value: f32) -> Shared<ChannelBuffer> {
        let samples = StereoBuffer::from_vec(vec![StereoSample::mono(value); frames]);
        Shared::new(&gc_handle(), ChannelBuffer::new(samples, SR))
    }

    fn graph_with_nodes(count: usize, frames: usize) -> RenderGraph {
        let mut graph = RenderGraph::new(SR);
        for i in 0..count {
            graph.apply(GraphCommand::CreateChannel {
                node: NodeId(i),
                buffer: constant_buffer(frames, 0.25),
                gain: 1.0,
                pan: 0.0,
            });
        }
        graph
    }

    fn render(graph: &mut RenderGraph, frames: usize) -> StereoBuffer {
        let mut out = StereoBuffer::silence(frames);
        graph.render(&mut out);
        out
    }

    #[test]
    fn test_start_sources_share_one_start_frame() {
        let mut graph = graph_with_nodes(3, 10_000);
        render(&mut graph, 64);

        graph.apply(GraphCommand::StartSources {
            offset: 2.0,
            nodes: vec![NodeId(0), NodeId(1), NodeId(2)].into_boxed_slice(),
        });

        let starts: Vec<_> = (0..3).map(|i| graph.node(NodeId(i)).unwrap().started_at()).collect();
        assert_eq!(starts, vec![Some(64); 3]);
        let positions: Vec<_> = (0..3).map(|i| graph.node(NodeId(i)).unwrap().position()).collect();
        assert_eq!(positions, vec![Some(2000); 3]);
    }

    #[test]
    fn test_sources_sum_and_stay_in_lockstep() {
        let mut graph = graph_with_nodes(2, 10_000);
        graph.apply(GraphCommand::StartSources {
            offset: 0.0,
            nodes: vec![NodeId(0), NodeId(1)].into_boxed_slice(),
        });

        let out = render(&mut graph, 128);
        assert!((out[0].left - 0.5).abs() < 1e-6);
        assert!((out[127].right - 0.5).abs() < 1e-6);
        assert_eq!(graph.node(NodeId(0)).unwrap().position(), Some(128));
        assert_eq!(graph.node(NodeId(1)).unwrap().position(), Some(128));
    }

    #[test]
    fn test_stop_discards_and_repeated_stop_is_noop() {
        let mut graph = graph_with_nodes(1, 10_000);
        graph.apply(GraphCommand::StartSources {
            offset: 0.0,
            nodes: vec![NodeId(0)].into_boxed_slice(),
        });
        render(&mut graph, 32);

        for _ in 0..2 {
            graph.apply(GraphCommand::StopSources {
                nodes: vec![NodeId(0), NodeId(7)].into_boxed_slice(),
            });
        }
        assert!(!graph.node(NodeId(0)).unwrap().is_playing());
        assert_eq!(render(&mut graph, 32).peak(), 0.0);

        // A new start is a fresh source from its own offset
        graph.apply(GraphCommand::StartSources {
            offset: 0.0,
            nodes: vec![NodeId(0)].into_boxed_slice(),
        });
        assert_eq!(graph.node(NodeId(0)).unwrap().position(), Some(0));
    }

    #[test]
    fn test_source_finishes_at_end_of_buffer() {
        let mut graph = graph_with_nodes(1, 100);
        graph.apply(GraphCommand::StartSources {
            offset: 0.0,
            nodes: vec![NodeId(0)].into_boxed_slice(),
        });

        let out = render(&mut graph, 128);
        assert!(out[99].left > 0.0);
        assert_eq!(out[100].left, 0.0);
        assert!(!graph.node(NodeId(0)).unwrap().is_playing());
    }

    #[test]
    fn test_gain_ramp_is_smooth_while_playing() {
        let mut graph = graph_with_nodes(1, 10_000);
        graph.apply(GraphCommand::StartSources {
            offset: 0.0,
            nodes: vec![NodeId(0)].into_boxed_slice(),
        });
        graph.apply(GraphCommand::RampGain {
            node: NodeId(0),
            target: 0.0,
            time_constant: 0.05,
        });

        let out = render(&mut graph, 16);
        // First frame still close to full level, then decaying
        assert!(out[0].left > 0.24);
        assert!(out[15].left < out[0].left);
        assert!(out[15].left > 0.0);
        assert_eq!(graph.node(NodeId(0)).unwrap().gain().target(), 0.0);
    }

    #[test]
    fn test_pan_law() {
        let frame = StereoSample::new(0.5, 0.5);
        assert_eq!(pan_stereo(frame, 0.0), frame);

        let left = pan_stereo(frame, -1.0);
        assert!((left.left - 1.0).abs() < 1e-6);
        assert!(left.right.abs() < 1e-6);

        let right = pan_stereo(frame, 1.0);
        assert!(right.left.abs() < 1e-6);
        assert!((right.right - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_master_fade_in_and_clock_publishing() {
        let clock = Arc::new(ClockAtomics::new(SR));
        let mut graph = graph_with_nodes(1, 10_000).with_clock(clock.clone());
        graph.apply(GraphCommand::StartSources {
            offset: 0.0,
            nodes: vec![NodeId(0)].into_boxed_slice(),
        });
        graph.apply(GraphCommand::MasterFadeIn {
            from: 0.01,
            to: 1.0,
            duration: 1.0,
        });

        let first = render(&mut graph, 10);
        assert!(first[0].left < 0.01);
        render(&mut graph, 990);
        assert_eq!(graph.master().value(), 1.0);
        assert_eq!(clock.frames(), 1000);
        assert_eq!(graph.frames(), 1000);
    }

    #[test]
    fn test_destroy_channel_and_out_of_range_slots() {
        let mut graph = graph_with_nodes(2, 100);
        graph.apply(GraphCommand::DestroyChannel { node: NodeId(1) });
        graph.apply(GraphCommand::DestroyChannel { node: NodeId(MAX_CHANNEL_NODES + 5) });
        graph.apply(GraphCommand::CreateChannel {
            node: NodeId(MAX_CHANNEL_NODES),
            buffer: constant_buffer(10, 0.1),
            gain: 1.0,
            pan: 0.0,
        });
        assert_eq!(graph.node_count(), 1);
        assert!(graph.node(NodeId(1)).is_none());
    }

    #[test]
    fn test_idle_node_settles_parameters() {
        let mut graph = graph_with_nodes(1, 100);
        graph.apply(GraphCommand::RampPan {
            node: NodeId(0),
            target: -1.0,
            time_constant: 0.05,
        });
        render(&mut graph, 1);
        assert_eq!(graph.node(NodeId(0)).unwrap().pan().value(), -1.0);
    }
}
