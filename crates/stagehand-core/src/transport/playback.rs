//! Synchronized multi-channel playback
//!
//! The single place that talks to the render graph on behalf of the
//! transport. Starting a song means ONE `StartSources` command listing every
//! channel with one shared offset, so the audio thread starts all of them in
//! the same block from the same sample. Issuing one start per channel would
//! let them land in different blocks and drift apart.
//!
//! Every start is preceded by a stop of whatever is live, whatever the caller
//! believes the previous state to be.

use basedrop::{Handle, Shared};

use crate::engine::{gc_handle, GraphCommand, GraphSink, MAX_CHANNEL_NODES};
use crate::types::{ChannelBuffer, NodeId};

pub struct SyncPlayback<G: GraphSink> {
    graph: G,
    /// Unused node slots (popped from the end, lowest slot first)
    free_nodes: Vec<NodeId>,
    /// Nodes whose sources were started by the last `start_all`
    live: Vec<NodeId>,
    gc: Handle,
}

impl<G: GraphSink> SyncPlayback<G> {
    pub fn new(graph: G) -> Self {
        Self {
            graph,
            free_nodes: (0..MAX_CHANNEL_NODES).rev().map(NodeId).collect(),
            live: Vec::new(),
            gc: gc_handle(),
        }
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    /// Node slots still available
    pub fn free_capacity(&self) -> usize {
        self.free_nodes.len()
    }

    /// Whether sources are (or may still be) running
    pub fn is_live(&self) -> bool {
        !self.live.is_empty()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Node lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Create the persistent gain/pan node for a channel
    ///
    /// Returns `None` when every slot is taken.
    pub fn create_node(&mut self, buffer: ChannelBuffer, gain: f32, pan: f32) -> Option<NodeId> {
        let node = self.free_nodes.pop()?;
        self.graph.submit(GraphCommand::CreateChannel {
            node,
            buffer: Shared::new(&self.gc, buffer),
            gain,
            pan,
        });
        Some(node)
    }

    pub fn destroy_node(&mut self, node: NodeId) {
        self.live.retain(|n| *n != node);
        self.graph.submit(GraphCommand::DestroyChannel { node });
        self.free_nodes.push(node);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sources
    // ─────────────────────────────────────────────────────────────────────

    /// Stop everything live, then start every node from `offset` in one pass
    ///
    /// Returns the number of sources started.
    pub fn start_all(&mut self, nodes: impl IntoIterator<Item = NodeId>, offset: f64) -> usize {
        self.stop_all();
        let nodes: Vec<NodeId> = nodes.into_iter().collect();
        if nodes.is_empty() {
            return 0;
        }
        let offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
        self.graph.submit(GraphCommand::StartSources {
            offset,
            nodes: nodes.clone().into_boxed_slice(),
        });
        let started = nodes.len();
        self.live = nodes;
        started
    }

    /// Stop and discard every live source; a no-op when nothing is live
    pub fn stop_all(&mut self) {
        if self.live.is_empty() {
            return;
        }
        let nodes = std::mem::take(&mut self.live).into_boxed_slice();
        self.graph.submit(GraphCommand::StopSources { nodes });
    }

    // ─────────────────────────────────────────────────────────────────────
    // Parameters
    // ─────────────────────────────────────────────────────────────────────

    pub fn ramp_gain(&mut self, node: NodeId, target: f32, time_constant: f64) {
        self.graph.submit(GraphCommand::RampGain { node, target, time_constant });
    }

    pub fn ramp_pan(&mut self, node: NodeId, target: f32, time_constant: f64) {
        self.graph.submit(GraphCommand::RampPan { node, target, time_constant });
    }

    pub fn ramp_master(&mut self, target: f32, time_constant: f64) {
        self.graph.submit(GraphCommand::RampMaster { target, time_constant });
    }

    pub fn fade_master_in(&mut self, from: f32, to: f32, duration: f64) {
        self.graph.submit(GraphCommand::MasterFadeIn { from, to, duration });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RenderGraph;
    use crate::types::StereoBuffer;

    const SR: u32 = 1000;

    fn buffer() -> ChannelBuffer {
        ChannelBuffer::new(StereoBuffer::silence(5_000), SR)
    }

    #[test]
    fn test_start_all_is_one_pass_with_shared_origin() {
        let mut engine = SyncPlayback::new(RenderGraph::new(SR));
        let nodes: Vec<NodeId> = (0..4).filter_map(|_| engine.create_node(buffer(), 1.0, 0.0)).collect();
        assert_eq!(nodes, vec![NodeId(0), NodeId(1), NodeId(2), NodeId(3)]);

        assert_eq!(engine.start_all(nodes.clone(), 1.5), 4);
        let graph = engine.graph();
        for node in &nodes {
            let n = graph.node(*node).unwrap();
            assert_eq!(n.started_at(), Some(0));
            assert_eq!(n.position(), Some(1500));
        }
    }

    #[test]
    fn test_start_stops_previous_sources_first() {
        let mut engine = SyncPlayback::new(RenderGraph::new(SR));
        let a = engine.create_node(buffer(), 1.0, 0.0).unwrap();
        let b = engine.create_node(buffer(), 1.0, 0.0).unwrap();

        engine.start_all([a], 0.0);
        engine.start_all([b], 0.0);
        assert!(!engine.graph().node(a).unwrap().is_playing());
        assert!(engine.graph().node(b).unwrap().is_playing());

        engine.stop_all();
        engine.stop_all();
        assert!(!engine.is_live());
        assert!(!engine.graph().node(b).unwrap().is_playing());
    }

    #[test]
    fn test_destroyed_nodes_are_recycled() {
        let mut engine = SyncPlayback::new(RenderGraph::new(SR));
        let a = engine.create_node(buffer(), 1.0, 0.0).unwrap();
        engine.start_all([a], 0.0);
        engine.destroy_node(a);

        assert!(!engine.is_live());
        assert!(engine.graph().node(a).is_none());
        assert_eq!(engine.free_capacity(), MAX_CHANNEL_NODES);
        assert_eq!(engine.create_node(buffer(), 1.0, 0.0), Some(a));
    }

    #[test]
    fn test_bad_offset_starts_from_zero() {
        let mut engine = SyncPlayback::new(RenderGraph::new(SR));
        let a = engine.create_node(buffer(), 1.0, 0.0).unwrap();
        engine.start_all([a], f64::NAN);
        assert_eq!(engine.graph().node(a).unwrap().position(), Some(0));
        assert_eq!(engine.start_all(Vec::new(), 0.0), 0);
        assert!(!engine.graph().node(a).unwrap().is_playing());
    }
}
