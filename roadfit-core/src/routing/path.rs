use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::model::{StreetGraph, WeightMode};
use crate::{Length, NodeId, Seconds};

/// Simple path between two nodes of one [`StreetGraph`].
///
/// Node and edge indices are only meaningful for the graph the path was computed on.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub mode: WeightMode,
    /// `edges.len() + 1` nodes, source first
    pub nodes: Vec<NodeIndex>,
    pub edges: Vec<EdgeIndex>,
    /// Sum of edge weights under `mode`
    pub weight: f64,
    pub length: Length,
    pub travel_time: Seconds,
}

impl Path {
    pub fn source(&self) -> NodeIndex {
        self.nodes[0]
    }

    pub fn target(&self) -> NodeIndex {
        self.nodes[self.nodes.len() - 1]
    }

    /// Source equals target
    pub fn is_trivial(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn node_ids(&self, graph: &StreetGraph) -> Vec<NodeId> {
        self.nodes.iter().map(|&idx| graph.node_id(idx)).collect()
    }
}
