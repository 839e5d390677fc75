//! Immutable street graph

use hashbrown::HashMap;
use petgraph::{
    Direction,
    graph::{DiGraph, EdgeIndex, EdgeReference, NodeIndex},
    visit::EdgeRef,
};

use super::{StreetEdge, StreetNode};
use crate::{NodeId, SegmentId};

/// Directed street graph. Two-way segments are stored as a symmetric pair of edges.
///
/// The graph is built once by [`crate::build_street_graph`] and exposes no mutation API.
#[derive(Debug, Clone, Default)]
pub struct StreetGraph {
    graph: DiGraph<StreetNode, StreetEdge>,
    node_index: HashMap<NodeId, NodeIndex>,
}

impl StreetGraph {
    pub(crate) fn from_parts(graph: DiGraph<StreetNode, StreetEdge>) -> Self {
        let node_index = graph
            .node_indices()
            .map(|idx| (graph[idx].id, idx))
            .collect();
        Self { graph, node_index }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Internal index of an external node identifier
    pub fn node_index(&self, id: NodeId) -> Option<NodeIndex> {
        self.node_index.get(&id).copied()
    }

    /// External identifier of a node index.
    ///
    /// # Panics
    ///
    /// If `idx` does not belong to this graph
    pub fn node_id(&self, idx: NodeIndex) -> NodeId {
        self.graph[idx].id
    }

    pub fn edge(&self, idx: EdgeIndex) -> Option<&StreetEdge> {
        self.graph.edge_weight(idx)
    }

    /// Source and target node index of an edge
    pub fn edge_endpoints(&self, idx: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(idx)
    }

    /// Outgoing edges of a node
    pub fn edges(&self, node: NodeIndex) -> impl Iterator<Item = EdgeReference<'_, StreetEdge>> {
        self.graph.edges_directed(node, Direction::Outgoing)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &StreetNode)> {
        self.graph
            .node_indices()
            .map(move |idx| (idx, &self.graph[idx]))
    }

    /// Nodes adjacent in either direction
    pub fn neighbors_undirected(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_undirected(node)
    }

    /// Flat description of every edge as `(from, to, segment, length, travel_time)`,
    /// in insertion order.
    pub fn edge_list(&self) -> Vec<(NodeId, NodeId, SegmentId, f64, f64)> {
        self.graph
            .edge_references()
            .map(|edge| {
                let weight = edge.weight();
                (
                    self.graph[edge.source()].id,
                    self.graph[edge.target()].id,
                    weight.segment,
                    weight.length,
                    weight.travel_time,
                )
            })
            .collect()
    }
}
