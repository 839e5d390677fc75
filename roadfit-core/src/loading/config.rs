use serde::{Deserialize, Serialize};

/// Options for building the street graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Drop every node and edge outside the largest weakly connected component
    pub keep_largest_component: bool,
    /// Give unassigned nodes the most frequent area of their neighbours. Not
    /// applied by [`build_street_graph`](super::build_street_graph); the caller
    /// runs [`NodeAreaLookup::fill_from_neighbors`](crate::NodeAreaLookup::fill_from_neighbors)
    /// on the built graph.
    pub fill_unassigned_nodes: bool,
}
