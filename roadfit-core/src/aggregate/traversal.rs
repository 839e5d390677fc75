use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    AreaId, Length, Seconds,
    model::{NodeAreaLookup, StreetGraph},
    routing::Path,
};

/// Distance and free-flow time travelled inside one area
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaShare {
    pub length: Length,
    pub travel_time: Seconds,
}

impl AreaShare {
    fn add(&mut self, length: Length, travel_time: Seconds) {
        self.length += length;
        self.travel_time += travel_time;
    }
}

/// Per-area decomposition of one path.
///
/// `areas` plus `unassigned` always add up to `total`: edges ending in a node
/// without area are kept as unassigned residual instead of being dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaTraversal {
    pub areas: BTreeMap<AreaId, AreaShare>,
    pub unassigned: AreaShare,
    pub total: AreaShare,
}

impl AreaTraversal {
    pub fn length_in(&self, area: AreaId) -> Length {
        self.areas.get(&area).map_or(0.0, |share| share.length)
    }

    pub fn assigned_length(&self) -> Length {
        self.areas.values().map(|share| share.length).sum()
    }

    pub fn has_unassigned(&self) -> bool {
        self.unassigned.length > 0.0
    }

    /// Whether the per-area lengths and the residual add up to the path length
    pub fn is_conserved(&self, tolerance: f64) -> bool {
        (self.assigned_length() + self.unassigned.length - self.total.length).abs()
            <= tolerance * self.total.length.max(1.0)
    }
}

/// Attributes each edge of `path` to the area of the edge's destination node.
///
/// An edge crossing an area boundary is counted entirely in the area it enters.
pub fn aggregate(path: &Path, graph: &StreetGraph, lookup: &NodeAreaLookup) -> AreaTraversal {
    let mut traversal = AreaTraversal::default();

    for &edge_idx in &path.edges {
        let (Some(edge), Some((_, to))) = (graph.edge(edge_idx), graph.edge_endpoints(edge_idx))
        else {
            continue;
        };
        traversal.total.add(edge.length, edge.travel_time);

        match lookup.area_of(graph.node_id(to)) {
            Some(area) => traversal
                .areas
                .entry(area)
                .or_default()
                .add(edge.length, edge.travel_time),
            None => traversal.unassigned.add(edge.length, edge.travel_time),
        }
    }

    traversal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::{NetworkConfig, StreetSegment, build_street_graph};
    use crate::model::{StreetType, WeightMode};
    use crate::routing::shortest_path;

    fn chain() -> StreetGraph {
        let segments: Vec<_> = (1..5)
            .map(|i| {
                StreetSegment::straight(
                    i,
                    (i, (i as f64 * 100.0, 0.0)),
                    (i + 1, ((i + 1) as f64 * 100.0, 0.0)),
                    StreetType::Local,
                    true,
                )
                .with_length(i as f64 * 10.0)
            })
            .collect();
        build_street_graph(&segments, &NetworkConfig::default()).0
    }

    #[test]
    fn boundary_edges_go_to_destination_area() {
        let graph = chain();
        // nodes 1,2 in area 7; nodes 3,4,5 in area 8
        let lookup: NodeAreaLookup = [(1, 7), (2, 7), (3, 8), (4, 8), (5, 8)]
            .into_iter()
            .collect();
        let path = shortest_path(&graph, 1, 5, WeightMode::Distance)
            .unwrap()
            .unwrap();

        let traversal = aggregate(&path, &graph, &lookup);
        // 1->2 (10 m) ends in 7; 2->3 (20 m) ends in 8; 3->4, 4->5 in 8
        assert_eq!(traversal.length_in(7), 10.0);
        assert_eq!(traversal.length_in(8), 20.0 + 30.0 + 40.0);
        assert_eq!(traversal.total.length, 100.0);
        assert!(!traversal.has_unassigned());
        assert!(traversal.is_conserved(1e-12));
    }

    #[test]
    fn reverse_direction_uses_other_side_of_boundary() {
        let graph = chain();
        let lookup: NodeAreaLookup = [(1, 7), (2, 7), (3, 8)].into_iter().collect();
        let path = shortest_path(&graph, 3, 1, WeightMode::Distance)
            .unwrap()
            .unwrap();

        let traversal = aggregate(&path, &graph, &lookup);
        assert_eq!(traversal.length_in(7), 30.0);
        assert_eq!(traversal.length_in(8), 0.0);
    }

    #[test]
    fn unassigned_nodes_become_residual() {
        let graph = chain();
        let lookup: NodeAreaLookup = [(1, 7), (2, 7), (5, 9)].into_iter().collect();
        let path = shortest_path(&graph, 1, 5, WeightMode::Distance)
            .unwrap()
            .unwrap();

        let traversal = aggregate(&path, &graph, &lookup);
        assert_eq!(traversal.unassigned.length, 20.0 + 30.0);
        assert_eq!(traversal.length_in(9), 40.0);
        assert!(traversal.has_unassigned());
        assert!(traversal.is_conserved(1e-12));
        assert!((traversal.total.travel_time - path.travel_time).abs() < 1e-9);
    }
}
