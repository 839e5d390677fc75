//! Node to area lookup supplied by the spatial join collaborator

use std::collections::{BTreeMap, BTreeSet};

use hashbrown::HashMap;
use itertools::Itertools;
use log::debug;

use super::StreetGraph;
use crate::{AreaId, NodeId};

/// Maps street-graph nodes to the area polygon they fall in.
///
/// Nodes missing from the lookup are unassigned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeAreaLookup {
    areas: HashMap<NodeId, AreaId>,
}

impl NodeAreaLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: NodeId, area: AreaId) -> Option<AreaId> {
        self.areas.insert(node, area)
    }

    pub fn area_of(&self, node: NodeId) -> Option<AreaId> {
        self.areas.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Every area that has at least one node, ascending
    pub fn areas(&self) -> Vec<AreaId> {
        self.areas.values().copied().sorted_unstable().dedup().collect()
    }

    /// Graph nodes grouped by area, node identifiers ascending within each area.
    /// Lookup entries for nodes that are not in `graph` are ignored.
    pub fn nodes_by_area(&self, graph: &StreetGraph) -> BTreeMap<AreaId, Vec<NodeId>> {
        let mut grouped: BTreeMap<AreaId, Vec<NodeId>> = BTreeMap::new();
        for (_, node) in graph.nodes() {
            if let Some(area) = self.area_of(node.id) {
                grouped.entry(area).or_default().push(node.id);
            }
        }
        for nodes in grouped.values_mut() {
            nodes.sort_unstable();
        }
        grouped
    }

    /// Assigns each unassigned graph node the most frequent area among its
    /// assigned neighbours; ties go to the larger area identifier.
    ///
    /// Only areas known before the call are used, so the result does not depend
    /// on node order. Returns the completed lookup and the number of filled nodes.
    pub fn fill_from_neighbors(&self, graph: &StreetGraph) -> (Self, usize) {
        let mut filled = self.clone();
        let mut count = 0;

        for (idx, node) in graph.nodes() {
            if self.area_of(node.id).is_some() {
                continue;
            }
            let mut votes: BTreeMap<AreaId, usize> = BTreeMap::new();
            let neighbors: BTreeSet<NodeId> = graph
                .neighbors_undirected(idx)
                .map(|neighbor| graph.node_id(neighbor))
                .collect();
            for neighbor in neighbors {
                if let Some(area) = self.area_of(neighbor) {
                    *votes.entry(area).or_default() += 1;
                }
            }
            // BTreeMap iterates ascending, so max_by_key keeps the largest area on ties
            if let Some((&area, _)) = votes.iter().max_by_key(|&(_, &n)| n) {
                filled.insert(node.id, area);
                count += 1;
            } else {
                debug!("Node {} has no assigned neighbours, left unassigned", node.id);
            }
        }

        (filled, count)
    }
}

impl FromIterator<(NodeId, AreaId)> for NodeAreaLookup {
    fn from_iter<T: IntoIterator<Item = (NodeId, AreaId)>>(iter: T) -> Self {
        Self {
            areas: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::{NetworkConfig, StreetSegment, build_street_graph};
    use crate::model::StreetType;

    /// Star around node 5 with arms to nodes 1..=4, plus a detached pair 8 - 9
    fn star() -> StreetGraph {
        let mut segments: Vec<_> = (1..=4)
            .map(|arm| {
                StreetSegment::straight(
                    arm,
                    (5, (0.0, 0.0)),
                    (arm, (arm as f64, 1.0)),
                    StreetType::Local,
                    false,
                )
            })
            .collect();
        segments.push(StreetSegment::straight(
            9,
            (8, (10.0, 10.0)),
            (9, (11.0, 10.0)),
            StreetType::Local,
            true,
        ));
        build_street_graph(&segments, &NetworkConfig::default()).0
    }

    #[test]
    fn groups_graph_nodes_by_area() {
        let graph = star();
        let lookup: NodeAreaLookup = [(4, 2), (1, 2), (2, 3), (77, 3)].into_iter().collect();

        assert_eq!(lookup.areas(), vec![2, 3]);
        let grouped = lookup.nodes_by_area(&graph);
        assert_eq!(grouped[&2], vec![1, 4]);
        // node 77 is not in the graph
        assert_eq!(grouped[&3], vec![2]);
    }

    #[test]
    fn fill_uses_majority_then_larger_area() {
        let graph = star();
        let majority: NodeAreaLookup = [(1, 6), (2, 6), (3, 4)].into_iter().collect();
        let (filled, count) = majority.fill_from_neighbors(&graph);
        // node 5 joins area 6; node 4 only borders node 5, which had no area yet
        assert_eq!(filled.area_of(5), Some(6));
        assert_eq!(filled.area_of(4), None);
        assert_eq!(count, 1);

        let tied: NodeAreaLookup = [(1, 6), (2, 4)].into_iter().collect();
        let (filled, _) = tied.fill_from_neighbors(&graph);
        assert_eq!(filled.area_of(5), Some(6));
        assert_eq!(filled.area_of(8), None);
    }
}
