use hashbrown::HashMap;
use log::{debug, info, warn};
use petgraph::{
    graph::{DiGraph, NodeIndex},
    unionfind::UnionFind,
};
use serde::Serialize;

use super::config::NetworkConfig;
use super::segments::{MalformedSegment, StreetSegment};
use crate::NodeId;
use crate::model::{StreetEdge, StreetGraph, StreetNode};

/// What happened to the input segments while building the graph
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
    pub segments: usize,
    pub malformed: Vec<MalformedSegment>,
    /// Footways, stairs and other segments closed to vehicles
    pub non_vehicular: usize,
    pub pruned_nodes: usize,
    pub pruned_edges: usize,
    pub nodes: usize,
    pub edges: usize,
}

impl BuildReport {
    pub fn malformed_count(&self) -> usize {
        self.malformed.len()
    }
}

/// Builds the immutable street graph from segment records.
///
/// Malformed segments are skipped and listed in the report; they never fail the
/// build. Segments are processed in input order, so the same input always yields
/// the same node and edge indices.
pub fn build_street_graph(
    segments: &[StreetSegment],
    config: &NetworkConfig,
) -> (StreetGraph, BuildReport) {
    let mut report = BuildReport {
        segments: segments.len(),
        ..BuildReport::default()
    };

    let mut graph: DiGraph<StreetNode, StreetEdge> = DiGraph::new();
    let mut node_map: HashMap<NodeId, NodeIndex> = HashMap::with_capacity(segments.len());

    for segment in segments {
        if !segment.street_type.is_vehicular() {
            report.non_vehicular += 1;
            continue;
        }

        let length = match segment.checked_length() {
            Ok(length) => length,
            Err(defect) => {
                debug!("Skipping segment {}: {defect}", segment.id);
                report.malformed.push(MalformedSegment {
                    segment: segment.id,
                    defect,
                });
                continue;
            }
        };
        let (Some((start, end)), Some(travel_time)) = (
            segment.endpoints(),
            segment.street_type.travel_time(length),
        ) else {
            continue;
        };

        let from = *node_map.entry(segment.from).or_insert_with(|| {
            graph.add_node(StreetNode {
                id: segment.from,
                geometry: start,
            })
        });
        let to = *node_map.entry(segment.to).or_insert_with(|| {
            graph.add_node(StreetNode {
                id: segment.to,
                geometry: end,
            })
        });

        let edge = StreetEdge {
            segment: segment.id,
            length,
            travel_time,
            street_type: segment.street_type,
        };
        if segment.bidirectional {
            graph.add_edge(from, to, edge.clone());
            graph.add_edge(to, from, edge);
        } else {
            graph.add_edge(from, to, edge);
        }
    }

    if !report.malformed.is_empty() {
        warn!(
            "{} of {} street segments are malformed and were skipped",
            report.malformed.len(),
            report.segments
        );
    }

    if config.keep_largest_component {
        let before = (graph.node_count(), graph.edge_count());
        graph = largest_component(&graph);
        report.pruned_nodes = before.0 - graph.node_count();
        report.pruned_edges = before.1 - graph.edge_count();
        if report.pruned_nodes > 0 {
            info!(
                "Dropped {} nodes and {} edges outside the largest connected component",
                report.pruned_nodes, report.pruned_edges
            );
        }
    }

    report.nodes = graph.node_count();
    report.edges = graph.edge_count();
    info!(
        "Built street graph with {} nodes and {} edges from {} segments",
        report.nodes, report.edges, report.segments
    );

    (StreetGraph::from_parts(graph), report)
}

/// Restricts the graph to its largest weakly connected component.
/// On equal sizes the component holding the lowest node index wins.
fn largest_component(graph: &DiGraph<StreetNode, StreetEdge>) -> DiGraph<StreetNode, StreetEdge> {
    let mut components = UnionFind::<usize>::new(graph.node_count());
    for edge in graph.raw_edges() {
        components.union(edge.source().index(), edge.target().index());
    }
    let labels = components.into_labeling();

    let mut sizes: HashMap<usize, (usize, usize)> = HashMap::new();
    for (node, &label) in labels.iter().enumerate() {
        let entry = sizes.entry(label).or_insert((0, node));
        entry.0 += 1;
    }
    let Some(keep) = sizes
        .iter()
        .max_by(|(_, a), (_, b)| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(&label, _)| label)
    else {
        return graph.clone();
    };

    graph.filter_map(
        |idx, node| (labels[idx.index()] == keep).then(|| node.clone()),
        |_, edge| Some(edge.clone()),
    )
}
