use std::collections::{BTreeMap, BTreeSet};

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::traversal::{AreaTraversal, aggregate};
use crate::{
    AreaId, NodeId,
    model::{NodeAreaLookup, StreetGraph, WeightMode},
    routing::{Path, PathCache, RoutingConfig, route_pairs},
};

/// Routed summary of one origin/destination area pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSummary {
    pub origin: AreaId,
    pub destination: AreaId,
    /// Representative nodes of the selected (median) path
    pub source: NodeId,
    pub target: NodeId,
    pub edges: usize,
    pub weight: f64,
    pub traversal: AreaTraversal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    /// Origin or destination area has no node in the graph
    NoNodes,
    NotReachable,
    Cancelled,
}

/// Area pair without summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingPair {
    pub origin: AreaId,
    pub destination: AreaId,
    pub reason: MissingReason,
}

/// Output of the path phase, persisted between path and fit runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairSummaryTable {
    pub mode: WeightMode,
    /// Sorted by `(origin, destination)`
    pub summaries: Vec<PairSummary>,
    pub missing: Vec<MissingPair>,
}

impl PairSummaryTable {
    pub fn get(&self, origin: AreaId, destination: AreaId) -> Option<&PairSummary> {
        self.summaries
            .binary_search_by(|s| (s.origin, s.destination).cmp(&(origin, destination)))
            .ok()
            .map(|idx| &self.summaries[idx])
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

/// Picks `samples` nodes spread evenly over the sorted node list of an area
fn representatives(nodes: &[NodeId], samples: usize) -> Vec<NodeId> {
    (0..samples)
        .map(|i| nodes[i * nodes.len() / samples])
        .collect()
}

/// Routes every distinct area pair and decomposes the selected path per area.
///
/// For sample `i`, the i-th representative of the origin area is routed to the
/// i-th representative of the destination area (the next one for intra-area
/// pairs). Among reachable samples the median by weight is kept, ties broken by
/// node identifiers. A pair with a cancelled sample is reported as cancelled.
pub fn summarize_area_pairs(
    graph: &StreetGraph,
    lookup: &NodeAreaLookup,
    pairs: impl IntoIterator<Item = (AreaId, AreaId)>,
    config: &RoutingConfig,
    cache: Option<&mut PathCache>,
) -> PairSummaryTable {
    let samples = config.samples_per_area.max(1);
    let area_pairs: BTreeSet<(AreaId, AreaId)> = pairs.into_iter().collect();
    let by_area = lookup.nodes_by_area(graph);
    let reps: BTreeMap<AreaId, Vec<NodeId>> = by_area
        .iter()
        .map(|(&area, nodes)| (area, representatives(nodes, samples)))
        .collect();

    let mut table = PairSummaryTable {
        mode: config.mode,
        ..PairSummaryTable::default()
    };

    let mut candidates: BTreeMap<(AreaId, AreaId), Vec<(NodeId, NodeId)>> = BTreeMap::new();
    for &(origin, destination) in &area_pairs {
        let (Some(from), Some(to)) = (reps.get(&origin), reps.get(&destination)) else {
            table.missing.push(MissingPair {
                origin,
                destination,
                reason: MissingReason::NoNodes,
            });
            continue;
        };
        let offset = usize::from(origin == destination);
        let samples = (0..samples)
            .map(|i| (from[i], to[(i + offset) % to.len()]))
            .collect();
        candidates.insert((origin, destination), samples);
    }

    let node_pairs: Vec<(NodeId, NodeId)> = candidates.values().flatten().copied().collect();
    info!(
        "Routing {} area pairs with {} samples each",
        candidates.len(),
        samples
    );
    let batch = route_pairs(graph, &node_pairs, config.mode, &config.budget(), cache);
    let cancelled: BTreeSet<(NodeId, NodeId)> = batch.cancelled.iter().copied().collect();

    let mut selected: Vec<(AreaId, AreaId, NodeId, NodeId, &Path)> = Vec::new();
    for (&(origin, destination), samples) in &candidates {
        if samples.iter().any(|pair| cancelled.contains(pair)) {
            table.missing.push(MissingPair {
                origin,
                destination,
                reason: MissingReason::Cancelled,
            });
            continue;
        }

        let mut reachable: Vec<(NodeId, NodeId, &Path)> = samples
            .iter()
            .filter_map(|&(s, t)| batch.get(s, t).map(|path| (s, t, path)))
            .collect();
        if reachable.is_empty() {
            table.missing.push(MissingPair {
                origin,
                destination,
                reason: MissingReason::NotReachable,
            });
            continue;
        }
        reachable.sort_by(|a, b| {
            a.2.weight
                .total_cmp(&b.2.weight)
                .then_with(|| (a.0, a.1).cmp(&(b.0, b.1)))
        });
        let (source, target, path) = reachable[reachable.len() / 2];
        selected.push((origin, destination, source, target, path));
    }

    table.summaries = selected
        .par_iter()
        .map(|&(origin, destination, source, target, path)| PairSummary {
            origin,
            destination,
            source,
            target,
            edges: path.edges.len(),
            weight: path.weight,
            traversal: aggregate(path, graph, lookup),
        })
        .collect();

    let with_residual = table
        .summaries
        .iter()
        .filter(|s| s.traversal.has_unassigned())
        .count();
    if with_residual > 0 {
        warn!("{with_residual} routed pairs pass through nodes without area");
    }
    if !table.missing.is_empty() {
        warn!(
            "{} of {} area pairs have no path summary",
            table.missing.len(),
            area_pairs.len()
        );
    }
    info!("Summarised {} area pairs", table.summaries.len());

    table
}
