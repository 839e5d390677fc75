use std::{cmp::Ordering, collections::BinaryHeap};

use fixedbitset::FixedBitSet;
use petgraph::{
    graph::{EdgeIndex, NodeIndex},
    visit::EdgeRef,
};

use super::state::State;
use crate::{
    Error, NodeId,
    model::{StreetGraph, WeightMode},
    routing::{Path, PathCache, SearchBudget},
};

/// How many settled nodes pass between two budget checks
const BUDGET_CHECK_INTERVAL: usize = 1024;

/// Distances and parent edges of one single-source search
#[derive(Debug, Clone)]
pub(crate) struct ShortestPathTree {
    source: NodeIndex,
    mode: WeightMode,
    distances: Vec<f64>,
    parents: Vec<Option<EdgeIndex>>,
}

impl ShortestPathTree {
    pub(crate) fn distance(&self, node: NodeIndex) -> Option<f64> {
        let distance = self.distances[node.index()];
        distance.is_finite().then_some(distance)
    }

    /// Follows parent edges back from `target`, `None` when it was not reached
    pub(crate) fn path_to(&self, graph: &StreetGraph, target: NodeIndex) -> Option<Path> {
        let weight = self.distance(target)?;

        let mut edges = Vec::new();
        let mut current = target;
        while current != self.source {
            let edge = self.parents[current.index()]?;
            edges.push(edge);
            current = graph.edge_endpoints(edge)?.0;
        }
        edges.reverse();

        let mut nodes = Vec::with_capacity(edges.len() + 1);
        nodes.push(self.source);
        let mut length = 0.0;
        let mut travel_time = 0.0;
        for &edge in &edges {
            let (_, next) = graph.edge_endpoints(edge)?;
            let street = graph.edge(edge)?;
            length += street.length;
            travel_time += street.travel_time;
            nodes.push(next);
        }

        Some(Path {
            mode: self.mode,
            nodes,
            edges,
            weight,
            length,
            travel_time,
        })
    }
}

/// Dijkstra's algorithm from `source`, stopping once every node in `targets` is
/// settled (or the whole component when `targets` is empty).
///
/// Ties are resolved deterministically: nodes of equal cost settle in ascending
/// identifier order, and among equal-cost parents the one with the lower node
/// identifier (then lower edge index) is kept.
pub(crate) fn dijkstra_tree(
    graph: &StreetGraph,
    source: NodeIndex,
    targets: &[NodeIndex],
    mode: WeightMode,
    budget: &SearchBudget,
) -> Result<ShortestPathTree, Error> {
    let node_count = graph.node_count();
    let mut distances = vec![f64::INFINITY; node_count];
    let mut parents: Vec<Option<EdgeIndex>> = vec![None; node_count];
    let mut settled = FixedBitSet::with_capacity(node_count);
    let mut pending = FixedBitSet::with_capacity(node_count);
    for target in targets {
        pending.insert(target.index());
    }
    let mut remaining = pending.count_ones(..);
    let mut heap = BinaryHeap::new();

    // Start node has distance 0
    distances[source.index()] = 0.0;
    heap.push(State {
        cost: 0.0,
        id: graph.node_id(source),
        node: source,
    });

    let mut settled_count = 0usize;
    while let Some(State { cost, id, node }) = heap.pop() {
        // Skip stale heap entries
        if settled.contains(node.index()) {
            continue;
        }
        settled.insert(node.index());
        settled_count += 1;

        if settled_count % BUDGET_CHECK_INTERVAL == 0 && budget.is_exhausted() {
            return Err(Error::Cancelled);
        }

        if pending.contains(node.index()) {
            pending.set(node.index(), false);
            remaining -= 1;
            if remaining == 0 {
                break;
            }
        }

        // Examine neighbors
        for edge in graph.edges(node) {
            let next = edge.target();
            if settled.contains(next.index()) {
                continue;
            }
            let next_cost = cost + edge.weight().weight(mode);

            match next_cost.total_cmp(&distances[next.index()]) {
                Ordering::Less => {
                    distances[next.index()] = next_cost;
                    parents[next.index()] = Some(edge.id());
                    heap.push(State {
                        cost: next_cost,
                        id: graph.node_id(next),
                        node: next,
                    });
                }
                Ordering::Equal => {
                    if prefers(graph, id, edge.id(), parents[next.index()]) {
                        parents[next.index()] = Some(edge.id());
                    }
                }
                Ordering::Greater => {}
            }
        }
    }

    Ok(ShortestPathTree {
        source,
        mode,
        distances,
        parents,
    })
}

/// Whether an equal-cost edge leaving node `via` should replace `current` as parent
fn prefers(graph: &StreetGraph, via: NodeId, edge: EdgeIndex, current: Option<EdgeIndex>) -> bool {
    let Some(current) = current else {
        return true;
    };
    let Some((current_from, _)) = graph.edge_endpoints(current) else {
        return true;
    };
    (via, edge) < (graph.node_id(current_from), current)
}

fn resolve(graph: &StreetGraph, id: NodeId) -> Result<NodeIndex, Error> {
    graph.node_index(id).ok_or(Error::InvalidNode(id))
}

/// Shortest path between two nodes, `Ok(None)` when `target` is not reachable.
///
/// # Errors
///
/// [`Error::InvalidNode`] if either identifier is not in the graph
pub fn shortest_path(
    graph: &StreetGraph,
    source: NodeId,
    target: NodeId,
    mode: WeightMode,
) -> Result<Option<Path>, Error> {
    let source_idx = resolve(graph, source)?;
    let target_idx = resolve(graph, target)?;
    let tree = dijkstra_tree(
        graph,
        source_idx,
        &[target_idx],
        mode,
        &SearchBudget::unlimited(),
    )?;
    Ok(tree.path_to(graph, target_idx))
}

/// [`shortest_path`] through an optional memoization table
pub fn shortest_path_cached(
    graph: &StreetGraph,
    source: NodeId,
    target: NodeId,
    mode: WeightMode,
    cache: Option<&mut PathCache>,
) -> Result<Option<Path>, Error> {
    let Some(cache) = cache else {
        return shortest_path(graph, source, target, mode);
    };
    if let Some(cached) = cache.get(source, target, mode) {
        return Ok(cached.clone());
    }
    let path = shortest_path(graph, source, target, mode)?;
    cache.insert(source, target, mode, path.clone());
    Ok(path)
}

/// Paths from one source to many targets with a single relaxation pass.
///
/// The result has one entry per element of `targets`, `None` for unreachable ones.
///
/// # Errors
///
/// [`Error::InvalidNode`] for unknown identifiers, [`Error::Cancelled`] when the
/// budget ran out before all targets were settled
pub fn shortest_paths_from(
    graph: &StreetGraph,
    source: NodeId,
    targets: &[NodeId],
    mode: WeightMode,
    budget: &SearchBudget,
) -> Result<Vec<Option<Path>>, Error> {
    let source_idx = resolve(graph, source)?;
    let target_idx = targets
        .iter()
        .map(|&id| resolve(graph, id))
        .collect::<Result<Vec<_>, _>>()?;

    if budget.is_exhausted() {
        return Err(Error::Cancelled);
    }
    let tree = dijkstra_tree(graph, source_idx, &target_idx, mode, budget)?;

    Ok(target_idx
        .iter()
        .map(|&target| tree.path_to(graph, target))
        .collect())
}
