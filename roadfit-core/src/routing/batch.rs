use std::collections::{BTreeMap, BTreeSet};

use log::{info, warn};
use rayon::prelude::*;

use super::{Path, PathCache, SearchBudget, shortest_paths_from};
use crate::{Error, NodeId, model::StreetGraph, model::WeightMode};

/// Outcome of routing many node pairs
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub paths: BTreeMap<(NodeId, NodeId), Path>,
    /// Pairs in different components of the graph
    pub unreachable: Vec<(NodeId, NodeId)>,
    /// Pairs not computed because the budget ran out
    pub cancelled: Vec<(NodeId, NodeId)>,
    /// Pairs naming a node that is not in the graph
    pub invalid: Vec<(NodeId, NodeId)>,
}

impl BatchResult {
    pub fn get(&self, source: NodeId, target: NodeId) -> Option<&Path> {
        self.paths.get(&(source, target))
    }

    pub fn is_unreachable(&self, source: NodeId, target: NodeId) -> bool {
        self.unreachable.contains(&(source, target))
    }

    fn record(&mut self, source: NodeId, target: NodeId, path: Option<Path>) {
        match path {
            Some(path) => {
                self.paths.insert((source, target), path);
            }
            None => self.unreachable.push((source, target)),
        }
    }
}

/// Routes every pair, sharing one multi-target search per distinct source.
///
/// Sources are processed in parallel on the rayon pool. Per-pair failures are
/// sorted into the result instead of aborting the batch; once the budget is
/// exhausted, the remaining sources are reported as cancelled while finished
/// ones are kept. Finished outcomes are written to `cache` when one is given.
pub fn route_pairs(
    graph: &StreetGraph,
    pairs: &[(NodeId, NodeId)],
    mode: WeightMode,
    budget: &SearchBudget,
    mut cache: Option<&mut PathCache>,
) -> BatchResult {
    let mut result = BatchResult::default();

    let mut by_source: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
    for &(source, target) in pairs {
        if graph.node_index(source).is_none() || graph.node_index(target).is_none() {
            result.invalid.push((source, target));
            continue;
        }
        if let Some(cache) = cache.as_deref_mut() {
            if let Some(cached) = cache.get(source, target, mode) {
                let cached = cached.clone();
                result.record(source, target, cached);
                continue;
            }
        }
        by_source.entry(source).or_default().insert(target);
    }

    let groups: Vec<(NodeId, Vec<NodeId>)> = by_source
        .into_iter()
        .map(|(source, targets)| (source, targets.into_iter().collect()))
        .collect();
    info!(
        "Routing {} node pairs from {} sources",
        groups.iter().map(|(_, t)| t.len()).sum::<usize>(),
        groups.len()
    );

    let searched: Vec<_> = groups
        .into_par_iter()
        .map(|(source, targets)| {
            let outcome = shortest_paths_from(graph, source, &targets, mode, budget);
            (source, targets, outcome)
        })
        .collect();

    for (source, targets, outcome) in searched {
        match outcome {
            Ok(paths) => {
                for (target, path) in targets.into_iter().zip(paths) {
                    if let Some(cache) = cache.as_deref_mut() {
                        cache.insert(source, target, mode, path.clone());
                    }
                    result.record(source, target, path);
                }
            }
            Err(Error::Cancelled) => {
                result
                    .cancelled
                    .extend(targets.into_iter().map(|target| (source, target)));
            }
            Err(err) => {
                warn!("Cannot route from node {source}: {err}");
                result
                    .invalid
                    .extend(targets.into_iter().map(|target| (source, target)));
            }
        }
    }

    result.unreachable.sort_unstable();
    result.unreachable.dedup();
    result.invalid.sort_unstable();
    result.invalid.dedup();
    if !result.invalid.is_empty() {
        warn!("{} node pairs reference nodes outside the graph", result.invalid.len());
    }
    if !result.cancelled.is_empty() {
        warn!(
            "Search budget exhausted, {} node pairs were not routed",
            result.cancelled.len()
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, atomic::AtomicBool};

    use super::*;
    use crate::loading::{NetworkConfig, StreetSegment, build_street_graph};
    use crate::model::StreetType;
    use crate::routing::shortest_path;

    fn road(id: u64, from: u64, to: u64, length: f64) -> StreetSegment {
        StreetSegment::straight(
            id,
            (from, (0.0, 0.0)),
            (to, (1.0, 0.0)),
            StreetType::Local,
            true,
        )
        .with_length(length)
    }

    fn graph() -> StreetGraph {
        build_street_graph(
            &[
                road(1, 1, 2, 4.0),
                road(2, 2, 3, 1.0),
                road(3, 1, 3, 7.0),
                road(4, 3, 4, 2.0),
                road(5, 8, 9, 1.0),
            ],
            &NetworkConfig::default(),
        )
        .0
    }

    #[test]
    fn batch_matches_single_queries() {
        let g = graph();
        let pairs = vec![(1, 4), (1, 3), (2, 4), (4, 1), (1, 9), (77, 1)];
        let batch = route_pairs(
            &g,
            &pairs,
            WeightMode::Distance,
            &SearchBudget::unlimited(),
            None,
        );

        for &(s, t) in &[(1, 4), (1, 3), (2, 4), (4, 1)] {
            let single = shortest_path(&g, s, t, WeightMode::Distance).unwrap().unwrap();
            assert_eq!(batch.get(s, t), Some(&single));
        }
        assert!(batch.is_unreachable(1, 9));
        assert_eq!(batch.invalid, vec![(77, 1)]);
        assert!(batch.cancelled.is_empty());
    }

    #[test]
    fn cancelled_batch_keeps_nothing_fake() {
        let g = graph();
        let flag = Arc::new(AtomicBool::new(true));
        let budget = SearchBudget::unlimited().with_flag(flag);
        let batch = route_pairs(&g, &[(1, 4), (2, 3)], WeightMode::Distance, &budget, None);

        assert!(batch.paths.is_empty());
        assert_eq!(batch.cancelled.len(), 2);
    }

    #[test]
    fn cache_is_filled_and_reused() {
        let g = graph();
        let mut cache = PathCache::new();
        let pairs = [(1, 4), (1, 9)];
        let first = route_pairs(
            &g,
            &pairs,
            WeightMode::Distance,
            &SearchBudget::unlimited(),
            Some(&mut cache),
        );
        assert_eq!(cache.len(), 2);

        // Every pair is served from the cache even with an exhausted budget
        let exhausted = SearchBudget::unlimited().with_flag(Arc::new(AtomicBool::new(true)));
        let second = route_pairs(&g, &pairs, WeightMode::Distance, &exhausted, Some(&mut cache));
        assert_eq!(first.paths, second.paths);
        assert_eq!(second.unreachable, vec![(1, 9)]);
        assert!(second.cancelled.is_empty());
    }

    #[test]
    fn repeated_batches_are_identical() {
        let g = graph();
        let pairs = vec![(1, 4), (2, 1), (3, 1), (4, 2)];
        let a = route_pairs(&g, &pairs, WeightMode::Time, &SearchBudget::unlimited(), None);
        let b = route_pairs(&g, &pairs, WeightMode::Time, &SearchBudget::unlimited(), None);
        assert_eq!(a.paths, b.paths);
    }
}
