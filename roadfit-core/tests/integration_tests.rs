use std::collections::BTreeMap;
use std::sync::{Arc, atomic::AtomicBool};

use roadfit_core::prelude::*;

const SIDE: u64 = 6;
const BLOCK: f64 = 100.0;

fn node(row: u64, col: u64) -> NodeId {
    row * SIDE + col + 1
}

/// Square grid of local two-way streets, lengths taken from the geometry
fn grid_segments() -> Vec<StreetSegment> {
    let mut segments = Vec::new();
    let mut id = 0;
    for row in 0..SIDE {
        for col in 0..SIDE {
            let here = (node(row, col), (col as f64 * BLOCK, row as f64 * BLOCK));
            if col + 1 < SIDE {
                id += 1;
                segments.push(StreetSegment::straight(
                    id,
                    here,
                    (node(row, col + 1), ((col + 1) as f64 * BLOCK, row as f64 * BLOCK)),
                    StreetType::Local,
                    true,
                ));
            }
            if row + 1 < SIDE {
                id += 1;
                segments.push(StreetSegment::straight(
                    id,
                    here,
                    (node(row + 1, col), (col as f64 * BLOCK, (row + 1) as f64 * BLOCK)),
                    StreetType::Local,
                    true,
                ));
            }
        }
    }
    segments
}

/// Four quadrant areas 1..=4
fn quadrants() -> NodeAreaLookup {
    let half = SIDE / 2;
    (0..SIDE)
        .flat_map(|row| (0..SIDE).map(move |col| (row, col)))
        .map(|(row, col)| {
            let area = 1 + u32::from(row >= half) * 2 + u32::from(col >= half);
            (node(row, col), area)
        })
        .collect()
}

fn all_pairs() -> Vec<(AreaId, AreaId)> {
    (1..=4)
        .flat_map(|a| (1..=4).map(move |b| (a, b)))
        .collect()
}

fn synthetic_trips(table: &PairSummaryTable, truth: &BTreeMap<AreaId, f64>) -> Vec<ObservedTrip> {
    table
        .summaries
        .iter()
        .map(|s| {
            let duration = s
                .traversal
                .areas
                .iter()
                .map(|(area, share)| share.length * truth[area])
                .sum();
            ObservedTrip::new(s.origin, s.destination, duration)
        })
        .collect()
}

#[test]
fn fit_recovers_area_coefficients_on_grid() {
    let (graph, report) = build_street_graph(&grid_segments(), &NetworkConfig::default());
    assert_eq!(report.malformed_count(), 0);
    assert_eq!(graph.node_count() as u64, SIDE * SIDE);

    let lookup = quadrants();
    let routing = RoutingConfig {
        mode: WeightMode::Distance,
        ..RoutingConfig::default()
    };
    let table = summarize_area_pairs(&graph, &lookup, all_pairs(), &routing, None);
    assert_eq!(table.len(), 16);
    assert!(table.missing.is_empty());

    let truth: BTreeMap<AreaId, f64> = [(1, 0.05), (2, 0.1), (3, 0.15), (4, 0.2)].into();
    let trips = synthetic_trips(&table, &truth);
    let fitted = fit_coefficients(&trips, &table, &[], &FitConfig::default()).unwrap();

    assert_eq!(fitted.coefficients.len(), 4);
    for (area, expected) in truth {
        let value = fitted.fitted(area).unwrap();
        assert!(
            (value - expected).abs() < 1e-4,
            "area {area}: {value} vs {expected}"
        );
    }
    assert!(fitted.train_rmse < 1e-3);
}

#[test]
fn path_lengths_are_fully_attributed() {
    let (graph, _) = build_street_graph(&grid_segments(), &NetworkConfig::default());
    // one crossing in the middle of the grid has no area
    let full = quadrants();
    let lookup: NodeAreaLookup = (1..=SIDE * SIDE)
        .filter(|&id| id != node(2, 3))
        .filter_map(|id| full.area_of(id).map(|area| (id, area)))
        .collect();

    let table = summarize_area_pairs(&graph, &lookup, all_pairs(), &RoutingConfig::default(), None);
    for summary in &table.summaries {
        assert!(summary.traversal.is_conserved(1e-9));
        let time_sum: f64 = summary
            .traversal
            .areas
            .values()
            .map(|share| share.travel_time)
            .sum::<f64>()
            + summary.traversal.unassigned.travel_time;
        assert!((time_sum - summary.traversal.total.travel_time).abs() < 1e-6);
    }

    let (filled, count) = lookup.fill_from_neighbors(&graph);
    assert_eq!(count, 1);
    // neighbours vote 1, 2, 2 and 4
    assert_eq!(filled.area_of(node(2, 3)), Some(2));
}

#[test]
fn unreachable_pairs_are_left_out_of_the_fit() {
    let mut segments = grid_segments();
    // island area 9, unreachable from the grid
    segments.push(
        StreetSegment::straight(
            10_000,
            (900, (5_000.0, 5_000.0)),
            (901, (5_100.0, 5_000.0)),
            StreetType::Local,
            true,
        )
        .with_length(100.0),
    );
    let (graph, _) = build_street_graph(&segments, &NetworkConfig::default());
    let mut lookup = quadrants();
    lookup.insert(900, 9);
    lookup.insert(901, 9);

    let mut pairs = all_pairs();
    pairs.push((1, 9));
    let routing = RoutingConfig {
        mode: WeightMode::Distance,
        ..RoutingConfig::default()
    };
    let table = summarize_area_pairs(&graph, &lookup, pairs, &routing, None);
    assert!(table.get(1, 9).is_none());
    assert!(table.missing.contains(&MissingPair {
        origin: 1,
        destination: 9,
        reason: MissingReason::NotReachable,
    }));

    let truth: BTreeMap<AreaId, f64> = [(1, 0.05), (2, 0.1), (3, 0.15), (4, 0.2)].into();
    let mut trips = synthetic_trips(&table, &truth);
    trips.push(ObservedTrip::new(1, 9, 120.0));

    let fitted = fit_coefficients(&trips, &table, &[1, 2, 3, 4, 9], &FitConfig::default()).unwrap();
    assert_eq!(fitted.design.missing, 1);
    assert!(fitted.get(9).unwrap().estimate.is_unconstrained());
    assert!((fitted.fitted(4).unwrap() - 0.2).abs() < 1e-4);
}

#[test]
fn pruning_turns_unreachable_into_unknown_nodes() {
    let mut segments = grid_segments();
    segments.push(StreetSegment::straight(
        10_000,
        (900, (5_000.0, 5_000.0)),
        (901, (5_100.0, 5_000.0)),
        StreetType::Local,
        true,
    ));
    let config = NetworkConfig {
        keep_largest_component: true,
        ..NetworkConfig::default()
    };
    let (graph, report) = build_street_graph(&segments, &config);
    assert_eq!(report.pruned_nodes, 2);
    assert!(matches!(
        shortest_path(&graph, 1, 900, WeightMode::Time),
        Err(Error::InvalidNode(900))
    ));
}

#[test]
fn raised_flag_cancels_pair_routing() {
    let (graph, _) = build_street_graph(&grid_segments(), &NetworkConfig::default());
    let flag = Arc::new(AtomicBool::new(true));
    let budget = SearchBudget::unlimited().with_flag(flag);

    let batch = route_pairs(&graph, &[(1, 36), (2, 35)], WeightMode::Time, &budget, None);
    assert!(batch.paths.is_empty());
    assert_eq!(batch.cancelled.len(), 2);
}

#[test]
fn cache_serves_repeated_batches() {
    let (graph, _) = build_street_graph(&grid_segments(), &NetworkConfig::default());
    let mut cache = PathCache::new();
    let pairs = [(1, 36), (1, 6), (31, 6)];

    let first = route_pairs(
        &graph,
        &pairs,
        WeightMode::Distance,
        &SearchBudget::unlimited(),
        Some(&mut cache),
    );
    assert_eq!(cache.len(), 3);
    let second = route_pairs(
        &graph,
        &pairs,
        WeightMode::Distance,
        &SearchBudget::unlimited(),
        Some(&mut cache),
    );
    assert_eq!(cache.hits(), 3);
    assert_eq!(first.paths, second.paths);
    assert_eq!(first.get(1, 36).unwrap().length, 1_000.0);
}

#[test]
fn pair_table_survives_json() {
    let (graph, _) = build_street_graph(&grid_segments(), &NetworkConfig::default());
    let table = summarize_area_pairs(
        &graph,
        &quadrants(),
        [(1, 4), (4, 1), (2, 7)],
        &RoutingConfig::default(),
        None,
    );

    let json = serde_json::to_string(&table).unwrap();
    let restored: PairSummaryTable = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, table);
    assert_eq!(restored.missing.len(), 1);
}
