//! The `paths` and `fit` phases of a run

use std::collections::BTreeSet;

use roadfit_core::aggregate::{PairSummaryTable, summarize_area_pairs};
use roadfit_core::fit::fit_slices;
use roadfit_core::loading::build_street_graph;
use roadfit_core::routing::PathCache;
use roadfit_core::{AreaId, NodeAreaLookup, ObservedTrip};
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::error::AppError;
use crate::{input, output};

/// Result of the `paths` phase with the inputs the `fit` phase reuses
#[derive(Debug)]
pub struct RoutedTrips {
    pub table: PairSummaryTable,
    pub trips: Vec<ObservedTrip>,
    pub areas: Vec<AreaId>,
}

/// Builds the graph, routes every observed area pair and writes the pair summaries
pub fn run_paths(config: &RunConfig) -> Result<RoutedTrips, AppError> {
    let segments = input::load_segments(&config.inputs.segments)?;
    let (graph, report) = build_street_graph(&segments, &config.network);
    if graph.node_count() == 0 {
        return Err(AppError::Config(format!(
            "no usable street segment in {}",
            config.inputs.segments.display()
        )));
    }
    info!(
        "Street graph: {} nodes, {} edges ({} malformed, {} non-vehicular segments skipped)",
        report.nodes,
        report.edges,
        report.malformed_count(),
        report.non_vehicular
    );

    let lookup = node_areas(config, &graph)?;
    let trips = input::load_trips(&config.inputs.trips)?;
    let pairs: BTreeSet<(AreaId, AreaId)> = trips
        .iter()
        .map(|trip| (trip.origin, trip.destination))
        .collect();

    let mut cache = PathCache::new();
    let table = summarize_area_pairs(&graph, &lookup, pairs, &config.routing, Some(&mut cache));
    output::write_pair_table(&config.outputs.pairs, &table)?;
    Ok(RoutedTrips {
        table,
        trips,
        areas: lookup.areas(),
    })
}

fn node_areas(
    config: &RunConfig,
    graph: &roadfit_core::StreetGraph,
) -> Result<NodeAreaLookup, AppError> {
    let lookup = input::load_node_areas(&config.inputs.node_areas)?;
    if !config.network.fill_unassigned_nodes {
        return Ok(lookup);
    }
    let (filled, count) = lookup.fill_from_neighbors(graph);
    info!("Assigned {count} nodes to the area of their neighbours");
    Ok(filled)
}

/// Fits every configured slice against `table` and writes one report per slice.
///
/// Failing slices are logged and skipped; the run only fails when none succeeds.
pub fn run_fit(
    config: &RunConfig,
    trips: &[ObservedTrip],
    areas: &[AreaId],
    table: &PairSummaryTable,
) -> Result<(), AppError> {
    let slices = config.slices();

    let mut fitted = 0usize;
    for slice_fit in fit_slices(trips, &slices, table, areas, &config.fit) {
        match slice_fit.result {
            Ok(report) => {
                output::write_slice_report(&config.outputs.coefficients, &report)?;
                fitted += 1;
            }
            Err(err) => warn!("Slice '{}' not fitted: {err}", slice_fit.slice),
        }
    }

    if fitted == 0 {
        return Err(AppError::NoSliceFitted);
    }
    info!("Fitted {fitted} of {} slices", slices.len());
    Ok(())
}

/// Fit phase reading the pair summaries written by an earlier `paths` run
pub fn run_fit_from_file(config: &RunConfig) -> Result<(), AppError> {
    let table = output::read_pair_table(&config.outputs.pairs)?;
    info!(
        "Loaded {} pair summaries from {}",
        table.len(),
        config.outputs.pairs.display()
    );
    let trips = input::load_trips(&config.inputs.trips)?;
    let areas = input::load_node_areas(&config.inputs.node_areas)?.areas();
    run_fit(config, &trips, &areas, &table)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::config::{Inputs, Outputs};

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    /// Two areas on a straight street, a one-way back street and an island
    fn fixture(dir: &Path) -> RunConfig {
        fs::create_dir_all(dir).unwrap();
        let segments = write(
            dir,
            "segments.csv",
            "\
id,from,to,street_type,length,oneway,geometry
1,1,2,G,,no,\"LINESTRING(0 0, 100 0)\"
2,2,3,G,,no,\"LINESTRING(100 0, 200 0)\"
3,3,4,L,,no,\"LINESTRING(200 0, 400 0)\"
4,4,5,L,,no,\"LINESTRING(400 0, 600 0)\"
5,9,10,G,,no,\"LINESTRING(5000 0, 5100 0)\"
6,5,6,footway,,no,\"LINESTRING(600 0, 650 0)\"
",
        );
        let node_areas = write(dir, "node_areas.csv", "node,area\n1,1\n2,1\n3,1\n4,2\n5,2\n9,3\n10,3\n");
        let trips = write(
            dir,
            "trips.csv",
            "\
origin,destination,duration,weekday,hour
1,2,60,Mon,8
2,1,60,Mon,9
1,1,20,Tue,8
2,2,30,Sat,12
1,3,99,Mon,8
",
        );
        RunConfig {
            inputs: Inputs {
                segments,
                node_areas,
                trips,
            },
            outputs: Outputs {
                pairs: dir.join("out/pairs.json"),
                coefficients: dir.join("out/coefficients"),
            },
            network: Default::default(),
            routing: Default::default(),
            fit: Default::default(),
            slices: Vec::new(),
        }
    }

    #[test]
    fn paths_then_fit() {
        let dir = std::env::temp_dir().join(format!("roadfit-run-{}", std::process::id()));
        let config = fixture(&dir);

        let routed = run_paths(&config).unwrap();
        assert_eq!(routed.table.len(), 4);
        assert_eq!(routed.table.missing.len(), 1);
        assert_eq!(routed.trips.len(), 5);
        assert_eq!(routed.areas, vec![1, 2, 3]);
        assert!(config.outputs.pairs.exists());

        run_fit_from_file(&config).unwrap();
        let csv = fs::read_to_string(config.outputs.coefficients.join("all.csv")).unwrap();
        let rows: Vec<&str> = csv.lines().collect();
        assert_eq!(rows.len(), 4);
        assert!(rows[1].starts_with("1,"));
        assert!(rows[3].starts_with("3,"));
        assert!(rows[3].contains("unconstrained"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn run_reads_inputs_once() {
        let dir = std::env::temp_dir().join(format!("roadfit-once-{}", std::process::id()));
        let config = fixture(&dir);

        let routed = run_paths(&config).unwrap();
        fs::remove_file(&config.inputs.trips).unwrap();
        fs::remove_file(&config.inputs.node_areas).unwrap();

        run_fit(&config, &routed.trips, &routed.areas, &routed.table).unwrap();
        assert!(config.outputs.coefficients.join("all.csv").exists());
        assert!(run_fit_from_file(&config).is_err());

        fs::remove_dir_all(&dir).unwrap();
    }
}
